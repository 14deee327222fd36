use std::rc::Rc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;

use crate::audio::{self, Cue, Playback, PlaybackEvent, SoundCues};
use crate::catalog::{normalize_word, LyricSection, Song};
use crate::clock::Clock;
use crate::economy::Economy;
use crate::models::{Achievement, ProgressRecord, SectionResult};

pub const SCORE_PER_CORRECT: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Answering,
    SectionComplete,
    Exited,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Correct,
    Incorrect { hearts_left: u32 },
    /// No hearts left; the attempt was not checked.
    Blocked { next_heart_in: Option<Duration> },
    SectionComplete(SectionResult),
    /// Not answering right now.
    Ignored,
}

/// One rendered word of the current section.
#[derive(Debug, Clone, PartialEq)]
pub enum LyricSlot {
    Word(String),
    Filled(String),
    Blank { current: bool },
}

/// Sequences one play session over a song, section by section.
pub struct GameSession {
    economy: Economy,
    song: Song,
    playback: Box<dyn Playback>,
    cues: Box<dyn SoundCues>,
    clock: Rc<dyn Clock>,
    phase: Phase,
    section_index: usize,
    blanks: Vec<usize>,
    filled: Vec<String>,
    candidates: Vec<String>,
    mistakes: u32,
    correct: u32,
    started_at: DateTime<Utc>,
    reached_end: bool,
    last_result: Option<SectionResult>,
    unlocked: Vec<Achievement>,
}

impl GameSession {
    /// Starts a session at the first section and resets the per-session
    /// section counter.
    pub fn start(
        mut economy: Economy,
        song: Song,
        playback: Box<dyn Playback>,
        cues: Box<dyn SoundCues>,
        clock: Rc<dyn Clock>,
    ) -> Self {
        economy.begin_session();
        let started_at = clock.now();
        log::info!("session started: {}", song.id);

        let mut session = Self {
            economy,
            song,
            playback,
            cues,
            clock,
            phase: Phase::Answering,
            section_index: 0,
            blanks: Vec::new(),
            filled: Vec::new(),
            candidates: Vec::new(),
            mistakes: 0,
            correct: 0,
            started_at,
            reached_end: false,
            last_result: None,
            unlocked: Vec::new(),
        };
        session.setup();
        session
    }

    fn setup(&mut self) {
        let (blanks, mut candidates, (start, end)) = {
            let section = self.section();
            (
                section.blank_indices(),
                section.candidates.clone(),
                audio::clip_window(&self.song, section),
            )
        };
        candidates.shuffle(&mut rand::thread_rng());

        self.blanks = blanks;
        self.candidates = candidates;
        self.filled.clear();
        self.mistakes = 0;
        self.correct = 0;
        self.started_at = self.clock.now();
        self.reached_end = false;
        self.last_result = None;
        self.phase = Phase::Answering;
        self.playback.play_clip(start, end);
    }

    pub fn submit(&mut self, word: &str) -> Answer {
        if self.phase != Phase::Answering {
            return Answer::Ignored;
        }
        if self.economy.hearts() == 0 {
            return Answer::Blocked {
                next_heart_in: self.economy.time_until_next_heart(),
            };
        }

        let Some(target) = self.current_target() else {
            return Answer::Ignored;
        };

        if normalize_word(word) == normalize_word(&target) {
            log::debug!("correct: {word}");
            self.filled.push(target);
            self.correct += 1;
            let unlocked = self.economy.add_score(SCORE_PER_CORRECT);
            self.unlocked.extend(unlocked);
            self.cues.play(Cue::Correct);

            if self.filled.len() == self.blanks.len() {
                return Answer::SectionComplete(self.complete_section());
            }
            Answer::Correct
        } else {
            log::debug!("incorrect: {word}, expected {target}");
            self.mistakes += 1;
            if !self.economy.use_heart() {
                return Answer::Blocked {
                    next_heart_in: self.economy.time_until_next_heart(),
                };
            }
            self.cues.play(Cue::Wrong);
            Answer::Incorrect {
                hearts_left: self.economy.record().hearts,
            }
        }
    }

    fn complete_section(&mut self) -> SectionResult {
        let time_taken = (self.clock.now() - self.started_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        let result = SectionResult::from_answers(
            self.blanks.len() as u32,
            self.correct,
            self.mistakes,
            time_taken,
        );

        let song_id = self.song.id.clone();
        let section_id = self.section().id.clone();
        let mut unlocked = self.economy.complete_section(&song_id, &section_id, result.stars);
        unlocked.extend(self.economy.add_xp(result.xp_earned()));
        unlocked.extend(self.economy.update_streak());

        let record = self.economy.record();
        if record.completed_count(&song_id) >= self.song.total_sections()
            && self.economy.unlock(Achievement::Completionist)
        {
            unlocked.push(Achievement::Completionist);
        }
        self.unlocked.extend(unlocked);

        log::info!(
            "section complete: {song_id}/{section_id} with {} stars",
            result.stars
        );
        self.cues.play(Cue::Completion);
        self.playback.stop();
        self.phase = Phase::SectionComplete;
        self.last_result = Some(result.clone());
        result
    }

    /// Moves to the next section. Returns `false` at the last section or
    /// before the current one is complete.
    pub fn next_section(&mut self) -> bool {
        if self.phase != Phase::SectionComplete || !self.has_next_section() {
            return false;
        }
        self.section_index += 1;
        self.setup();
        true
    }

    /// Restarts the current section from scratch.
    pub fn replay(&mut self) -> bool {
        if self.phase == Phase::Exited {
            return false;
        }
        self.setup();
        true
    }

    pub fn exit(&mut self) {
        self.playback.stop();
        self.phase = Phase::Exited;
        log::info!("session ended: {}", self.song.id);
    }

    pub fn poll_playback(&mut self) -> Option<PlaybackEvent> {
        let event = self.playback.poll();
        if event == Some(PlaybackEvent::ReachedEnd) {
            self.reached_end = true;
        }
        event
    }

    pub fn toggle_playback(&mut self) {
        if self.playback.is_playing() {
            self.playback.pause();
        } else if self.reached_end {
            let (start, end) = audio::clip_window(&self.song, self.section());
            self.reached_end = false;
            self.playback.play_clip(start, end);
        } else {
            self.playback.resume();
        }
    }

    pub fn playback_progress(&self) -> f64 {
        self.playback.progress()
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    pub fn reached_end(&self) -> bool {
        self.reached_end
    }

    /// Fraction of blanks filled in the current section.
    pub fn progress(&self) -> f64 {
        if self.blanks.is_empty() {
            return 0.0;
        }
        self.filled.len() as f64 / self.blanks.len() as f64
    }

    pub fn lyric_view(&self) -> Vec<LyricSlot> {
        let mut blank_number = 0;
        self.section()
            .tokens
            .iter()
            .map(|token| {
                if !token.is_blank {
                    return LyricSlot::Word(token.text.clone());
                }
                let slot = match self.filled.get(blank_number) {
                    Some(word) => LyricSlot::Filled(word.clone()),
                    None => LyricSlot::Blank {
                        current: blank_number == self.filled.len(),
                    },
                };
                blank_number += 1;
                slot
            })
            .collect()
    }

    fn current_target(&self) -> Option<String> {
        let index = *self.blanks.get(self.filled.len())?;
        self.section().tokens.get(index).map(|token| token.text.clone())
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn song(&self) -> &Song {
        &self.song
    }

    pub fn section(&self) -> &LyricSection {
        &self.song.sections[self.section_index]
    }

    pub fn section_index(&self) -> usize {
        self.section_index
    }

    pub fn has_next_section(&self) -> bool {
        self.section_index + 1 < self.song.total_sections()
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn mistakes(&self) -> u32 {
        self.mistakes
    }

    pub fn last_result(&self) -> Option<&SectionResult> {
        self.last_result.as_ref()
    }

    /// Achievements unlocked since the last call.
    pub fn take_unlocked(&mut self) -> Vec<Achievement> {
        std::mem::take(&mut self.unlocked)
    }

    pub fn record(&mut self) -> ProgressRecord {
        self.economy.record()
    }

    pub fn subscribe(&mut self) -> Receiver<ProgressRecord> {
        self.economy.subscribe()
    }
}
