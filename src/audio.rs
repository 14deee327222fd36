use std::io::{self, Write};
use std::rc::Rc;

use chrono::{DateTime, Utc};

use crate::catalog::{LyricSection, Song};
use crate::clock::Clock;

/// Progress added per `poll` by the simulated backend.
pub const SIMULATED_STEP: f64 = 0.01;

/// Seconds of the track played before a section starts.
pub const LEAD_IN: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    ReachedEnd,
}

/// Play/pause/seek over one clip window of a track.
pub trait Playback {
    /// Starts playing the window `[start, end]` (seconds) from its beginning.
    fn play_clip(&mut self, start: f64, end: f64);
    fn pause(&mut self);
    fn resume(&mut self);
    fn stop(&mut self);
    /// Moves to a fraction of the clip window, clamped to `[0, 1]`.
    fn seek(&mut self, fraction: f64);
    /// Position within the clip window in `[0, 1]`.
    fn progress(&self) -> f64;
    fn is_playing(&self) -> bool;
    /// Advances internal state; reports when the clip end is reached.
    fn poll(&mut self) -> Option<PlaybackEvent>;
}

/// Track window `(start, end)` for a section. A missing or non-positive end
/// time plays to the end of the track.
pub fn clip_window(song: &Song, section: &LyricSection) -> (f64, f64) {
    let start = (section.start_time - LEAD_IN).max(0.0);
    let end = if section.end_time > section.start_time {
        section.end_time
    } else {
        song.duration
    };
    (start, end.max(start))
}

/// Picks the backend once at construction: songs with an audio file follow
/// the wall clock, the rest use the simulated stepper.
pub fn backend_for(song: &Song, clock: Rc<dyn Clock>) -> Box<dyn Playback> {
    match &song.audio_file {
        Some(file) => {
            log::debug!("clocked playback for {file}");
            Box::new(ClockedPlayer::new(clock))
        }
        None => {
            log::debug!("simulated playback for {}", song.id);
            Box::new(SimulatedPlayer::new())
        }
    }
}

/// Tracks a clip window against the injected clock.
pub struct ClockedPlayer {
    clock: Rc<dyn Clock>,
    start: f64,
    end: f64,
    /// Seconds into the track at `resumed_at`, or the paused position
    position: f64,
    resumed_at: Option<DateTime<Utc>>,
}

impl ClockedPlayer {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            start: 0.0,
            end: 0.0,
            position: 0.0,
            resumed_at: None,
        }
    }

    fn current_position(&self) -> f64 {
        match self.resumed_at {
            Some(at) => {
                let elapsed = (self.clock.now() - at).num_milliseconds().max(0) as f64 / 1000.0;
                (self.position + elapsed).min(self.end)
            }
            None => self.position,
        }
    }
}

impl Playback for ClockedPlayer {
    fn play_clip(&mut self, start: f64, end: f64) {
        self.start = start;
        self.end = end.max(start);
        self.position = start;
        self.resumed_at = Some(self.clock.now());
    }

    fn pause(&mut self) {
        self.position = self.current_position();
        self.resumed_at = None;
    }

    fn resume(&mut self) {
        if self.resumed_at.is_none() && self.position < self.end {
            self.resumed_at = Some(self.clock.now());
        }
    }

    fn stop(&mut self) {
        self.position = self.start;
        self.resumed_at = None;
    }

    fn seek(&mut self, fraction: f64) {
        let playing = self.resumed_at.is_some();
        self.position = self.start + (self.end - self.start) * fraction.clamp(0.0, 1.0);
        self.resumed_at = playing.then(|| self.clock.now());
    }

    fn progress(&self) -> f64 {
        let length = self.end - self.start;
        if length <= 0.0 {
            return 0.0;
        }
        ((self.current_position() - self.start) / length).clamp(0.0, 1.0)
    }

    fn is_playing(&self) -> bool {
        self.resumed_at.is_some()
    }

    fn poll(&mut self) -> Option<PlaybackEvent> {
        self.resumed_at?;
        if self.current_position() < self.end {
            return None;
        }
        self.position = self.end;
        self.resumed_at = None;
        Some(PlaybackEvent::ReachedEnd)
    }
}

/// Fixed-step stand-in for songs without an audio file.
#[derive(Debug, Default)]
pub struct SimulatedPlayer {
    progress: f64,
    playing: bool,
}

impl SimulatedPlayer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Playback for SimulatedPlayer {
    fn play_clip(&mut self, _start: f64, _end: f64) {
        self.progress = 0.0;
        self.playing = true;
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn resume(&mut self) {
        self.playing = self.progress < 1.0;
    }

    fn stop(&mut self) {
        self.progress = 0.0;
        self.playing = false;
    }

    fn seek(&mut self, fraction: f64) {
        self.progress = fraction.clamp(0.0, 1.0);
    }

    fn progress(&self) -> f64 {
        self.progress
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn poll(&mut self) -> Option<PlaybackEvent> {
        if !self.playing {
            return None;
        }
        self.progress = (self.progress + SIMULATED_STEP).min(1.0);
        // Tolerate float drift from repeated steps
        if self.progress >= 1.0 - SIMULATED_STEP / 2.0 {
            self.progress = 1.0;
            self.playing = false;
            return Some(PlaybackEvent::ReachedEnd);
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Correct,
    Wrong,
    Completion,
}

pub trait SoundCues {
    fn play(&mut self, cue: Cue);
}

/// Rings the terminal bell for mistakes and completed sections.
pub struct TerminalBell;

impl SoundCues for TerminalBell {
    fn play(&mut self, cue: Cue) {
        if cue == Cue::Correct {
            return;
        }
        let mut out = io::stdout();
        if let Err(e) = out.write_all(b"\x07").and_then(|_| out.flush()) {
            log::debug!("bell failed: {e}");
        }
    }
}

pub struct SilentCues;

impl SoundCues for SilentCues {
    fn play(&mut self, cue: Cue) {
        log::debug!("cue {cue:?}");
    }
}

pub fn cues_for(sound: bool) -> Box<dyn SoundCues> {
    if sound {
        Box::new(TerminalBell)
    } else {
        Box::new(SilentCues)
    }
}
