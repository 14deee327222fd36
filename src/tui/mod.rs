mod ui;
mod widgets;

use std::io;
use std::rc::Rc;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::achievements::AchievementEvaluator;
use crate::audio;
use crate::catalog::{Catalog, Song};
use crate::clock::Clock;
use crate::economy::Economy;
use crate::models::{Achievement, Difficulty, ProgressRecord};
use crate::session::{Answer, GameSession, Phase};
use crate::store::ProgressStore;
use crate::unlock::UnlockGate;

const HEART_REFRESH: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Songs,
    SongDetail,
    Play,
}

impl View {
    fn next(&self) -> Self {
        match self {
            View::Dashboard => View::Songs,
            View::Songs => View::Dashboard,
            View::SongDetail => View::Songs,
            View::Play => View::Play,
        }
    }

    fn prev(&self) -> Self {
        match self {
            View::Dashboard => View::Songs,
            View::Songs => View::Dashboard,
            View::SongDetail => View::Songs,
            View::Play => View::Play,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Good,
    Bad,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub message: String,
    pub tone: Tone,
}

impl Feedback {
    fn new(message: impl Into<String>, tone: Tone) -> Self {
        Self {
            message: message.into(),
            tone,
        }
    }
}

pub struct StatefulList<T> {
    pub items: Vec<T>,
    pub selected: Option<usize>,
}

impl<T> StatefulList<T> {
    fn with_items(items: Vec<T>) -> Self {
        let selected = if items.is_empty() { None } else { Some(0) };
        Self { items, selected }
    }

    fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(i) if i + 1 < self.items.len() => i + 1,
            _ => 0,
        };
        self.selected = Some(i);
    }

    fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(0) | None => self.items.len() - 1,
            Some(i) => i - 1,
        };
        self.selected = Some(i);
    }

    fn selected_item(&self) -> Option<&T> {
        self.selected.and_then(|i| self.items.get(i))
    }
}

pub struct App {
    store: ProgressStore,
    clock: Rc<dyn Clock>,
    economy: Economy,
    updates: Vec<Receiver<ProgressRecord>>,
    sound: bool,
    last_heart_refresh: Option<Instant>,
    pub catalog: Catalog,
    pub gate: UnlockGate,
    pub view: View,
    pub record: ProgressRecord,
    pub next_heart_in: Option<Duration>,
    pub songs: StatefulList<Song>,
    pub selected_song: Option<Song>,
    pub session: Option<GameSession>,
    pub candidate_cursor: usize,
    pub feedback: Option<Feedback>,
    pub recent_unlocks: Vec<Achievement>,
    pub filter_difficulty: Option<Difficulty>,
    pub search: String,
    pub search_input: String,
    pub search_mode: bool,
    pub should_quit: bool,
}

impl App {
    pub fn new(store: ProgressStore, clock: Rc<dyn Clock>, catalog: Catalog, sound: bool) -> Self {
        let mut economy = Economy::new(
            store.clone(),
            Rc::clone(&clock),
            AchievementEvaluator::default(),
        );
        let updates = vec![economy.subscribe()];
        let record = economy.record();
        let next_heart_in = economy.time_until_next_heart();
        let gate = UnlockGate::from_catalog(&catalog);
        let songs = StatefulList::with_items(
            catalog.by_difficulty(None).into_iter().cloned().collect(),
        );

        Self {
            store,
            clock,
            economy,
            updates,
            sound,
            last_heart_refresh: None,
            catalog,
            gate,
            view: View::Dashboard,
            record,
            next_heart_in,
            songs,
            selected_song: None,
            session: None,
            candidate_cursor: 0,
            feedback: None,
            recent_unlocks: Vec::new(),
            filter_difficulty: None,
            search: String::new(),
            search_input: String::new(),
            search_mode: false,
            should_quit: false,
        }
    }

    pub fn is_unlocked(&self, song: &Song) -> bool {
        self.gate.is_unlocked(&song.id, &self.record)
    }

    /// Per-frame housekeeping: playback polling, record updates and the
    /// heart countdown.
    pub fn tick(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.poll_playback();
        }

        let due = self
            .last_heart_refresh
            .map_or(true, |at| at.elapsed() >= HEART_REFRESH);
        if due {
            self.last_heart_refresh = Some(Instant::now());
            self.economy.record();
            self.next_heart_in = self.economy.time_until_next_heart();
        }

        self.drain_updates();
    }

    fn drain_updates(&mut self) {
        let mut latest = None;
        self.updates.retain(|rx| loop {
            match rx.try_recv() {
                Ok(record) => latest = Some(record),
                Err(TryRecvError::Empty) => break true,
                Err(TryRecvError::Disconnected) => break false,
            }
        });
        if let Some(record) = latest {
            self.record = record;
        }
    }

    fn refresh_songs(&mut self) {
        let listed = self.catalog.by_difficulty(self.filter_difficulty);
        let songs = self
            .catalog
            .search(listed, &self.search)
            .into_iter()
            .cloned()
            .collect();
        self.songs = StatefulList::with_items(songs);
    }

    fn cycle_difficulty(&mut self) {
        self.filter_difficulty = match self.filter_difficulty {
            None => Some(Difficulty::Beginner),
            Some(Difficulty::Beginner) => Some(Difficulty::Intermediate),
            Some(Difficulty::Intermediate) => Some(Difficulty::Advanced),
            Some(Difficulty::Advanced) => None,
        };
        self.refresh_songs();
    }

    fn select_song(&mut self) {
        if let Some(song) = self.songs.selected_item() {
            self.selected_song = Some(song.clone());
            self.view = View::SongDetail;
        }
    }

    fn start_session(&mut self) {
        let Some(song) = self.selected_song.clone() else {
            return;
        };
        if !self.is_unlocked(&song) {
            let (have, need) = self.gate.progress(&self.record);
            self.feedback = Some(Feedback::new(
                format!("Locked: {have}/{need} XP from starter songs"),
                Tone::Bad,
            ));
            return;
        }

        let economy = Economy::new(
            self.store.clone(),
            Rc::clone(&self.clock),
            AchievementEvaluator::default(),
        );
        let playback = audio::backend_for(&song, Rc::clone(&self.clock));
        let cues = audio::cues_for(self.sound);

        let mut session = GameSession::start(economy, song, playback, cues, Rc::clone(&self.clock));
        self.updates.push(session.subscribe());
        self.record = session.record();
        self.session = Some(session);
        self.candidate_cursor = 0;
        self.feedback = None;
        self.view = View::Play;
    }

    fn end_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.exit();
        }
        self.record = self.economy.record();
        self.feedback = None;
        self.view = View::SongDetail;
    }

    fn submit_candidate(&mut self, index: usize) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(word) = session.candidates().get(index).cloned() else {
            return;
        };

        let feedback = match session.submit(&word) {
            Answer::Correct => Some(Feedback::new(format!("\"{word}\" is right"), Tone::Good)),
            Answer::Incorrect { hearts_left } => Some(Feedback::new(
                format!("Not \"{word}\". {hearts_left} hearts left"),
                Tone::Bad,
            )),
            Answer::Blocked { next_heart_in } => Some(Feedback::new(
                match next_heart_in {
                    Some(wait) => format!("Out of hearts. Next heart in {}s", wait.as_secs()),
                    None => "Out of hearts".to_string(),
                },
                Tone::Bad,
            )),
            Answer::SectionComplete(result) => Some(Feedback::new(
                format!(
                    "Section complete: {} stars, +{} XP",
                    result.stars,
                    result.xp_earned()
                ),
                Tone::Good,
            )),
            Answer::Ignored => None,
        };

        let unlocked = session.take_unlocked();
        if !unlocked.is_empty() {
            self.recent_unlocks.extend(unlocked);
        }
        if feedback.is_some() {
            self.feedback = feedback;
        }
        self.drain_updates();
    }

    fn handle_play_key(&mut self, key: KeyCode) {
        let Some(session) = self.session.as_mut() else {
            self.view = View::SongDetail;
            return;
        };
        let pool = session.candidates().len();

        match key {
            KeyCode::Esc | KeyCode::Char('q') => self.end_session(),
            KeyCode::Char('h') | KeyCode::Left if pool > 0 => {
                self.candidate_cursor = (self.candidate_cursor + pool - 1) % pool;
            }
            KeyCode::Char('l') | KeyCode::Right if pool > 0 => {
                self.candidate_cursor = (self.candidate_cursor + 1) % pool;
            }
            KeyCode::Enter => match session.phase() {
                Phase::Answering => self.submit_candidate(self.candidate_cursor),
                Phase::SectionComplete if session.has_next_section() => {
                    session.next_section();
                    self.candidate_cursor = 0;
                    self.feedback = None;
                }
                Phase::SectionComplete => self.end_session(),
                Phase::Exited => self.end_session(),
            },
            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                if index < pool {
                    self.candidate_cursor = index;
                    self.submit_candidate(index);
                }
            }
            KeyCode::Char('n') => {
                if session.next_section() {
                    self.candidate_cursor = 0;
                    self.feedback = None;
                }
            }
            KeyCode::Char('r') => {
                if session.replay() {
                    self.candidate_cursor = 0;
                    self.feedback = Some(Feedback::new("Replaying section", Tone::Info));
                }
            }
            KeyCode::Char(' ') | KeyCode::Char('p') => session.toggle_playback(),
            _ => {}
        }
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        if self.view == View::Play {
            self.handle_play_key(key);
            return;
        }

        if self.search_mode {
            match key {
                KeyCode::Esc => {
                    self.search_mode = false;
                    self.search_input.clear();
                }
                KeyCode::Enter => {
                    self.search_mode = false;
                    self.search = self.search_input.clone();
                    self.refresh_songs();
                }
                KeyCode::Backspace => {
                    self.search_input.pop();
                }
                KeyCode::Char(c) => {
                    self.search_input.push(c);
                }
                _ => {}
            }
            return;
        }

        match key {
            KeyCode::Char('q') => self.should_quit = true,

            KeyCode::Char('r') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.record = self.economy.record();
                self.next_heart_in = self.economy.time_until_next_heart();
            }

            KeyCode::Char('/') if self.view == View::Songs => {
                self.search_mode = true;
                self.search_input.clear();
            }
            KeyCode::Char('d') if self.view == View::Songs => self.cycle_difficulty(),

            KeyCode::Esc => match self.view {
                View::SongDetail => {
                    self.view = View::Songs;
                    self.selected_song = None;
                    self.feedback = None;
                }
                View::Songs if !self.search.is_empty() || self.filter_difficulty.is_some() => {
                    self.search.clear();
                    self.search_input.clear();
                    self.filter_difficulty = None;
                    self.refresh_songs();
                }
                _ => {}
            },

            KeyCode::Char('h') | KeyCode::Left => match self.view {
                View::SongDetail => {
                    self.view = View::Songs;
                    self.selected_song = None;
                    self.feedback = None;
                }
                _ => self.view = self.view.prev(),
            },
            KeyCode::Char('l') | KeyCode::Right => match self.view {
                View::Songs => self.select_song(),
                _ => self.view = self.view.next(),
            },

            KeyCode::Tab | KeyCode::BackTab => {
                self.view = self.view.next();
            }

            KeyCode::Char('j') | KeyCode::Down if self.view == View::Songs => self.songs.next(),
            KeyCode::Char('k') | KeyCode::Up if self.view == View::Songs => {
                self.songs.previous()
            }
            KeyCode::Char('g') if self.view == View::Songs && !self.songs.items.is_empty() => {
                self.songs.selected = Some(0);
            }
            KeyCode::Char('G') if self.view == View::Songs && !self.songs.items.is_empty() => {
                self.songs.selected = Some(self.songs.items.len() - 1);
            }

            KeyCode::Enter => match self.view {
                View::Songs => self.select_song(),
                View::SongDetail => self.start_session(),
                _ => {}
            },
            KeyCode::Char('p') if self.view == View::SongDetail => self.start_session(),

            _ => {}
        }
    }
}

pub fn run(
    store: ProgressStore,
    clock: Rc<dyn Clock>,
    catalog: Catalog,
    sound: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(store, clock, catalog, sound);

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        app.tick();
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key.code, key.modifiers);
            }
        }

        if app.should_quit {
            if let Some(mut session) = app.session.take() {
                session.exit();
            }
            return Ok(());
        }
    }
}
