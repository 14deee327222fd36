mod achievements;
mod audio;
mod catalog;
mod clock;
mod config;
mod economy;
mod error;
mod models;
mod session;
mod store;
mod tui;
mod unlock;

use std::path::PathBuf;
use std::rc::Rc;

use clap::{Parser, Subcommand};

use achievements::{unlocked_ratio, AchievementEvaluator};
use clock::{Clock, SystemClock};
use config::Config;
use economy::Economy;
use models::{Achievement, Difficulty, JsonOutput};
use store::{ProgressStore, SqliteStore};
use unlock::UnlockGate;

#[derive(Parser)]
#[command(name = "lyricloop")]
#[command(about = "Learn song lyrics by filling in the missing words")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Progress database path (overrides LYRICLOOP_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Song catalog JSON file (overrides LYRICLOOP_CATALOG)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Disable sound cues
    #[arg(long, global = true)]
    mute: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the progress database
    Init,

    /// Show level, XP, streak and hearts
    Status,

    /// List songs
    Songs {
        /// Filter by difficulty: beginner/intermediate/advanced
        #[arg(long, short)]
        difficulty: Option<String>,

        /// Search title or artist
        #[arg(long, short)]
        search: Option<String>,
    },

    /// Show song details
    Song {
        /// Song ID
        id: String,
    },

    /// Show hearts and time until the next one
    Hearts,

    /// List achievements
    Achievements,

    /// Erase all progress
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },

    /// Launch interactive terminal UI
    Tui,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::resolve(cli.db.clone(), cli.catalog.clone(), !cli.mute);
    config.ensure_db_dir()?;

    let db = Rc::new(SqliteStore::open(&config.db_path)?);
    let store = ProgressStore::new(db.clone());
    let clock: Rc<dyn Clock> = Rc::new(SystemClock);
    let catalog = config.load_catalog()?;
    let gate = UnlockGate::from_catalog(&catalog);
    let mut economy = Economy::new(
        store.clone(),
        Rc::clone(&clock),
        AchievementEvaluator::default(),
    );

    match cli.command {
        Commands::Init => {
            db.init()?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
            } else {
                println!("Database initialized at: {}", config.db_path.display());
            }
        }

        Commands::Status => {
            let record = economy.record();
            let next_heart = economy.time_until_next_heart();
            let (proxy_xp, required_xp) = gate.progress(&record);

            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                        "level": record.current_level,
                        "xp": record.total_xp,
                        "xp_for_next_level": record.xp_for_next_level(),
                        "streak": record.streak,
                        "hearts": record.hearts,
                        "next_heart_in_secs": next_heart.map(|d| d.as_secs()),
                        "total_score": record.total_score,
                        "sections_completed": record.total_completed_sections(),
                        "perfect_sections": record.perfect_sections,
                        "achievements": record.unlocked_achievements.len(),
                        "unlock_progress": { "proxy_xp": proxy_xp, "required_xp": required_xp }
                    })))?
                );
            } else {
                println!("=== LyricLoop ===");
                println!(
                    "Level: {} ({}/{} XP)",
                    record.current_level,
                    record.total_xp,
                    record.xp_for_next_level()
                );
                println!("Streak: {} days", record.streak);
                println!("Hearts: {}/{}", record.hearts, models::MAX_HEARTS);
                if let Some(wait) = next_heart {
                    println!("Next heart in: {}s", wait.as_secs());
                }
                println!("Score: {}", record.total_score);
                println!(
                    "Sections completed: {} ({} perfect)",
                    record.total_completed_sections(),
                    record.perfect_sections
                );
                println!(
                    "Achievements: {}/{}",
                    record.unlocked_achievements.len(),
                    Achievement::ALL.len()
                );
                println!("Song unlock progress: {}/{} XP", proxy_xp, required_xp);
            }
        }

        Commands::Songs { difficulty, search } => {
            let difficulty = difficulty
                .map(|d| {
                    Difficulty::from_str(&d).ok_or_else(|| {
                        format!(
                            "Invalid difficulty '{}'. Use: beginner, intermediate, or advanced",
                            d
                        )
                    })
                })
                .transpose()?;

            let record = economy.record();
            let songs = catalog.search(
                catalog.by_difficulty(difficulty),
                search.as_deref().unwrap_or(""),
            );

            if cli.json {
                let rows: Vec<serde_json::Value> = songs
                    .iter()
                    .map(|song| {
                        serde_json::json!({
                            "id": song.id,
                            "title": song.title,
                            "artist": song.artist,
                            "difficulty": song.difficulty,
                            "sections": song.total_sections(),
                            "completed": record.completed_count(&song.id),
                            "unlocked": gate.is_unlocked(&song.id, &record)
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string(&JsonOutput::ok(&rows))?);
            } else if songs.is_empty() {
                println!("No songs found.");
            } else {
                println!(
                    "{:<20} {:<24} {:<18} {:<14} DONE",
                    "ID", "TITLE", "ARTIST", "DIFFICULTY"
                );
                println!("{}", "-".repeat(86));
                for song in songs {
                    let lock = if gate.is_unlocked(&song.id, &record) {
                        ""
                    } else {
                        " (locked)"
                    };
                    println!(
                        "{:<20} {:<24} {:<18} {:<14} {}/{}{}",
                        truncate(&song.id, 20),
                        truncate(&song.title, 24),
                        truncate(&song.artist, 18),
                        song.difficulty.label(),
                        record.completed_count(&song.id),
                        song.total_sections(),
                        lock
                    );
                }
            }
        }

        Commands::Song { id } => {
            if let Ok(song) = catalog.get(&id) {
                let record = economy.record();
                let unlocked = gate.is_unlocked(&song.id, &record);

                if cli.json {
                    let sections: Vec<serde_json::Value> = song
                        .sections
                        .iter()
                        .map(|section| {
                            serde_json::json!({
                                "id": section.id,
                                "title": section.title,
                                "blanks": section.blank_count(),
                                "completed": record.is_section_completed(&song.id, &section.id)
                            })
                        })
                        .collect();
                    println!(
                        "{}",
                        serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                            "id": song.id,
                            "title": song.title,
                            "artist": song.artist,
                            "difficulty": song.difficulty,
                            "duration": song.formatted_duration(),
                            "unlocked": unlocked,
                            "sections": sections
                        })))?
                    );
                } else {
                    println!("Song: {}", song.title);
                    println!("ID: {}", song.id);
                    println!("Artist: {}", song.artist);
                    println!("Difficulty: {}", song.difficulty.label());
                    println!("Length: {}", song.formatted_duration());
                    println!("Status: {}", if unlocked { "unlocked" } else { "locked" });
                    println!();
                    println!(
                        "--- Sections ({}/{}) ---",
                        record.completed_count(&song.id),
                        song.total_sections()
                    );
                    for section in &song.sections {
                        let mark = if record.is_section_completed(&song.id, &section.id) {
                            "x"
                        } else {
                            " "
                        };
                        println!(
                            "[{}] {:<16} {} blanks",
                            mark,
                            section.title,
                            section.blank_count()
                        );
                    }
                }
            } else if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::<()>::err("Song not found"))?
                );
            } else {
                println!("Song not found.");
            }
        }

        Commands::Hearts => {
            let hearts = economy.hearts();
            let next_heart = economy.time_until_next_heart();

            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                        "hearts": hearts,
                        "max_hearts": models::MAX_HEARTS,
                        "next_heart_in_secs": next_heart.map(|d| d.as_secs())
                    })))?
                );
            } else {
                println!("Hearts: {}/{}", hearts, models::MAX_HEARTS);
                match next_heart {
                    Some(wait) => println!("Next heart in: {}s", wait.as_secs()),
                    None => println!("Hearts are full."),
                }
            }
        }

        Commands::Achievements => {
            let record = economy.record();

            if cli.json {
                let rows: Vec<serde_json::Value> = Achievement::ALL
                    .iter()
                    .map(|a| {
                        serde_json::json!({
                            "id": a.as_str(),
                            "title": a.title(),
                            "description": a.description(),
                            "icon": a.icon(),
                            "color": a.color(),
                            "unlocked": record.has_achievement(*a)
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string(&JsonOutput::ok(&rows))?);
            } else {
                println!(
                    "=== Achievements ({:.0}%) ===",
                    unlocked_ratio(&record) * 100.0
                );
                for a in Achievement::ALL {
                    let mark = if record.has_achievement(a) { "x" } else { " " };
                    println!("[{}] {:<18} {}", mark, a.title(), a.description());
                }
            }
        }

        Commands::Reset { yes } => {
            if !yes {
                return Err("Refusing to erase progress without --yes".into());
            }
            let removed = economy.reset()?;

            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(removed))?);
            } else if removed {
                println!("Progress erased.");
            } else {
                println!("No saved progress.");
            }
        }

        Commands::Tui => {
            tui::run(store, clock, catalog, config.sound)?;
        }
    }

    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    mod truncate_tests {
        use super::*;

        #[test]
        fn truncate_short_string() {
            assert_eq!(truncate("hello", 10), "hello");
        }

        #[test]
        fn truncate_exact_length() {
            assert_eq!(truncate("hello", 5), "hello");
        }

        #[test]
        fn truncate_long_string() {
            assert_eq!(truncate("hello world", 8), "hello...");
        }

        #[test]
        fn truncate_empty_string() {
            assert_eq!(truncate("", 10), "");
        }

        #[test]
        fn truncate_multibyte() {
            assert_eq!(truncate("ééééé", 4), "é...");
        }
    }

    mod cli_parsing_tests {
        use super::*;

        #[test]
        fn parse_init_command() {
            let cli = Cli::try_parse_from(["lyricloop", "init"]).unwrap();
            assert!(!cli.json);
            assert!(!cli.mute);
            assert!(matches!(cli.command, Commands::Init));
        }

        #[test]
        fn parse_init_with_json() {
            let cli = Cli::try_parse_from(["lyricloop", "--json", "init"]).unwrap();
            assert!(cli.json);
            assert!(matches!(cli.command, Commands::Init));
        }

        #[test]
        fn parse_songs_without_filters() {
            let cli = Cli::try_parse_from(["lyricloop", "songs"]).unwrap();
            match cli.command {
                Commands::Songs { difficulty, search } => {
                    assert!(difficulty.is_none());
                    assert!(search.is_none());
                }
                _ => panic!("Expected Songs command"),
            }
        }

        #[test]
        fn parse_songs_with_filters() {
            let cli =
                Cli::try_parse_from(["lyricloop", "songs", "-d", "beginner", "--search", "north"])
                    .unwrap();
            match cli.command {
                Commands::Songs { difficulty, search } => {
                    assert_eq!(difficulty, Some("beginner".to_string()));
                    assert_eq!(search, Some("north".to_string()));
                }
                _ => panic!("Expected Songs command"),
            }
        }

        #[test]
        fn parse_song_show() {
            let cli = Cli::try_parse_from(["lyricloop", "song", "harbor-lights"]).unwrap();
            match cli.command {
                Commands::Song { id } => assert_eq!(id, "harbor-lights"),
                _ => panic!("Expected Song command"),
            }
        }

        #[test]
        fn parse_reset_requires_flag_value() {
            let cli = Cli::try_parse_from(["lyricloop", "reset"]).unwrap();
            assert!(matches!(cli.command, Commands::Reset { yes: false }));

            let cli = Cli::try_parse_from(["lyricloop", "reset", "--yes"]).unwrap();
            assert!(matches!(cli.command, Commands::Reset { yes: true }));
        }

        #[test]
        fn parse_global_paths() {
            let cli = Cli::try_parse_from([
                "lyricloop",
                "status",
                "--db",
                "/tmp/progress.db",
                "--catalog",
                "/tmp/songs.json",
                "--mute",
            ])
            .unwrap();
            assert_eq!(cli.db, Some(PathBuf::from("/tmp/progress.db")));
            assert_eq!(cli.catalog, Some(PathBuf::from("/tmp/songs.json")));
            assert!(cli.mute);
        }

        #[test]
        fn parse_json_flag_global() {
            let cli1 = Cli::try_parse_from(["lyricloop", "--json", "hearts"]).unwrap();
            assert!(cli1.json);

            let cli2 = Cli::try_parse_from(["lyricloop", "achievements", "--json"]).unwrap();
            assert!(cli2.json);
        }

        #[test]
        fn parse_tui_command() {
            let cli = Cli::try_parse_from(["lyricloop", "tui"]).unwrap();
            assert!(matches!(cli.command, Commands::Tui));
        }

        #[test]
        fn parse_invalid_command_fails() {
            let result = Cli::try_parse_from(["lyricloop", "invalid"]);
            assert!(result.is_err());
        }

        #[test]
        fn parse_missing_required_arg_fails() {
            let result = Cli::try_parse_from(["lyricloop", "song"]);
            assert!(result.is_err());
        }
    }
}
