use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::Difficulty;

const BUILTIN_CATALOG: &str = include_str!("../assets/catalog.json");

/// Lowercased word with surrounding punctuation removed, used for both
/// blank detection and answer comparison.
pub fn normalize_word(word: &str) -> String {
    word.trim_matches(|c: char| {
        c.is_ascii_punctuation() || matches!(c, '‘' | '’' | '“' | '”' | '…')
    })
    .to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LyricToken {
    pub text: String,
    pub is_blank: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LyricSection {
    pub id: String,
    pub title: String,
    pub text: String,
    pub tokens: Vec<LyricToken>,
    pub candidates: Vec<String>,
    pub start_time: f64,
    pub end_time: f64,
}

impl LyricSection {
    fn from_def(def: SectionDef) -> Self {
        let missing: HashSet<String> = def.missing_words.iter().map(|w| normalize_word(w)).collect();

        let tokens = def
            .text
            .split(' ')
            .filter(|word| !word.is_empty())
            .map(|word| LyricToken {
                text: word.to_string(),
                is_blank: missing.contains(&normalize_word(word)),
            })
            .collect();

        Self {
            id: def.id,
            title: def.title,
            text: def.text,
            tokens,
            candidates: def.candidates,
            start_time: def.start_time,
            end_time: def.end_time,
        }
    }

    /// Token indices of the blanks, left to right.
    pub fn blank_indices(&self) -> Vec<usize> {
        self.tokens
            .iter()
            .enumerate()
            .filter(|(_, token)| token.is_blank)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn blank_count(&self) -> usize {
        self.tokens.iter().filter(|token| token.is_blank).count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Song {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub difficulty: Difficulty,
    /// Seconds
    pub duration: f64,
    pub audio_file: Option<String>,
    pub initial: bool,
    pub sections: Vec<LyricSection>,
}

impl Song {
    pub fn total_sections(&self) -> usize {
        self.sections.len()
    }

    pub fn formatted_duration(&self) -> String {
        let secs = self.duration.max(0.0) as u64;
        format!("{}:{:02}", secs / 60, secs % 60)
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    songs: Vec<SongDef>,
}

#[derive(Deserialize)]
struct SongDef {
    id: String,
    title: String,
    artist: String,
    difficulty: Difficulty,
    duration: f64,
    #[serde(default)]
    audio_file: Option<String>,
    #[serde(default)]
    initial: bool,
    sections: Vec<SectionDef>,
}

#[derive(Deserialize)]
struct SectionDef {
    id: String,
    title: String,
    text: String,
    missing_words: Vec<String>,
    candidates: Vec<String>,
    #[serde(default)]
    start_time: f64,
    #[serde(default)]
    end_time: f64,
}

/// Ordered, read-only list of songs.
#[derive(Debug, Clone)]
pub struct Catalog {
    songs: Vec<Song>,
}

impl Catalog {
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(raw)?;
        let songs = file
            .songs
            .into_iter()
            .map(|def| Song {
                id: def.id,
                title: def.title,
                artist: def.artist,
                difficulty: def.difficulty,
                duration: def.duration,
                audio_file: def.audio_file,
                initial: def.initial,
                sections: def.sections.into_iter().map(LyricSection::from_def).collect(),
            })
            .collect();

        let catalog = Self { songs };
        catalog.validate()?;
        log::debug!("loaded catalog with {} songs", catalog.songs.len());
        Ok(catalog)
    }

    fn validate(&self) -> Result<()> {
        let mut song_ids = HashSet::new();
        for song in &self.songs {
            if !song_ids.insert(song.id.as_str()) {
                return Err(Error::Catalog(format!("duplicate song id '{}'", song.id)));
            }
            if song.sections.is_empty() {
                return Err(Error::Catalog(format!("song '{}' has no sections", song.id)));
            }

            let mut section_ids = HashSet::new();
            for section in &song.sections {
                if !section_ids.insert(section.id.as_str()) {
                    return Err(Error::Catalog(format!(
                        "duplicate section id '{}' in song '{}'",
                        section.id, song.id
                    )));
                }
                if section.blank_count() == 0 {
                    return Err(Error::Catalog(format!(
                        "section '{}' in song '{}' has no blanks",
                        section.id, song.id
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<&Song> {
        self.songs
            .iter()
            .find(|song| song.id == id)
            .ok_or_else(|| Error::UnknownSong(id.to_string()))
    }

    pub fn initial_songs(&self) -> impl Iterator<Item = &Song> {
        self.songs.iter().filter(|song| song.initial)
    }

    /// Songs of one tier in catalog order, or every song sorted by tier.
    pub fn by_difficulty(&self, difficulty: Option<Difficulty>) -> Vec<&Song> {
        match difficulty {
            Some(difficulty) => self
                .songs
                .iter()
                .filter(|song| song.difficulty == difficulty)
                .collect(),
            None => {
                let mut songs: Vec<&Song> = self.songs.iter().collect();
                songs.sort_by_key(|song| song.difficulty.order());
                songs
            }
        }
    }

    /// Case-insensitive match on title or artist. An empty query matches all.
    pub fn search<'a>(&self, songs: Vec<&'a Song>, query: &str) -> Vec<&'a Song> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return songs;
        }
        songs
            .into_iter()
            .filter(|song| {
                song.title.to_lowercase().contains(&query)
                    || song.artist.to_lowercase().contains(&query)
            })
            .collect()
    }
}
