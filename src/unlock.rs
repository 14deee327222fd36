use std::collections::BTreeSet;

use crate::catalog::{Catalog, Song};
use crate::models::ProgressRecord;

/// Flat per-section XP credited toward the gate, regardless of stars earned.
pub const PROXY_XP_PER_SECTION: u32 = 100;
/// Best-case XP for one section (three stars).
pub const MAX_XP_PER_SECTION: u32 = 150;

/// Decides which songs are playable.
///
/// Initial songs are always open. Every other song opens once the proxy XP
/// earned across the initial songs reaches 70% of their maximum XP.
#[derive(Debug, Clone)]
pub struct UnlockGate {
    initial_ids: BTreeSet<String>,
    required_xp: u32,
}

impl UnlockGate {
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let initial_ids = catalog.initial_songs().map(|song| song.id.clone()).collect();
        let initial_sections: usize = catalog.initial_songs().map(Song::total_sections).sum();
        let max_xp = initial_sections as u32 * MAX_XP_PER_SECTION;

        Self {
            initial_ids,
            required_xp: (max_xp * 7).div_ceil(10),
        }
    }

    pub fn proxy_xp(&self, record: &ProgressRecord) -> u32 {
        self.initial_ids
            .iter()
            .map(|id| record.completed_count(id) as u32 * PROXY_XP_PER_SECTION)
            .sum()
    }

    pub fn is_initial(&self, song_id: &str) -> bool {
        self.initial_ids.contains(song_id)
    }

    pub fn is_unlocked(&self, song_id: &str, record: &ProgressRecord) -> bool {
        self.is_initial(song_id) || self.proxy_xp(record) >= self.required_xp
    }

    /// `(proxy_xp, required_xp)` for progress display.
    pub fn progress(&self, record: &ProgressRecord) -> (u32, u32) {
        (self.proxy_xp(record), self.required_xp)
    }
}
