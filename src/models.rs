use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_HEARTS: u32 = 20;
pub const XP_PER_LEVEL: u32 = 500;

/// The single persisted progress record for the player on this device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressRecord {
    /// XP carried toward the next level (the leveling loop subtracts spent thresholds).
    pub total_xp: u32,
    pub current_level: u32,
    pub streak: u32,
    pub last_play_date: Option<DateTime<Utc>>,
    /// song id -> completed section ids
    pub completed_sections: BTreeMap<String, BTreeSet<String>>,
    pub unlocked_achievements: BTreeSet<Achievement>,
    pub hearts: u32,
    pub last_heart_refill_time: Option<DateTime<Utc>>,
    pub total_score: u32,
    pub sections_completed_in_session: u32,
    pub perfect_sections: u32,
}

impl Default for ProgressRecord {
    fn default() -> Self {
        Self {
            total_xp: 0,
            current_level: 1,
            streak: 0,
            last_play_date: None,
            completed_sections: BTreeMap::new(),
            unlocked_achievements: BTreeSet::new(),
            hearts: MAX_HEARTS,
            last_heart_refill_time: None,
            total_score: 0,
            sections_completed_in_session: 0,
            perfect_sections: 0,
        }
    }
}

impl ProgressRecord {
    pub fn xp_for_next_level(&self) -> u32 {
        self.current_level * XP_PER_LEVEL
    }

    pub fn is_section_completed(&self, song_id: &str, section_id: &str) -> bool {
        self.completed_sections
            .get(song_id)
            .is_some_and(|sections| sections.contains(section_id))
    }

    pub fn completed_count(&self, song_id: &str) -> usize {
        self.completed_sections.get(song_id).map_or(0, BTreeSet::len)
    }

    pub fn total_completed_sections(&self) -> usize {
        self.completed_sections.values().map(BTreeSet::len).sum()
    }

    pub fn completion_percentage(&self, song_id: &str, total_sections: usize) -> f64 {
        if total_sections == 0 {
            0.0
        } else {
            self.completed_count(song_id) as f64 / total_sections as f64
        }
    }

    pub fn has_achievement(&self, achievement: Achievement) -> bool {
        self.unlocked_achievements.contains(&achievement)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Achievement {
    FirstSteps,
    StarCollector,
    StarMaster,
    OnFire,
    MasterLearner,
    PerfectSection,
    SpeedDemon,
    HeartBreaker,
    Completionist,
    LevelUp,
}

impl Achievement {
    pub const ALL: [Achievement; 10] = [
        Achievement::FirstSteps,
        Achievement::StarCollector,
        Achievement::StarMaster,
        Achievement::OnFire,
        Achievement::MasterLearner,
        Achievement::PerfectSection,
        Achievement::SpeedDemon,
        Achievement::HeartBreaker,
        Achievement::Completionist,
        Achievement::LevelUp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Achievement::FirstSteps => "first_steps",
            Achievement::StarCollector => "star_collector",
            Achievement::StarMaster => "star_master",
            Achievement::OnFire => "on_fire",
            Achievement::MasterLearner => "master_learner",
            Achievement::PerfectSection => "perfect_section",
            Achievement::SpeedDemon => "speed_demon",
            Achievement::HeartBreaker => "heart_breaker",
            Achievement::Completionist => "completionist",
            Achievement::LevelUp => "level_up",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Achievement::FirstSteps => "First Steps",
            Achievement::StarCollector => "Star Collector",
            Achievement::StarMaster => "Star Master",
            Achievement::OnFire => "On Fire",
            Achievement::MasterLearner => "Master Learner",
            Achievement::PerfectSection => "Perfect Section",
            Achievement::SpeedDemon => "Speed Demon",
            Achievement::HeartBreaker => "Heart Breaker",
            Achievement::Completionist => "Completionist",
            Achievement::LevelUp => "Level Up",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Achievement::FirstSteps => "Complete your first section",
            Achievement::StarCollector => "Earn 100 stars (score)",
            Achievement::StarMaster => "Earn 500 stars (score)",
            Achievement::OnFire => "Maintain a 7-day streak",
            Achievement::MasterLearner => "Reach level 10",
            Achievement::PerfectSection => "Complete a section with 3 stars",
            Achievement::SpeedDemon => "Complete 5 sections in one session",
            Achievement::HeartBreaker => "Use all 20 hearts",
            Achievement::Completionist => "Complete all sections of a song",
            Achievement::LevelUp => "Reach level 5",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Achievement::FirstSteps => "trophy",
            Achievement::StarCollector => "star",
            Achievement::StarMaster => "star-circle",
            Achievement::OnFire => "flame",
            Achievement::MasterLearner => "graduation-cap",
            Achievement::PerfectSection => "sparkles",
            Achievement::SpeedDemon => "bolt",
            Achievement::HeartBreaker => "heart-slash",
            Achievement::Completionist => "seal-check",
            Achievement::LevelUp => "arrow-up",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Achievement::FirstSteps | Achievement::StarCollector | Achievement::StarMaster => {
                "warning"
            }
            Achievement::OnFire | Achievement::HeartBreaker => "error",
            Achievement::MasterLearner => "primary",
            Achievement::PerfectSection | Achievement::SpeedDemon | Achievement::LevelUp => {
                "accent"
            }
            Achievement::Completionist => "success",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "Beginner",
            Difficulty::Intermediate => "Intermediate",
            Difficulty::Advanced => "Advanced",
        }
    }

    pub fn order(&self) -> u8 {
        match self {
            Difficulty::Beginner => 0,
            Difficulty::Intermediate => 1,
            Difficulty::Advanced => 2,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "beginner" | "b" | "easy" => Some(Difficulty::Beginner),
            "intermediate" | "i" | "medium" => Some(Difficulty::Intermediate),
            "advanced" | "a" | "hard" => Some(Difficulty::Advanced),
            _ => None,
        }
    }
}

/// Outcome of one completed section, consumed by the UI and the rules engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionResult {
    pub stars: u32,
    pub accuracy: f64,
    pub mistakes: u32,
    pub time_taken: Duration,
}

impl SectionResult {
    pub fn from_answers(
        total_blanks: u32,
        correct_answers: u32,
        mistakes: u32,
        time_taken: Duration,
    ) -> Self {
        let accuracy = if total_blanks > 0 {
            correct_answers as f64 / (total_blanks + mistakes) as f64
        } else {
            1.0
        };

        let stars = if accuracy >= 0.9 && mistakes == 0 {
            3
        } else if accuracy >= 0.7 && mistakes <= 1 {
            2
        } else {
            1
        };

        Self {
            stars,
            accuracy,
            mistakes,
            time_taken,
        }
    }

    pub fn xp_earned(&self) -> u32 {
        self.stars * 50
    }
}

// JSON output wrapper for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod record_tests {
        use super::*;

        fn record_with(song: &str, sections: &[&str]) -> ProgressRecord {
            let mut record = ProgressRecord::default();
            record.completed_sections.insert(
                song.to_string(),
                sections.iter().map(|s| s.to_string()).collect(),
            );
            record
        }

        #[test]
        fn default_record_is_new_player() {
            let record = ProgressRecord::default();
            assert_eq!(record.current_level, 1);
            assert_eq!(record.total_xp, 0);
            assert_eq!(record.hearts, MAX_HEARTS);
            assert_eq!(record.streak, 0);
            assert!(record.last_play_date.is_none());
            assert!(record.completed_sections.is_empty());
            assert!(record.unlocked_achievements.is_empty());
        }

        #[test]
        fn xp_for_next_level_grows_linearly() {
            let mut record = ProgressRecord::default();
            assert_eq!(record.xp_for_next_level(), 500);
            record.current_level = 4;
            assert_eq!(record.xp_for_next_level(), 2000);
        }

        #[test]
        fn section_completion_queries() {
            let record = record_with("song-1", &["a", "b"]);
            assert!(record.is_section_completed("song-1", "a"));
            assert!(!record.is_section_completed("song-1", "c"));
            assert!(!record.is_section_completed("song-2", "a"));
            assert_eq!(record.completed_count("song-1"), 2);
            assert_eq!(record.completed_count("song-2"), 0);
            assert_eq!(record.total_completed_sections(), 2);
        }

        #[test]
        fn completion_percentage() {
            let record = record_with("song-1", &["a", "b"]);
            assert_eq!(record.completion_percentage("song-1", 4), 0.5);
            assert_eq!(record.completion_percentage("song-1", 0), 0.0);
            assert_eq!(record.completion_percentage("song-2", 5), 0.0);
        }

        #[test]
        fn deserializes_partial_blob_with_defaults() {
            let record: ProgressRecord =
                serde_json::from_str(r#"{"total_score": 40, "streak": 3}"#).unwrap();
            assert_eq!(record.total_score, 40);
            assert_eq!(record.streak, 3);
            assert_eq!(record.current_level, 1);
            assert_eq!(record.hearts, MAX_HEARTS);
        }

        #[test]
        fn achievements_serialize_as_ids() {
            let mut record = ProgressRecord::default();
            record.unlocked_achievements.insert(Achievement::OnFire);
            let json = serde_json::to_string(&record).unwrap();
            assert!(json.contains("\"unlocked_achievements\":[\"on_fire\"]"));
        }
    }

    mod achievement_tests {
        use super::*;

        #[test]
        fn display_payload_present() {
            for achievement in Achievement::ALL {
                assert!(!achievement.title().is_empty());
                assert!(!achievement.description().is_empty());
                assert!(!achievement.icon().is_empty());
                assert!(!achievement.color().is_empty());
            }
        }
    }

    mod difficulty_tests {
        use super::*;

        #[test]
        fn from_str_accepts_aliases() {
            assert_eq!(Difficulty::from_str("beginner"), Some(Difficulty::Beginner));
            assert_eq!(Difficulty::from_str("MEDIUM"), Some(Difficulty::Intermediate));
            assert_eq!(Difficulty::from_str("a"), Some(Difficulty::Advanced));
            assert_eq!(Difficulty::from_str("expert"), None);
        }

        #[test]
        fn order_matches_tier() {
            assert!(Difficulty::Beginner.order() < Difficulty::Intermediate.order());
            assert!(Difficulty::Intermediate.order() < Difficulty::Advanced.order());
        }
    }

    mod section_result_tests {
        use super::*;

        fn result(total: u32, correct: u32, mistakes: u32) -> SectionResult {
            SectionResult::from_answers(total, correct, mistakes, Duration::from_secs(12))
        }

        #[test]
        fn no_mistakes_is_three_stars() {
            let r = result(3, 3, 0);
            assert_eq!(r.accuracy, 1.0);
            assert_eq!(r.stars, 3);
            assert_eq!(r.xp_earned(), 150);
        }

        #[test]
        fn one_mistake_is_two_stars() {
            let r = result(3, 3, 1);
            assert_eq!(r.accuracy, 0.75);
            assert_eq!(r.stars, 2);
        }

        #[test]
        fn two_mistakes_is_one_star() {
            let r = result(3, 3, 2);
            assert_eq!(r.accuracy, 0.6);
            assert_eq!(r.stars, 1);
            assert_eq!(r.xp_earned(), 50);
        }

        #[test]
        fn one_mistake_on_short_section_is_one_star() {
            // 2 / 3 is below the two-star accuracy bar
            let r = result(2, 2, 1);
            assert_eq!(r.stars, 1);
        }

        #[test]
        fn no_blanks_is_full_accuracy() {
            let r = result(0, 0, 0);
            assert_eq!(r.accuracy, 1.0);
            assert_eq!(r.stars, 3);
        }
    }

    mod json_output_tests {
        use super::*;

        #[test]
        fn ok_with_string() {
            let output = JsonOutput::ok("test data");
            assert!(output.success);
            assert_eq!(output.data, Some("test data"));
            assert!(output.error.is_none());
        }

        #[test]
        fn err_with_string() {
            let output = JsonOutput::<()>::err("something went wrong");
            assert!(!output.success);
            assert!(output.data.is_none());
            assert_eq!(output.error, Some("something went wrong".to_string()));
        }

        #[test]
        fn serializes_err_correctly() {
            let output = JsonOutput::<()>::err("error");
            let json = serde_json::to_string(&output).unwrap();
            assert!(json.contains("\"success\":false"));
            assert!(json.contains("\"data\":null"));
            assert!(json.contains("\"error\":\"error\""));
        }
    }
}
