use crate::models::{Achievement, ProgressRecord};

pub const STAR_COLLECTOR_SCORE: u32 = 100;
pub const STAR_MASTER_SCORE: u32 = 500;
pub const ON_FIRE_STREAK: u32 = 7;
pub const LEVEL_UP_LEVEL: u32 = 5;
pub const MASTER_LEARNER_LEVEL: u32 = 10;
pub const SPEED_DEMON_SECTIONS: u32 = 5;

impl Achievement {
    /// Whether the record satisfies this achievement's unlock condition.
    ///
    /// `Completionist` depends on the song catalog, not the record alone, so it
    /// never unlocks here; the session checks it when a section completes.
    pub fn is_satisfied(&self, record: &ProgressRecord) -> bool {
        match self {
            Achievement::FirstSteps => record.total_completed_sections() > 0,
            Achievement::StarCollector => record.total_score >= STAR_COLLECTOR_SCORE,
            Achievement::StarMaster => record.total_score >= STAR_MASTER_SCORE,
            Achievement::OnFire => record.streak >= ON_FIRE_STREAK,
            Achievement::MasterLearner => record.current_level >= MASTER_LEARNER_LEVEL,
            Achievement::PerfectSection => record.perfect_sections > 0,
            Achievement::SpeedDemon => {
                record.sections_completed_in_session >= SPEED_DEMON_SECTIONS
            }
            Achievement::HeartBreaker => {
                record.hearts == 0 && record.last_heart_refill_time.is_some()
            }
            Achievement::Completionist => false,
            Achievement::LevelUp => record.current_level >= LEVEL_UP_LEVEL,
        }
    }
}

/// Scans the achievement catalog against a record.
#[derive(Debug, Clone)]
pub struct AchievementEvaluator {
    catalog: Vec<Achievement>,
}

impl Default for AchievementEvaluator {
    fn default() -> Self {
        Self {
            catalog: Achievement::ALL
                .into_iter()
                .filter(|a| *a != Achievement::Completionist)
                .collect(),
        }
    }
}

impl AchievementEvaluator {
    /// Adds every satisfied, not yet unlocked achievement to the record and
    /// returns the newly unlocked ones in catalog order.
    pub fn evaluate(&self, record: &mut ProgressRecord) -> Vec<Achievement> {
        let newly: Vec<Achievement> = self
            .catalog
            .iter()
            .copied()
            .filter(|a| !record.has_achievement(*a) && a.is_satisfied(&*record))
            .collect();

        record.unlocked_achievements.extend(newly.iter().copied());
        newly
    }
}

/// Achievements whose threshold was crossed upward between two snapshots.
pub fn crossed(before: &ProgressRecord, after: &ProgressRecord) -> Vec<Achievement> {
    let mut out = Vec::new();

    let score_marks = [
        (STAR_COLLECTOR_SCORE, Achievement::StarCollector),
        (STAR_MASTER_SCORE, Achievement::StarMaster),
    ];
    for (mark, achievement) in score_marks {
        if before.total_score < mark && after.total_score >= mark {
            out.push(achievement);
        }
    }

    let level_marks = [
        (LEVEL_UP_LEVEL, Achievement::LevelUp),
        (MASTER_LEARNER_LEVEL, Achievement::MasterLearner),
    ];
    for (mark, achievement) in level_marks {
        if before.current_level < mark && after.current_level >= mark {
            out.push(achievement);
        }
    }

    if before.hearts > 0 && after.hearts == 0 {
        out.push(Achievement::HeartBreaker);
    }
    if after.perfect_sections > before.perfect_sections {
        out.push(Achievement::PerfectSection);
    }
    if before.sections_completed_in_session < SPEED_DEMON_SECTIONS
        && after.sections_completed_in_session >= SPEED_DEMON_SECTIONS
    {
        out.push(Achievement::SpeedDemon);
    }

    out
}

/// Fraction of the catalog unlocked, for profile display.
pub fn unlocked_ratio(record: &ProgressRecord) -> f64 {
    record.unlocked_achievements.len() as f64 / Achievement::ALL.len() as f64
}
