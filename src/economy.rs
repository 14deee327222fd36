use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};

use crate::achievements::{self, AchievementEvaluator};
use crate::clock::Clock;
use crate::error::Result;
use crate::models::{Achievement, ProgressRecord, MAX_HEARTS};
use crate::store::ProgressStore;

/// One heart regenerates per elapsed interval of this length.
pub const HEART_REGEN_MS: i64 = 60_000;

/// Adds XP and levels up by repeated subtraction of `level * 500`.
/// Returns the number of levels gained.
pub fn apply_xp(record: &mut ProgressRecord, amount: u32) -> u32 {
    record.current_level = record.current_level.max(1);
    record.total_xp = record.total_xp.saturating_add(amount);

    let mut gained = 0;
    while record.total_xp >= record.xp_for_next_level() {
        record.total_xp -= record.xp_for_next_level();
        record.current_level += 1;
        gained += 1;
    }
    gained
}

pub fn next_streak(streak: u32, last_played: Option<NaiveDate>, today: NaiveDate) -> u32 {
    let Some(last_played) = last_played else {
        return 1;
    };

    match (today - last_played).num_days() {
        // Same day, or the clock went backwards
        days if days <= 0 => streak,
        1 => streak + 1,
        _ => 1,
    }
}

/// Applies heart regeneration as of `now`. Returns whether the record changed.
pub fn regenerate_hearts(record: &mut ProgressRecord, now: DateTime<Utc>) -> bool {
    // Bootstrap: a record that has never had a refill timer starts full
    if record.hearts == 0 && record.last_heart_refill_time.is_none() {
        record.hearts = MAX_HEARTS;
        record.last_heart_refill_time = Some(now);
        return true;
    }

    let Some(last_refill) = record.last_heart_refill_time else {
        record.last_heart_refill_time = Some(now);
        return true;
    };

    let elapsed_ms = (now - last_refill).num_milliseconds().max(0);
    let whole_intervals = elapsed_ms / HEART_REGEN_MS;

    if whole_intervals == 0 || record.hearts >= MAX_HEARTS {
        return false;
    }

    let missing = MAX_HEARTS - record.hearts;
    record.hearts += u32::try_from(whole_intervals).map_or(missing, |n| n.min(missing));
    // Advance by whole intervals only, keeping partial progress toward the next heart
    record.last_heart_refill_time =
        Some(last_refill + chrono::Duration::milliseconds(whole_intervals * HEART_REGEN_MS));
    true
}

/// Time until the next heart regenerates, or `None` when full or no timer runs.
pub fn time_until_next_heart(
    now: DateTime<Utc>,
    last_refill: Option<DateTime<Utc>>,
    hearts: u32,
) -> Option<Duration> {
    if hearts >= MAX_HEARTS {
        return None;
    }
    let last_refill = last_refill?;

    let into_interval = (now - last_refill)
        .num_milliseconds()
        .rem_euclid(HEART_REGEN_MS);
    let remaining = HEART_REGEN_MS - into_interval;

    (remaining > 0).then(|| Duration::from_millis(remaining as u64))
}

/// The progress/economy rules engine.
///
/// Every operation loads the record fresh from the store, mutates it, persists
/// it, runs the achievement evaluator and notifies subscribers. No in-memory
/// copy is trusted across calls.
pub struct Economy {
    store: ProgressStore,
    clock: Rc<dyn Clock>,
    evaluator: AchievementEvaluator,
    subscribers: Vec<Sender<ProgressRecord>>,
}

impl Economy {
    pub fn new(store: ProgressStore, clock: Rc<dyn Clock>, evaluator: AchievementEvaluator) -> Self {
        Self {
            store,
            clock,
            evaluator,
            subscribers: Vec::new(),
        }
    }

    /// Receives a snapshot of the record after every successful mutation.
    pub fn subscribe(&mut self) -> Receiver<ProgressRecord> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Current record with heart regeneration applied.
    pub fn record(&mut self) -> ProgressRecord {
        let mut record = self.store.load();
        let before = record.clone();
        if regenerate_hearts(&mut record, self.clock.now()) {
            self.commit(&before, &mut record);
        }
        record
    }

    pub fn add_xp(&mut self, amount: u32) -> Vec<Achievement> {
        self.mutate(|record| {
            let gained = apply_xp(record, amount);
            if gained > 0 {
                log::info!("level up: now level {}", record.current_level);
            }
        })
    }

    pub fn add_score(&mut self, amount: u32) -> Vec<Achievement> {
        self.mutate(|record| {
            record.total_score = record.total_score.saturating_add(amount);
        })
    }

    pub fn complete_section(&mut self, song_id: &str, section_id: &str, stars: u32) -> Vec<Achievement> {
        self.mutate(|record| {
            record
                .completed_sections
                .entry(song_id.to_string())
                .or_default()
                .insert(section_id.to_string());
            record.sections_completed_in_session += 1;
            if stars == 3 {
                record.perfect_sections += 1;
            }
        })
    }

    pub fn update_streak(&mut self) -> Vec<Achievement> {
        let now = self.clock.now();
        let today = self.clock.date_of(now);
        let clock = Rc::clone(&self.clock);

        self.mutate(|record| {
            let last_played = record.last_play_date.map(|at| clock.date_of(at));
            record.streak = next_streak(record.streak, last_played, today);
            record.last_play_date = Some(now);
        })
    }

    /// Hearts available now, regenerating first.
    pub fn hearts(&mut self) -> u32 {
        self.record().hearts
    }

    /// Spends one heart. Returns `false`, changing nothing, when none are left.
    pub fn use_heart(&mut self) -> bool {
        let now = self.clock.now();
        let mut used = false;

        self.mutate(|record| {
            if record.hearts > 0 {
                record.hearts -= 1;
                record.last_heart_refill_time.get_or_insert(now);
                used = true;
            }
        });
        used
    }

    pub fn time_until_next_heart(&self) -> Option<Duration> {
        let record = self.store.load();
        time_until_next_heart(self.clock.now(), record.last_heart_refill_time, record.hearts)
    }

    pub fn begin_session(&mut self) {
        self.mutate(|record| record.sections_completed_in_session = 0);
    }

    /// Unlocks an achievement outside the generic scan. Returns `true` when it
    /// was not unlocked before.
    pub fn unlock(&mut self, achievement: Achievement) -> bool {
        let mut fresh = false;
        self.mutate(|record| {
            fresh = record.unlocked_achievements.insert(achievement);
        });
        if fresh {
            log::info!("achievement unlocked: {}", achievement.title());
        }
        fresh
    }

    pub fn reset(&mut self) -> Result<bool> {
        let removed = self.store.clear()?;
        self.notify(&ProgressRecord::default());
        Ok(removed)
    }

    fn mutate<F>(&mut self, apply: F) -> Vec<Achievement>
    where
        F: FnOnce(&mut ProgressRecord),
    {
        let mut record = self.store.load();
        let before = record.clone();
        apply(&mut record);
        self.commit(&before, &mut record)
    }

    fn commit(&mut self, before: &ProgressRecord, record: &mut ProgressRecord) -> Vec<Achievement> {
        let mut unlocked: Vec<Achievement> = achievements::crossed(before, record)
            .into_iter()
            .filter(|a| record.unlocked_achievements.insert(*a))
            .collect();
        self.store.save(record);

        let scanned = self.evaluator.evaluate(record);
        if !scanned.is_empty() {
            self.store.save(record);
            unlocked.extend(scanned);
        }

        for achievement in &unlocked {
            log::info!("achievement unlocked: {}", achievement.title());
        }
        self.notify(record);
        unlocked
    }

    fn notify(&mut self, record: &ProgressRecord) {
        self.subscribers
            .retain(|tx| tx.send(record.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap()
    }

    fn setup() -> (Economy, ManualClock, ProgressStore) {
        let clock = ManualClock::new(start());
        let store = ProgressStore::in_memory();
        let economy = Economy::new(
            store.clone(),
            Rc::new(clock.clone()),
            AchievementEvaluator::default(),
        );
        (economy, clock, store)
    }

    mod xp_tests {
        use super::*;

        #[test]
        fn below_threshold_keeps_level() {
            let mut record = ProgressRecord::default();
            assert_eq!(apply_xp(&mut record, 499), 0);
            assert_eq!(record.current_level, 1);
            assert_eq!(record.total_xp, 499);
        }

        #[test]
        fn exact_threshold_levels_up() {
            let mut record = ProgressRecord::default();
            assert_eq!(apply_xp(&mut record, 500), 1);
            assert_eq!(record.current_level, 2);
            assert_eq!(record.total_xp, 0);
        }

        #[test]
        fn large_amount_jumps_several_levels() {
            // 500 + 1000 + 1500 = 3000 to reach level 4
            let mut record = ProgressRecord::default();
            assert_eq!(apply_xp(&mut record, 3100), 3);
            assert_eq!(record.current_level, 4);
            assert_eq!(record.total_xp, 100);
        }

        #[test]
        fn conserves_xp_across_thresholds() {
            for amount in [0, 1, 150, 499, 500, 1499, 1500, 2999, 7777, 40_000] {
                let mut record = ProgressRecord::default();
                record.total_xp = 320;
                record.current_level = 2;
                let old_total = record.total_xp;
                let old_level = record.current_level;

                apply_xp(&mut record, amount);

                let spent: u32 = (old_level..record.current_level)
                    .map(|level| level * 500)
                    .sum();
                assert_eq!(record.total_xp + spent, old_total + amount);
                assert!(record.current_level >= old_level);
                assert!(record.total_xp < record.xp_for_next_level());
            }
        }

        #[test]
        fn repairs_zero_level() {
            let mut record = ProgressRecord::default();
            record.current_level = 0;
            apply_xp(&mut record, 10);
            assert_eq!(record.current_level, 1);
        }
    }

    mod streak_tests {
        use super::*;

        fn day(d: u32) -> NaiveDate {
            NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
        }

        #[test]
        fn first_play_starts_streak() {
            assert_eq!(next_streak(0, None, day(10)), 1);
        }

        #[test]
        fn same_day_keeps_streak() {
            assert_eq!(next_streak(4, Some(day(10)), day(10)), 4);
        }

        #[test]
        fn next_day_extends_streak() {
            assert_eq!(next_streak(4, Some(day(10)), day(11)), 5);
        }

        #[test]
        fn gap_resets_streak() {
            assert_eq!(next_streak(4, Some(day(10)), day(12)), 1);
        }

        #[test]
        fn clock_moving_backwards_keeps_streak() {
            assert_eq!(next_streak(4, Some(day(10)), day(8)), 4);
        }
    }

    mod regeneration_tests {
        use super::*;

        #[test]
        fn regenerates_whole_minutes_and_keeps_remainder() {
            let now = start();
            let mut record = ProgressRecord::default();
            record.hearts = 10;
            record.last_heart_refill_time = Some(now - chrono::Duration::seconds(185));

            assert!(regenerate_hearts(&mut record, now));

            assert_eq!(record.hearts, 13);
            assert_eq!(
                record.last_heart_refill_time,
                Some(now - chrono::Duration::seconds(5))
            );
        }

        #[test]
        fn caps_at_max() {
            let now = start();
            let mut record = ProgressRecord::default();
            record.hearts = 18;
            record.last_heart_refill_time = Some(now - chrono::Duration::minutes(30));

            regenerate_hearts(&mut record, now);

            assert_eq!(record.hearts, MAX_HEARTS);
        }

        #[test]
        fn full_hearts_do_not_advance_timer() {
            let now = start();
            let last = now - chrono::Duration::minutes(5);
            let mut record = ProgressRecord::default();
            record.last_heart_refill_time = Some(last);

            assert!(!regenerate_hearts(&mut record, now));
            assert_eq!(record.last_heart_refill_time, Some(last));
        }

        #[test]
        fn under_a_minute_changes_nothing() {
            let now = start();
            let mut record = ProgressRecord::default();
            record.hearts = 3;
            record.last_heart_refill_time = Some(now - chrono::Duration::seconds(59));

            assert!(!regenerate_hearts(&mut record, now));
            assert_eq!(record.hearts, 3);
        }

        #[test]
        fn bootstrap_fills_empty_record() {
            let now = start();
            let mut record = ProgressRecord::default();
            record.hearts = 0;

            assert!(regenerate_hearts(&mut record, now));
            assert_eq!(record.hearts, MAX_HEARTS);
            assert_eq!(record.last_heart_refill_time, Some(now));
        }

        #[test]
        fn starts_timer_when_missing() {
            let now = start();
            let mut record = ProgressRecord::default();

            assert!(regenerate_hearts(&mut record, now));
            assert_eq!(record.hearts, MAX_HEARTS);
            assert_eq!(record.last_heart_refill_time, Some(now));
        }
    }

    mod countdown_tests {
        use super::*;

        #[test]
        fn none_when_full() {
            let now = start();
            assert_eq!(time_until_next_heart(now, Some(now), MAX_HEARTS), None);
        }

        #[test]
        fn none_without_timer() {
            assert_eq!(time_until_next_heart(start(), None, 5), None);
        }

        #[test]
        fn counts_down_within_interval() {
            let now = start();
            let last = now - chrono::Duration::seconds(125);
            assert_eq!(
                time_until_next_heart(now, Some(last), 5),
                Some(Duration::from_secs(55))
            );
        }

        #[test]
        fn fresh_timer_waits_full_interval() {
            let now = start();
            assert_eq!(
                time_until_next_heart(now, Some(now), 5),
                Some(Duration::from_secs(60))
            );
        }
    }

    mod economy_tests {
        use super::*;

        #[test]
        fn add_xp_persists_and_levels() {
            let (mut economy, _clock, store) = setup();
            economy.add_xp(650);

            let record = store.load();
            assert_eq!(record.current_level, 2);
            assert_eq!(record.total_xp, 150);
        }

        #[test]
        fn add_xp_unlocks_level_achievements_on_crossing() {
            let (mut economy, _clock, store) = setup();
            // 500 + 1000 + 1500 + 2000 = 5000 to reach level 5
            let unlocked = economy.add_xp(5000);

            assert_eq!(unlocked, vec![Achievement::LevelUp]);
            assert!(store.load().has_achievement(Achievement::LevelUp));
        }

        #[test]
        fn star_collector_unlocks_exactly_at_crossing() {
            let (mut economy, _clock, store) = setup();
            for _ in 0..9 {
                assert!(economy.add_score(10).is_empty());
                assert!(!store.load().has_achievement(Achievement::StarCollector));
            }

            let unlocked = economy.add_score(10);

            assert_eq!(unlocked, vec![Achievement::StarCollector]);
            assert_eq!(store.load().total_score, 100);
            assert!(economy.add_score(10).is_empty());
        }

        #[test]
        fn complete_section_is_idempotent_for_membership() {
            let (mut economy, _clock, store) = setup();
            economy.complete_section("song", "verse-1", 2);
            economy.complete_section("song", "verse-1", 2);

            let record = store.load();
            assert_eq!(record.completed_count("song"), 1);
            assert_eq!(record.sections_completed_in_session, 2);
            assert_eq!(record.perfect_sections, 0);
        }

        #[test]
        fn complete_section_counts_perfect_runs() {
            let (mut economy, _clock, store) = setup();
            let unlocked = economy.complete_section("song", "verse-1", 3);

            let record = store.load();
            assert_eq!(record.perfect_sections, 1);
            assert!(unlocked.contains(&Achievement::PerfectSection));
            assert!(unlocked.contains(&Achievement::FirstSteps));
        }

        #[test]
        fn speed_demon_after_five_sections() {
            let (mut economy, _clock, store) = setup();
            for i in 0..4 {
                economy.complete_section("song", &format!("s{i}"), 1);
            }
            assert!(!store.load().has_achievement(Achievement::SpeedDemon));

            let unlocked = economy.complete_section("song", "s4", 1);
            assert!(unlocked.contains(&Achievement::SpeedDemon));
        }

        #[test]
        fn begin_session_resets_session_counter() {
            let (mut economy, _clock, store) = setup();
            economy.complete_section("song", "s1", 1);
            economy.begin_session();
            assert_eq!(store.load().sections_completed_in_session, 0);
            assert_eq!(store.load().completed_count("song"), 1);
        }

        #[test]
        fn streak_over_consecutive_days() {
            let (mut economy, clock, store) = setup();
            economy.update_streak();
            assert_eq!(store.load().streak, 1);

            for expected in 2..=4 {
                clock.advance(chrono::Duration::days(1));
                economy.update_streak();
                assert_eq!(store.load().streak, expected);
            }
        }

        #[test]
        fn streak_same_day_repeats_do_nothing() {
            let (mut economy, clock, store) = setup();
            economy.update_streak();
            clock.advance(chrono::Duration::hours(3));
            economy.update_streak();
            economy.update_streak();

            let record = store.load();
            assert_eq!(record.streak, 1);
            assert_eq!(record.last_play_date, Some(clock.now()));
        }

        #[test]
        fn streak_resets_after_two_day_gap() {
            let (mut economy, clock, store) = setup();
            economy.update_streak();
            clock.advance(chrono::Duration::days(1));
            economy.update_streak();
            assert_eq!(store.load().streak, 2);

            clock.advance(chrono::Duration::days(2));
            economy.update_streak();
            assert_eq!(store.load().streak, 1);
        }

        #[test]
        fn seven_day_streak_unlocks_on_fire() {
            let (mut economy, clock, store) = setup();
            for _ in 0..7 {
                economy.update_streak();
                clock.advance(chrono::Duration::days(1));
            }
            assert!(store.load().has_achievement(Achievement::OnFire));
        }

        #[test]
        fn twenty_hearts_then_failure() {
            let (mut economy, _clock, store) = setup();
            for _ in 0..MAX_HEARTS {
                assert!(economy.use_heart());
            }
            assert_eq!(store.load().hearts, 0);

            assert!(!economy.use_heart());
            assert_eq!(store.load().hearts, 0);
            assert!(store.load().has_achievement(Achievement::HeartBreaker));
        }

        #[test]
        fn use_heart_starts_refill_timer() {
            let (mut economy, clock, store) = setup();
            economy.use_heart();
            assert_eq!(store.load().last_heart_refill_time, Some(clock.now()));
        }

        #[test]
        fn hearts_regenerate_from_store() {
            let (mut economy, clock, store) = setup();
            let mut record = ProgressRecord::default();
            record.hearts = 10;
            record.last_heart_refill_time = Some(clock.now() - chrono::Duration::seconds(185));
            store.save(&record);

            assert_eq!(economy.hearts(), 13);
            assert_eq!(
                store.load().last_heart_refill_time,
                Some(clock.now() - chrono::Duration::seconds(5))
            );
            assert_eq!(economy.time_until_next_heart(), Some(Duration::from_secs(55)));
        }

        #[test]
        fn hearts_refill_over_time_after_running_out() {
            let (mut economy, clock, _store) = setup();
            for _ in 0..MAX_HEARTS {
                economy.use_heart();
            }
            assert_eq!(economy.hearts(), 0);

            clock.advance(chrono::Duration::seconds(61));
            assert_eq!(economy.hearts(), 1);
        }

        #[test]
        fn unlock_is_idempotent() {
            let (mut economy, _clock, store) = setup();
            assert!(economy.unlock(Achievement::Completionist));
            assert!(!economy.unlock(Achievement::Completionist));
            assert!(store.load().has_achievement(Achievement::Completionist));
        }

        #[test]
        fn reloads_record_written_elsewhere() {
            let (mut economy, _clock, store) = setup();
            economy.add_score(10);

            let mut external = store.load();
            external.total_score = 95;
            store.save(&external);

            let unlocked = economy.add_score(10);
            assert_eq!(store.load().total_score, 105);
            assert_eq!(unlocked, vec![Achievement::StarCollector]);
        }

        #[test]
        fn subscribers_receive_snapshots() {
            let (mut economy, _clock, _store) = setup();
            let rx = economy.subscribe();

            economy.add_score(30);
            economy.add_xp(20);

            let snapshots: Vec<ProgressRecord> = rx.try_iter().collect();
            assert_eq!(snapshots.len(), 2);
            assert_eq!(snapshots[0].total_score, 30);
            assert_eq!(snapshots[1].total_xp, 20);
        }

        #[test]
        fn dropped_subscribers_are_pruned() {
            let (mut economy, _clock, _store) = setup();
            drop(economy.subscribe());
            economy.add_score(1);
            assert!(economy.subscribers.is_empty());
        }

        #[test]
        fn reset_clears_progress() {
            let (mut economy, _clock, store) = setup();
            economy.add_score(40);
            assert!(economy.reset().unwrap());
            assert_eq!(store.load(), ProgressRecord::default());
        }
    }
}
