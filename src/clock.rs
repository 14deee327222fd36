#[cfg(test)]
use std::cell::Cell;
#[cfg(test)]
use std::rc::Rc;

use chrono::{DateTime, Local, NaiveDate, Utc};

/// Source of "now" for everything time-dependent (hearts, streaks, playback).
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar day a timestamp falls on, for streak bookkeeping.
    fn date_of(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&Local).date_naive()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven clock. Clones share the same instant, so a test can keep one
/// handle and move time forward under a collaborator that owns another.
/// Calendar days are taken in UTC to keep results independent of the host.
#[cfg(test)]
#[derive(Clone)]
pub struct ManualClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.now.set(self.now.get() + by);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }

    fn date_of(&self, at: DateTime<Utc>) -> NaiveDate {
        at.date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap());
        let handle = clock.clone();

        handle.advance(Duration::seconds(90));

        assert_eq!(
            clock.now(),
            Utc.with_ymd_and_hms(2025, 3, 1, 12, 1, 30).unwrap()
        );
    }

    #[test]
    fn manual_clock_uses_utc_days() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 1, 23, 59, 59).unwrap());
        assert_eq!(clock.date_of(clock.now()), NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());

        clock.advance(Duration::seconds(1));
        assert_eq!(clock.date_of(clock.now()), NaiveDate::from_ymd_opt(2025, 3, 2).unwrap());
    }
}
