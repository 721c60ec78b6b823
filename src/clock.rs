//! Time source for scheduling.
//!
//! The store never reads ambient system time directly. It asks a [`Clock`] for
//! "now" and for the end of the local calendar day, so due-date logic can be
//! driven by a fixed or simulated clock in tests.

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use std::sync::{Mutex, PoisonError};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Last instant of the local calendar day containing `at`.
    fn end_of_day(&self, at: DateTime<Utc>) -> DateTime<Utc>;
}

/// Returns the last representable instant before the next local midnight in `tz`.
pub fn end_of_day_in<Tz: TimeZone>(at: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    let local_date = at.with_timezone(tz).date_naive();
    match local_date.succ_opt().and_then(|next| start_of_day_in(next, tz)) {
        Some(next_start) => next_start - Duration::nanoseconds(1),
        None => DateTime::<Utc>::MAX_UTC,
    }
}

// Midnight can fall inside a DST gap; the day then starts at the first valid local time.
fn start_of_day_in<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Option<DateTime<Utc>> {
    let midnight = date.and_time(NaiveTime::MIN);
    (0..=2)
        .map(|hours| midnight + Duration::hours(hours))
        .find_map(|candidate| tz.from_local_datetime(&candidate).earliest())
        .map(|start| start.with_timezone(&Utc))
}

/// Wall clock in the host's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn end_of_day(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        end_of_day_in(at, &Local)
    }
}

/// Settable clock with a fixed UTC offset. Used for simulated days and tests.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
    offset: FixedOffset,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            now: Mutex::new(now),
            offset,
        }
    }

    pub fn utc(now: DateTime<Utc>) -> Self {
        Self::new(now, Utc.fix())
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    /// Moves the clock forward by whole days.
    pub fn advance_days(&self, days: i64) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += Duration::days(days);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn end_of_day(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        end_of_day_in(at, &self.offset)
    }
}
