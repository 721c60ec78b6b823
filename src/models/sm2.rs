//! Simplified SM-2 spaced repetition scheduling.
//!
//! The scheduling state of an item is the triple (ease, repetitions, interval):
//! - Again: repetitions reset to 0, review again tomorrow, ease drops by 0.2
//! - Hard: repetitions kept (at least 1), interval grows by 20%, ease drops by 0.15
//! - Good: 1 day → 3 days → interval multiplied by ease
//! - Easy: 4 days for the first two successes, then interval × (ease + 0.15), ease grows by 0.05
//! - Ease never falls below 1.3, so intervals always keep growing on success

use super::review_item::{INITIAL_EASE, MIN_EASE, ReviewItem};
use super::Grade;
use chrono::{DateTime, Duration, Utc};

/// Upper bound for a single interval (100 years).
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

const HARD_INTERVAL_FACTOR: f64 = 1.2;
const AGAIN_EASE_PENALTY: f64 = 0.2;
const HARD_EASE_PENALTY: f64 = 0.15;
const EASY_INTERVAL_BONUS: f64 = 0.15;
const EASY_EASE_BONUS: f64 = 0.05;
const EASY_EARLY_INTERVAL: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulingState {
    pub ease: f64,
    pub repetitions: u32,
    pub interval_days: u32,
}

impl SchedulingState {
    /// State of a never-reviewed item.
    pub fn initial() -> Self {
        Self {
            ease: INITIAL_EASE,
            repetitions: 0,
            interval_days: 0,
        }
    }

    pub fn of(item: &ReviewItem) -> Self {
        Self {
            ease: item.ease,
            repetitions: item.repetitions,
            interval_days: item.interval_days,
        }
    }
}

impl Default for SchedulingState {
    fn default() -> Self {
        Self::initial()
    }
}

/// Multiplies an interval, rounds half away from zero and keeps it in `1..=MAX_INTERVAL_DAYS`.
fn scaled(interval_days: u32, factor: f64) -> u32 {
    let days = (interval_days as f64 * factor).round();
    days.clamp(1.0, MAX_INTERVAL_DAYS as f64) as u32
}

fn floor_ease(ease: f64) -> f64 {
    ease.max(MIN_EASE)
}

/// Computes the scheduling state after one grade. Pure: no clock, no randomness.
pub fn next_state(state: SchedulingState, grade: Grade) -> SchedulingState {
    let SchedulingState {
        ease,
        repetitions,
        interval_days,
    } = state;

    match grade {
        Grade::Again => SchedulingState {
            ease: floor_ease(ease - AGAIN_EASE_PENALTY),
            repetitions: 0,
            interval_days: 1,
        },
        Grade::Hard => SchedulingState {
            ease: floor_ease(ease - HARD_EASE_PENALTY),
            repetitions: repetitions.max(1),
            interval_days: scaled(interval_days.max(1), HARD_INTERVAL_FACTOR),
        },
        Grade::Good => {
            let repetitions = repetitions.saturating_add(1);
            let interval_days = match repetitions {
                1 => 1,
                2 => 3,
                _ => scaled(interval_days, ease),
            };
            SchedulingState {
                ease: floor_ease(ease),
                repetitions,
                interval_days,
            }
        }
        Grade::Easy => {
            let repetitions = repetitions.saturating_add(1);
            let interval_days = if repetitions <= 2 {
                EASY_EARLY_INTERVAL
            } else {
                scaled(interval_days, ease + EASY_INTERVAL_BONUS)
            };
            SchedulingState {
                ease: floor_ease(ease + EASY_EASE_BONUS),
                repetitions,
                interval_days,
            }
        }
    }
}

/// Returns the item as it looks after being graded at `now`.
///
/// `due_date` is `now + interval_days` days and `last_reviewed` is `now`, so the
/// new due date is never earlier than the review that produced it.
pub fn calculate_next_review(item: &ReviewItem, grade: Grade, now: DateTime<Utc>) -> ReviewItem {
    let next = next_state(SchedulingState::of(item), grade);
    let due_date = now
        .checked_add_signed(Duration::days(i64::from(next.interval_days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    ReviewItem {
        ease: next.ease,
        repetitions: next.repetitions,
        interval_days: next.interval_days,
        due_date,
        last_reviewed: Some(now),
        ..item.clone()
    }
}

/// Intervals each grade would produce, in the order Again, Hard, Good, Easy.
pub fn preview_intervals(item: &ReviewItem) -> [u32; 4] {
    let state = SchedulingState::of(item);
    Grade::ALL.map(|grade| next_state(state, grade).interval_days)
}

/// Formats an interval in days as a short human-readable string.
pub fn format_interval(days: u32) -> String {
    match days {
        0 => "now".to_string(),
        1..=6 => format!("{}d", days),
        7..=29 => format!("{}w", days / 7),
        30..=364 => format!("{}mo", days / 30),
        _ => format!("{}y", days / 365),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap()
    }

    fn state(ease: f64, repetitions: u32, interval_days: u32) -> SchedulingState {
        SchedulingState {
            ease,
            repetitions,
            interval_days,
        }
    }

    #[test]
    fn test_good_progression_from_new() {
        let first = next_state(SchedulingState::initial(), Grade::Good);
        assert_eq!(first.interval_days, 1);
        assert_eq!(first.repetitions, 1);

        let second = next_state(first, Grade::Good);
        assert_eq!(second.interval_days, 3);
        assert_eq!(second.repetitions, 2);

        // round(3 * 2.5) = round(7.5) = 8
        let third = next_state(second, Grade::Good);
        assert_eq!(third.interval_days, 8);
        assert_eq!(third.repetitions, 3);
        assert_eq!(third.ease, 2.5);
    }

    #[test]
    fn test_again_resets_progress() {
        for prior in [state(2.5, 0, 0), state(2.1, 7, 120), state(1.3, 1, 1)] {
            let next = next_state(prior, Grade::Again);
            assert_eq!(next.repetitions, 0);
            assert_eq!(next.interval_days, 1);
        }

        let next = next_state(state(2.5, 5, 30), Grade::Again);
        assert!((next.ease - 2.3).abs() < 1e-9);
    }

    #[test]
    fn test_hard_on_new_item() {
        let next = next_state(SchedulingState::initial(), Grade::Hard);
        assert_eq!(next.repetitions, 1);
        // max(1, round(max(1, 0) * 1.2)) = 1
        assert_eq!(next.interval_days, 1);
        assert!((next.ease - 2.35).abs() < 1e-9);
    }

    #[test]
    fn test_hard_keeps_repetitions() {
        let next = next_state(state(2.5, 4, 10), Grade::Hard);
        assert_eq!(next.repetitions, 4);
        assert_eq!(next.interval_days, 12);
    }

    #[test]
    fn test_easy_early_and_late() {
        let first = next_state(SchedulingState::initial(), Grade::Easy);
        assert_eq!(first.interval_days, 4);
        assert_eq!(first.repetitions, 1);
        assert!((first.ease - 2.55).abs() < 1e-9);

        let second = next_state(first, Grade::Easy);
        assert_eq!(second.interval_days, 4);

        // round(4 * (2.6 + 0.15)) = 11
        let third = next_state(second, Grade::Easy);
        assert_eq!(third.interval_days, 11);
        assert!((third.ease - 2.65).abs() < 1e-9);
    }

    #[test]
    fn test_ease_floor() {
        let next = next_state(state(1.3, 3, 5), Grade::Again);
        assert_eq!(next.ease, MIN_EASE);

        let next = next_state(state(1.35, 3, 5), Grade::Hard);
        assert_eq!(next.ease, MIN_EASE);
    }

    #[test]
    fn test_ease_floor_holds_for_every_sequence() {
        // All 4^6 grade sequences of length six.
        for code in 0..4usize.pow(6) {
            let mut current = SchedulingState::initial();
            let mut rest = code;
            for _ in 0..6 {
                let grade = Grade::ALL[rest % 4];
                rest /= 4;
                current = next_state(current, grade);
                assert!(current.ease >= MIN_EASE);
                assert!(current.interval_days >= 1);
                assert_eq!(current.repetitions == 0, grade == Grade::Again);
            }
        }
    }

    #[test]
    fn test_interval_is_capped() {
        let next = next_state(state(2.5, 10, MAX_INTERVAL_DAYS), Grade::Good);
        assert_eq!(next.interval_days, MAX_INTERVAL_DAYS);
    }

    #[test]
    fn test_calculate_next_review_sets_dates() {
        let item = ReviewItem::new("кот", "cat", now());
        for grade in Grade::ALL {
            let next = calculate_next_review(&item, grade, now());
            assert_eq!(next.id, item.id);
            assert_eq!(next.last_reviewed, Some(now()));
            assert!(next.due_date >= now());
            assert_eq!(
                next.due_date,
                now() + Duration::days(i64::from(next.interval_days))
            );
            assert_eq!(next.front, item.front);
            assert_eq!(next.created_at, item.created_at);
        }
    }

    #[test]
    fn test_preview_intervals() {
        let item = ReviewItem::new("кот", "cat", now());
        assert_eq!(preview_intervals(&item), [1, 1, 1, 4]);
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(0), "now");
        assert_eq!(format_interval(1), "1d");
        assert_eq!(format_interval(5), "5d");
        assert_eq!(format_interval(7), "1w");
        assert_eq!(format_interval(14), "2w");
        assert_eq!(format_interval(30), "1mo");
        assert_eq!(format_interval(90), "3mo");
        assert_eq!(format_interval(365), "1y");
        assert_eq!(format_interval(730), "2y");
    }
}
