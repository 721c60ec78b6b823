//! Summary counts over a collection of review items.
use super::ReviewItem;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Items with an interval at least this long count as mature.
pub const MATURE_INTERVAL_DAYS: u32 = 21;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReviewStats {
    pub total: usize,
    pub due: usize,
    pub new: usize,
    pub learning: usize,
    pub mature: usize,
}

impl ReviewStats {
    /// `end_of_day` is the cut-off used for the due count.
    pub fn collect<'a>(
        items: impl IntoIterator<Item = &'a ReviewItem>,
        end_of_day: DateTime<Utc>,
    ) -> Self {
        let mut stats = Self::default();
        for item in items {
            stats.total += 1;
            if item.is_due(end_of_day) {
                stats.due += 1;
            }
            if item.is_new() {
                stats.new += 1;
            } else if item.interval_days >= MATURE_INTERVAL_DAYS {
                stats.mature += 1;
            } else {
                stats.learning += 1;
            }
        }
        stats
    }
}
