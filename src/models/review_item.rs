//! ReviewItem is a <front, back> pair together with its spaced repetition state.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use uuid::Uuid;

/// Ease assigned to every new item.
pub const INITIAL_EASE: f64 = 2.5;

/// Ease never drops below this value.
pub const MIN_EASE: f64 = 1.3;

/// Opaque, stable identifier of a review item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ItemId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// One flashcard under spaced repetition.
///
/// Two items are equal when their ids are equal; text and scheduling fields
/// are content, not identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItem {
    pub id: ItemId,
    pub front: String,
    pub back: String,
    pub ease: f64,
    pub interval_days: u32,
    pub repetitions: u32,
    pub due_date: DateTime<Utc>,
    pub last_reviewed: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ReviewItem {
    /// Creates an item that is due immediately.
    pub fn new(front: impl Into<String>, back: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: ItemId::new(),
            front: front.into(),
            back: back.into(),
            ease: INITIAL_EASE,
            interval_days: 0,
            repetitions: 0,
            due_date: now,
            last_reviewed: None,
            created_at: now,
        }
    }

    /// True until the first grade is recorded.
    pub fn is_new(&self) -> bool {
        self.last_reviewed.is_none()
    }

    pub fn is_due(&self, end_of_day: DateTime<Utc>) -> bool {
        self.due_date <= end_of_day
    }

    pub fn matches(&self, front: &str, back: &str) -> bool {
        self.front == front && self.back == back
    }

    /// Checks the invariants every stored item must satisfy: non-empty text,
    /// ease at or above the floor, a positive interval once reviewed
    /// successfully, and a due date no earlier than the last review.
    pub fn is_consistent(&self) -> bool {
        let has_text = !self.front.trim().is_empty() && !self.back.trim().is_empty();
        let ease_ok = self.ease.is_finite() && self.ease >= MIN_EASE;
        let interval_ok = self.repetitions == 0 || self.interval_days >= 1;
        let due_ok = self
            .last_reviewed
            .is_none_or(|reviewed| self.due_date >= reviewed);
        has_text && ease_ok && interval_ok && due_ok
    }
}

impl PartialEq for ReviewItem {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ReviewItem {}

impl Hash for ReviewItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_item_creation_defaults() {
        let item = ReviewItem::new("кот", "cat", now());

        assert_eq!(item.front, "кот");
        assert_eq!(item.back, "cat");
        assert_eq!(item.ease, INITIAL_EASE);
        assert_eq!(item.interval_days, 0);
        assert_eq!(item.repetitions, 0);
        assert_eq!(item.due_date, now());
        assert_eq!(item.created_at, now());
        assert!(item.last_reviewed.is_none());
        assert!(item.is_new());
    }

    #[test]
    fn test_equality_is_by_id() {
        let a = ReviewItem::new("кот", "cat", now());
        let mut b = a.clone();
        b.front = "собака".to_string();
        b.ease = 1.3;
        assert_eq!(a, b);

        let c = ReviewItem::new("кот", "cat", now());
        assert_ne!(a, c);
    }

    #[test]
    fn test_serialized_field_names() {
        let item = ReviewItem::new("кот", "cat", now());
        let value = serde_json::to_value(&item).unwrap();

        for key in [
            "id",
            "front",
            "back",
            "ease",
            "intervalDays",
            "repetitions",
            "dueDate",
            "lastReviewed",
            "createdAt",
        ] {
            assert!(value.get(key).is_some(), "missing field {}", key);
        }
        assert!(value["lastReviewed"].is_null());
    }

    #[test]
    fn test_consistency_rules() {
        let fresh = ReviewItem::new("кот", "cat", now());
        assert!(fresh.is_consistent());

        let mut blank = fresh.clone();
        blank.back = "  ".to_string();
        assert!(!blank.is_consistent());

        let mut low_ease = fresh.clone();
        low_ease.ease = 1.0;
        assert!(!low_ease.is_consistent());

        let mut zero_interval = fresh.clone();
        zero_interval.repetitions = 3;
        zero_interval.interval_days = 0;
        assert!(!zero_interval.is_consistent());

        let mut due_before_review = fresh.clone();
        due_before_review.repetitions = 1;
        due_before_review.interval_days = 1;
        due_before_review.last_reviewed = Some(now());
        due_before_review.due_date = now() - chrono::Duration::days(5);
        assert!(!due_before_review.is_consistent());

        due_before_review.due_date = now() + chrono::Duration::days(1);
        assert!(due_before_review.is_consistent());
    }

    #[test]
    fn test_item_id_parse() {
        let id = ItemId::new();
        let parsed: ItemId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<ItemId>().is_err());
    }
}
