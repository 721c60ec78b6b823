//! ReviewStore owns the collection of review items.
//!
//! All mutation goes through the store. Each mutation works on a copy of the
//! collection, writes that copy through the repository and only then publishes
//! it, so a failed write leaves the in-memory state untouched. Mutations are
//! serialized on the repository lock; readers take a read lock on the published
//! collection and always see a whole snapshot.

use crate::clock::Clock;
use crate::config::CorruptDataPolicy;
use crate::error::{PersistenceError, StoreError};
use crate::models::sm2::calculate_next_review;
use crate::models::{Grade, ItemId, ReviewItem, ReviewStats};
use crate::repository::{ItemRepository, MemoryRepository};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard};
use tracing::{debug, error, info, warn};

pub use crate::error::Result;

/// How the collection was obtained when the store was opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Nothing had been stored yet.
    Fresh,
    Loaded { count: usize },
    /// The stored copy could not be decoded and the store started empty.
    Recovered { reason: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub added: usize,
    pub skipped: usize,
}

pub struct ReviewStore {
    items: RwLock<Vec<ReviewItem>>,
    repository: Mutex<Box<dyn ItemRepository>>,
    clock: Arc<dyn Clock>,
    load_outcome: LoadOutcome,
}

fn require_text(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(StoreError::EmptyField { field });
    }
    Ok(())
}

/// Rejects loaded collections that break item invariants.
fn check_integrity(items: &[ReviewItem]) -> std::result::Result<(), PersistenceError> {
    let mut ids = HashSet::new();
    let mut pairs = HashSet::new();
    for item in items {
        if !ids.insert(item.id) {
            return Err(PersistenceError::Corrupt(format!("duplicate id {}", item.id)));
        }
        if !pairs.insert((item.front.as_str(), item.back.as_str())) {
            return Err(PersistenceError::Corrupt(format!(
                "duplicate front/back pair on item {}",
                item.id
            )));
        }
        if !item.is_consistent() {
            return Err(PersistenceError::Corrupt(format!(
                "inconsistent scheduling state on item {}",
                item.id
            )));
        }
    }
    Ok(())
}

impl ReviewStore {
    /// Loads the collection from `repository`.
    ///
    /// A missing collection starts empty. A collection that cannot be decoded
    /// follows `policy`. Read failures other than decoding are always returned.
    pub fn open<R>(mut repository: R, clock: Arc<dyn Clock>, policy: CorruptDataPolicy) -> Result<Self>
    where
        R: ItemRepository + 'static,
    {
        let location = repository.describe();
        let loaded = repository.load().and_then(|items| {
            if let Some(items) = &items {
                check_integrity(items)?;
            }
            Ok(items)
        });

        let (items, load_outcome) = match loaded {
            Ok(None) => {
                info!(location = %location, "No stored review items, starting fresh");
                (Vec::new(), LoadOutcome::Fresh)
            }
            Ok(Some(items)) => {
                let count = items.len();
                info!(location = %location, count, "Loaded review items");
                (items, LoadOutcome::Loaded { count })
            }
            Err(PersistenceError::Io(e)) => {
                error!(location = %location, error = %e, "Could not read review items");
                return Err(StoreError::PersistenceDecode(PersistenceError::Io(e)));
            }
            Err(e) => match policy {
                CorruptDataPolicy::Fail => {
                    error!(location = %location, error = %e, "Stored review items are unreadable");
                    return Err(StoreError::PersistenceDecode(e));
                }
                CorruptDataPolicy::StartEmpty => {
                    warn!(
                        location = %location,
                        error = %e,
                        "Stored review items are unreadable, starting with an empty collection"
                    );
                    (
                        Vec::new(),
                        LoadOutcome::Recovered {
                            reason: e.to_string(),
                        },
                    )
                }
            },
        };

        Ok(Self {
            items: RwLock::new(items),
            repository: Mutex::new(Box::new(repository)),
            clock,
            load_outcome,
        })
    }

    /// Empty store over a repository that replaced an unreadable one.
    pub(crate) fn recovered<R>(repository: R, clock: Arc<dyn Clock>, reason: String) -> Self
    where
        R: ItemRepository + 'static,
    {
        Self {
            items: RwLock::new(Vec::new()),
            repository: Mutex::new(Box::new(repository)),
            clock,
            load_outcome: LoadOutcome::Recovered { reason },
        }
    }

    /// Store backed by a fresh [`MemoryRepository`].
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self {
            items: RwLock::new(Vec::new()),
            repository: Mutex::new(Box::new(MemoryRepository::new())),
            clock,
            load_outcome: LoadOutcome::Fresh,
        }
    }

    pub fn load_outcome(&self) -> &LoadOutcome {
        &self.load_outcome
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    // Writers replace the whole vector only after a successful save, so a
    // poisoned lock still guards a consistent collection.
    fn read(&self) -> RwLockReadGuard<'_, Vec<ReviewItem>> {
        self.items.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `op` on a copy of the collection. When `op` reports a change the
    /// copy is saved and then published; otherwise nothing is written.
    fn transact<T>(&self, op: impl FnOnce(&mut Vec<ReviewItem>) -> Result<(T, bool)>) -> Result<T> {
        let mut repository = self.repository.lock().unwrap_or_else(PoisonError::into_inner);
        let mut candidate = self.read().clone();

        let (value, changed) = op(&mut candidate)?;
        if !changed {
            return Ok(value);
        }

        if let Err(e) = repository.save(&candidate) {
            error!(location = %repository.describe(), error = %e, "Failed to save review items");
            return Err(StoreError::PersistenceWrite(e));
        }
        *self.items.write().unwrap_or_else(PoisonError::into_inner) = candidate;
        Ok(value)
    }

    /// Saves a `(front, back)` pair and returns its id.
    ///
    /// An item with exactly the same pair keeps its id and scheduling state.
    /// Otherwise a new item is appended, due immediately.
    pub fn add_or_update(&self, front: impl Into<String>, back: impl Into<String>) -> Result<ItemId> {
        let front = front.into();
        let back = back.into();
        require_text("front", &front)?;
        require_text("back", &back)?;
        let now = self.clock.now();

        self.transact(|items| {
            // An exact match already carries this text, so there is nothing to write.
            if let Some(existing) = items.iter().find(|item| item.matches(&front, &back)) {
                debug!(id = %existing.id, "Pair already stored");
                return Ok((existing.id, false));
            }

            let item = ReviewItem::new(front, back, now);
            let id = item.id;
            items.push(item);
            debug!(id = %id, "Added review item");
            Ok((id, true))
        })
    }

    /// Adds the given pairs only when the collection is empty. Returns how many
    /// items were added.
    pub fn seed_if_empty(&self, pairs: &[(&str, &str)]) -> Result<usize> {
        for (front, back) in pairs {
            require_text("front", front)?;
            require_text("back", back)?;
        }
        let now = self.clock.now();

        self.transact(|items| {
            if !items.is_empty() {
                return Ok((0, false));
            }
            for (front, back) in pairs {
                if !items.iter().any(|item| item.matches(front, back)) {
                    items.push(ReviewItem::new(*front, *back, now));
                }
            }
            info!(count = items.len(), "Seeded starter items");
            Ok((items.len(), !items.is_empty()))
        })
    }

    /// Rewrites an item's text without touching its scheduling state.
    pub fn update_content(
        &self,
        id: ItemId,
        front: impl Into<String>,
        back: impl Into<String>,
    ) -> Result<ReviewItem> {
        let front = front.into();
        let back = back.into();
        require_text("front", &front)?;
        require_text("back", &back)?;

        self.transact(|items| {
            if let Some(other) = items
                .iter()
                .find(|item| item.id != id && item.matches(&front, &back))
            {
                return Err(StoreError::DuplicateContent(other.id));
            }

            let item = items
                .iter_mut()
                .find(|item| item.id == id)
                .ok_or(StoreError::ItemNotFound(id))?;
            if item.matches(&front, &back) {
                return Ok((item.clone(), false));
            }

            item.front = front;
            item.back = back;
            debug!(id = %id, "Updated review item text");
            Ok((item.clone(), true))
        })
    }

    /// Deletes the item if present. Unknown ids are ignored.
    pub fn remove(&self, id: ItemId) -> Result<()> {
        self.transact(|items| match items.iter().position(|item| item.id == id) {
            Some(index) => {
                items.remove(index);
                debug!(id = %id, "Removed review item");
                Ok(((), true))
            }
            None => Ok(((), false)),
        })
    }

    pub fn remove_all(&self) -> Result<()> {
        self.transact(|items| {
            debug!(count = items.len(), "Removing all review items");
            items.clear();
            Ok(((), true))
        })
    }

    /// Items due by the end of the local day containing `now`, oldest due date
    /// first. Equal due dates keep insertion order.
    pub fn items_due(&self, now: DateTime<Utc>) -> Vec<ReviewItem> {
        let end_of_day = self.clock.end_of_day(now);
        let mut due: Vec<ReviewItem> = self
            .read()
            .iter()
            .filter(|item| item.is_due(end_of_day))
            .cloned()
            .collect();
        due.sort_by_key(|item| item.due_date);
        due
    }

    pub fn due_today(&self) -> Vec<ReviewItem> {
        self.items_due(self.clock.now())
    }

    /// Applies the grading transition to one item, persists it and returns the
    /// new state.
    pub fn record_grade(&self, id: ItemId, grade: Grade, now: DateTime<Utc>) -> Result<ReviewItem> {
        self.transact(|items| {
            let item = items
                .iter_mut()
                .find(|item| item.id == id)
                .ok_or(StoreError::ItemNotFound(id))?;
            *item = calculate_next_review(item, grade, now);
            debug!(
                id = %id,
                grade = %grade,
                interval_days = item.interval_days,
                ease = item.ease,
                "Recorded grade"
            );
            Ok((item.clone(), true))
        })
    }

    /// Adds items from another collection, keeping their scheduling state.
    ///
    /// Items whose id or `(front, back)` pair is already present are skipped,
    /// as are items that fail [`ReviewItem::is_consistent`].
    pub fn merge(&self, incoming: impl IntoIterator<Item = ReviewItem>) -> Result<MergeReport> {
        self.transact(|items| {
            let mut report = MergeReport::default();
            for item in incoming {
                let clash = items
                    .iter()
                    .any(|existing| existing.id == item.id || existing.matches(&item.front, &item.back));
                if item.is_consistent() && !clash {
                    items.push(item);
                    report.added += 1;
                } else {
                    report.skipped += 1;
                }
            }
            info!(added = report.added, skipped = report.skipped, "Merged review items");
            let changed = report.added > 0;
            Ok((report, changed))
        })
    }

    /// Snapshot of the whole collection in insertion order.
    pub fn items(&self) -> Vec<ReviewItem> {
        self.read().clone()
    }

    pub fn get(&self, id: ItemId) -> Option<ReviewItem> {
        self.read().iter().find(|item| item.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn stats(&self, now: DateTime<Utc>) -> ReviewStats {
        let end_of_day = self.clock.end_of_day(now);
        ReviewStats::collect(self.read().iter(), end_of_day)
    }
}
