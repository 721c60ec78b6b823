//! Persistence backends for the review store.
//!
//! A repository loads the whole collection at startup and rewrites it wholesale
//! on every mutation. There is no incremental log.

pub mod json_file;

pub use json_file::JsonFileRepository;

use crate::error::PersistenceError;
use crate::models::ReviewItem;
use std::sync::{Arc, Mutex, PoisonError};

pub trait ItemRepository: Send {
    /// Loads the stored collection, or `None` if nothing was ever saved.
    fn load(&mut self) -> Result<Option<Vec<ReviewItem>>, PersistenceError>;

    /// Replaces the stored collection with `items`.
    fn save(&mut self, items: &[ReviewItem]) -> Result<(), PersistenceError>;

    /// Short human-readable location, used in log messages.
    fn describe(&self) -> String;
}

/// Keeps the collection in memory. Clones share the same storage, so a handle
/// kept outside the store observes every save.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    saved: Arc<Mutex<Option<Vec<ReviewItem>>>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<ReviewItem>) -> Self {
        Self {
            saved: Arc::new(Mutex::new(Some(items))),
        }
    }

    /// Last saved collection.
    pub fn snapshot(&self) -> Option<Vec<ReviewItem>> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ItemRepository for MemoryRepository {
    fn load(&mut self) -> Result<Option<Vec<ReviewItem>>, PersistenceError> {
        Ok(self.snapshot())
    }

    fn save(&mut self, items: &[ReviewItem]) -> Result<(), PersistenceError> {
        *self.saved.lock().unwrap_or_else(PoisonError::into_inner) = Some(items.to_vec());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
