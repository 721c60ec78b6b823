//! Error types for the review store and its persistence backends.

use crate::models::ItemId;
use thiserror::Error;

/// Failure reading or writing the durable copy of the collection.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("Another item already has this front and back: {0}")]
    DuplicateContent(ItemId),

    #[error("Could not decode stored items: {0}")]
    PersistenceDecode(#[source] PersistenceError),

    #[error("Could not save items: {0}")]
    PersistenceWrite(#[source] PersistenceError),
}

pub type Result<T> = std::result::Result<T, StoreError>;
