//! Store configuration: where items live, which backend holds them, and what
//! happens when the stored copy cannot be decoded.

use crate::clock::Clock;
use crate::database::{SqliteRepository, is_unreadable_database, move_aside};
use crate::error::{Result, StoreError};
use crate::repository::JsonFileRepository;
use crate::store::ReviewStore;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Json,
    Sqlite,
}

impl Backend {
    pub fn file_name(&self) -> &'static str {
        match self {
            Backend::Json => "items.json",
            Backend::Sqlite => "items.sqlite3",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Json => f.write_str("json"),
            Backend::Sqlite => f.write_str("sqlite"),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Backend::Json),
            "sqlite" | "sqlite3" => Ok(Backend::Sqlite),
            other => Err(format!("Unknown backend '{}', expected json or sqlite", other)),
        }
    }
}

/// What to do when the stored collection exists but cannot be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptDataPolicy {
    /// Log a warning and start from an empty collection. The next save
    /// overwrites the unreadable copy.
    #[default]
    StartEmpty,
    /// Refuse to open with `StoreError::PersistenceDecode`.
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub backend: Backend,
    pub corrupt_policy: CorruptDataPolicy,
}

impl StoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            backend: Backend::default(),
            corrupt_policy: CorruptDataPolicy::default(),
        }
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_corrupt_policy(mut self, policy: CorruptDataPolicy) -> Self {
        self.corrupt_policy = policy;
        self
    }

    /// Platform data directory, e.g. `~/.local/share/spaced-review` on Linux.
    pub fn default_data_dir() -> Option<PathBuf> {
        ProjectDirs::from("com", "spaced-review", "spaced-review")
            .map(|dirs| dirs.data_dir().to_path_buf())
    }

    pub fn items_path(&self) -> PathBuf {
        self.data_dir.join(self.backend.file_name())
    }

    /// Builds the configured repository and loads the store from it.
    pub fn open_store(&self, clock: Arc<dyn Clock>) -> Result<ReviewStore> {
        let path = self.items_path();
        match self.backend {
            Backend::Json => {
                ReviewStore::open(JsonFileRepository::new(path), clock, self.corrupt_policy)
            }
            Backend::Sqlite => match SqliteRepository::open(&path) {
                Ok(repository) => ReviewStore::open(repository, clock, self.corrupt_policy),
                Err(e)
                    if self.corrupt_policy == CorruptDataPolicy::StartEmpty
                        && is_unreadable_database(&e) =>
                {
                    let moved_to = move_aside(&path).map_err(StoreError::PersistenceDecode)?;
                    warn!(
                        path = %path.display(),
                        moved_to = %moved_to.display(),
                        error = %e,
                        "Database file is unreadable, moved aside and starting with an empty collection"
                    );
                    let repository =
                        SqliteRepository::open(&path).map_err(StoreError::PersistenceDecode)?;
                    Ok(ReviewStore::recovered(repository, clock, e.to_string()))
                }
                Err(e) => Err(StoreError::PersistenceDecode(e)),
            },
        }
    }
}
