//! JSON file backend.
//!
//! The collection is stored as a pretty-printed JSON array of items with
//! camelCase field names. Writes go to a sibling temporary file which is then
//! renamed over the target, so a crash mid-write leaves the previous copy intact.

use super::ItemRepository;
use crate::error::PersistenceError;
use crate::models::ReviewItem;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ItemRepository for JsonFileRepository {
    fn load(&mut self) -> Result<Option<Vec<ReviewItem>>, PersistenceError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let items: Vec<ReviewItem> = serde_json::from_slice(&bytes)?;
        Ok(Some(items))
    }

    fn save(&mut self, items: &[ReviewItem]) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_vec_pretty(items)?;
        let temp = self.temp_path();
        fs::write(&temp, json)?;
        fs::rename(&temp, &self.path)?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
