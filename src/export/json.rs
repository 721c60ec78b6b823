//! JSON import/export of review items.
//! Exports wrap the collection with a format version and timestamp; imports also
//! accept a bare item array such as the JSON backend's own `items.json`.

use crate::error::PersistenceError;
use crate::models::ReviewItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

pub const EXPORT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFile {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub items: Vec<ReviewItem>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ImportFile {
    Export(ExportFile),
    Items(Vec<ReviewItem>),
}

/// Exports items to a JSON file at the specified path.
pub fn export_json_to_path(
    items: &[ReviewItem],
    exported_at: DateTime<Utc>,
    path: impl AsRef<Path>,
) -> Result<(), PersistenceError> {
    let path = path.as_ref();
    let export = ExportFile {
        version: EXPORT_FORMAT_VERSION,
        exported_at,
        items: items.to_vec(),
    };
    let json_string = serde_json::to_string_pretty(&export)?;
    let mut file = File::create(path)?;
    file.write_all(json_string.as_bytes())?;

    info!(path = %path.display(), count = items.len(), "Exported review items");
    Ok(())
}

/// Imports items from a JSON file.
/// Returns an error if the file doesn't exist, contains invalid JSON, or was
/// written by a newer export format.
pub fn import_json(path: impl AsRef<Path>) -> Result<Vec<ReviewItem>, PersistenceError> {
    let path = path.as_ref();
    let mut file = File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;

    let items = match serde_json::from_str::<ImportFile>(&contents)? {
        ImportFile::Export(export) if export.version > EXPORT_FORMAT_VERSION => {
            return Err(PersistenceError::Corrupt(format!(
                "unsupported export version {}",
                export.version
            )));
        }
        ImportFile::Export(export) => export.items,
        ImportFile::Items(items) => items,
    };

    info!(path = %path.display(), count = items.len(), "Imported review items");
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::fs;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap()
    }

    fn create_test_items() -> Vec<ReviewItem> {
        let mut reviewed = ReviewItem::new("дом", "house", now() - Duration::days(4));
        reviewed.repetitions = 2;
        reviewed.interval_days = 3;
        reviewed.last_reviewed = Some(now() - Duration::days(1));
        reviewed.due_date = now() + Duration::days(2);
        vec![ReviewItem::new("кот", "cat", now()), reviewed]
    }

    #[test]
    fn test_export_json_to_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");

        export_json_to_path(&create_test_items(), now(), &path).unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["version"], EXPORT_FORMAT_VERSION);
        assert_eq!(value["items"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_export_and_import_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.json");
        let original = create_test_items();

        export_json_to_path(&original, now(), &path).unwrap();
        let imported = import_json(&path).unwrap();

        assert_eq!(original.len(), imported.len());
        for (orig, imp) in original.iter().zip(imported.iter()) {
            assert_eq!(orig.id, imp.id);
            assert_eq!(orig.front, imp.front);
            assert_eq!(orig.back, imp.back);
            assert_eq!(orig.repetitions, imp.repetitions);
            assert_eq!(orig.due_date, imp.due_date);
            assert_eq!(orig.last_reviewed, imp.last_reviewed);
        }
    }

    #[test]
    fn test_import_bare_item_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json");
        fs::write(&path, serde_json::to_string(&create_test_items()).unwrap()).unwrap();

        assert_eq!(import_json(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_import_nonexistent_file() {
        let result = import_json("nonexistent_file_xyz123.json");
        assert!(matches!(result, Err(PersistenceError::Io(_))));
    }

    #[test]
    fn test_import_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invalid.json");
        fs::write(&path, "{ this is not valid json }").unwrap();

        assert!(import_json(&path).is_err());
    }

    #[test]
    fn test_import_newer_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.json");
        fs::write(
            &path,
            r#"{"version": 99, "exportedAt": "2025-03-14T12:00:00Z", "items": []}"#,
        )
        .unwrap();

        assert!(matches!(import_json(&path), Err(PersistenceError::Corrupt(_))));
    }
}
