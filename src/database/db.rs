//! SQLite backend for the review store
//!
//! Keeps one row per review item with a named column per field, plus a
//! `position` column that preserves insertion order. Every save replaces all
//! rows inside a single transaction.

use crate::error::PersistenceError;
use crate::models::{ItemId, ReviewItem};
use crate::repository::ItemRepository;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use std::path::{Path, PathBuf};

type ItemRow = (
    String,
    String,
    String,
    f64,
    u32,
    u32,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
    DateTime<Utc>,
);

pub struct SqliteRepository {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteRepository {
    /// Opens (or creates) the database file and its tables.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        init_database(&conn)?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()?;
        init_database(&conn)?;
        Ok(Self { conn, path: None })
    }
}

/// True when SQLite rejects the file itself rather than a statement.
pub fn is_unreadable_database(err: &PersistenceError) -> bool {
    match err {
        PersistenceError::Database(e) => matches!(
            e.sqlite_error_code(),
            Some(ErrorCode::NotADatabase | ErrorCode::DatabaseCorrupt)
        ),
        _ => false,
    }
}

/// Renames an unreadable database file to `<name>.corrupt` and returns the new path.
pub fn move_aside(path: &Path) -> Result<PathBuf, PersistenceError> {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".corrupt");
    let target = path.with_file_name(name);
    std::fs::rename(path, &target)?;
    Ok(target)
}

/// Creates the item table and the app_state table used to mark a completed save.
fn init_database(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS review_items (
            id TEXT PRIMARY KEY,
            position INTEGER NOT NULL,
            front TEXT NOT NULL,
            back TEXT NOT NULL,
            ease REAL NOT NULL,
            interval_days INTEGER NOT NULL,
            repetitions INTEGER NOT NULL,
            due_date TEXT NOT NULL,
            last_reviewed TEXT,
            created_at TEXT NOT NULL
        )",
        (),
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS app_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

fn item_from_row(row: ItemRow) -> Result<ReviewItem, PersistenceError> {
    let (id, front, back, ease, interval_days, repetitions, due_date, last_reviewed, created_at) =
        row;
    let id: ItemId = id
        .parse()
        .map_err(|e| PersistenceError::Corrupt(format!("invalid item id '{}': {}", id, e)))?;

    Ok(ReviewItem {
        id,
        front,
        back,
        ease,
        interval_days,
        repetitions,
        due_date,
        last_reviewed,
        created_at,
    })
}

impl ItemRepository for SqliteRepository {
    fn load(&mut self) -> Result<Option<Vec<ReviewItem>>, PersistenceError> {
        let saved_at: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM app_state WHERE key = 'saved_at'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        if saved_at.is_none() {
            return Ok(None);
        }

        let mut stmt = self.conn.prepare(
            "SELECT id, front, back, ease, interval_days, repetitions, due_date, last_reviewed, created_at
             FROM review_items
             ORDER BY position ASC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                    row.get(8)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<ItemRow>>>()?;

        let items = rows
            .into_iter()
            .map(item_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(items))
    }

    fn save(&mut self, items: &[ReviewItem]) -> Result<(), PersistenceError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM review_items", ())?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO review_items
                 (id, position, front, back, ease, interval_days, repetitions, due_date, last_reviewed, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for (position, item) in items.iter().enumerate() {
                insert.execute(params![
                    item.id.to_string(),
                    position as i64,
                    item.front,
                    item.back,
                    item.ease,
                    item.interval_days,
                    item.repetitions,
                    item.due_date,
                    item.last_reviewed,
                    item.created_at,
                ])?;
            }
        }
        tx.execute(
            "INSERT OR REPLACE INTO app_state (key, value) VALUES ('saved_at', ?1)",
            params![Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("sqlite:{}", path.display()),
            None => "sqlite::memory:".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sample_items() -> Vec<ReviewItem> {
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 15).unwrap()
            + Duration::nanoseconds(987_654_321);
        let fresh = ReviewItem::new("кот", "cat", now);
        let mut reviewed = ReviewItem::new("дом", "house", now - Duration::days(2));
        reviewed.ease = 2.5 - 0.15;
        reviewed.interval_days = 8;
        reviewed.repetitions = 3;
        reviewed.last_reviewed = Some(now);
        reviewed.due_date = now + Duration::days(8);
        vec![fresh, reviewed]
    }

    #[test]
    fn test_garbage_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.sqlite3");
        std::fs::write(&path, "this is not a sqlite database ".repeat(64)).unwrap();

        let err = SqliteRepository::open(&path).err().unwrap();
        assert!(is_unreadable_database(&err));

        let moved = move_aside(&path).unwrap();
        assert!(moved.ends_with("items.sqlite3.corrupt"));
        assert!(!path.exists());
        assert!(SqliteRepository::open(&path).is_ok());
    }

    #[test]
    fn test_fresh_database_loads_as_none() {
        let mut repo = SqliteRepository::open_in_memory().unwrap();
        assert!(repo.load().unwrap().is_none());
    }

    #[test]
    fn test_saved_empty_collection_loads_as_empty() {
        let mut repo = SqliteRepository::open_in_memory().unwrap();
        repo.save(&[]).unwrap();
        assert_eq!(repo.load().unwrap().unwrap().len(), 0);
    }

    #[test]
    fn test_roundtrip_preserves_every_field_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.sqlite3");
        let items = sample_items();

        {
            let mut repo = SqliteRepository::open(&path).unwrap();
            repo.save(&items).unwrap();
        }

        let mut repo = SqliteRepository::open(&path).unwrap();
        let loaded = repo.load().unwrap().unwrap();
        assert_eq!(loaded.len(), items.len());
        for (orig, back) in items.iter().zip(loaded.iter()) {
            assert_eq!(orig.id, back.id);
            assert_eq!(orig.front, back.front);
            assert_eq!(orig.back, back.back);
            assert_eq!(orig.ease.to_bits(), back.ease.to_bits());
            assert_eq!(orig.interval_days, back.interval_days);
            assert_eq!(orig.repetitions, back.repetitions);
            assert_eq!(orig.due_date, back.due_date);
            assert_eq!(orig.last_reviewed, back.last_reviewed);
            assert_eq!(orig.created_at, back.created_at);
        }
    }

    #[test]
    fn test_save_replaces_previous_rows() {
        let mut repo = SqliteRepository::open_in_memory().unwrap();
        let items = sample_items();
        repo.save(&items).unwrap();
        repo.save(&items[1..]).unwrap();

        let loaded = repo.load().unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, items[1].id);
    }

    #[test]
    fn test_bad_id_is_corrupt() {
        let mut repo = SqliteRepository::open_in_memory().unwrap();
        repo.save(&sample_items()).unwrap();
        repo.conn
            .execute("UPDATE review_items SET id = 'garbage' WHERE position = 0", ())
            .unwrap();

        assert!(matches!(repo.load(), Err(PersistenceError::Corrupt(_))));
    }
}
