pub mod db;

pub use db::{SqliteRepository, is_unreadable_database, move_aside};
