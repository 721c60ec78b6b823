pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod models;
pub mod repository;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{Backend, CorruptDataPolicy, StoreConfig};
pub use error::{PersistenceError, StoreError};
pub use models::{Grade, ItemId, ReviewItem, ReviewSession, ReviewStats};
pub use store::{LoadOutcome, MergeReport, ReviewStore};
