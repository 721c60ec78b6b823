pub mod grade;
pub mod review_item;
pub mod review_session;
pub mod sm2;
pub mod stats;

pub use grade::{Grade, GradeParseError};
pub use review_item::{ItemId, ReviewItem};
pub use review_session::ReviewSession;
pub use stats::ReviewStats;
