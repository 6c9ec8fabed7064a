//! Recording persistence for Eligo.
//!
//! Transcriptions are stored by key through the [`RecordingStore`] trait.
//! [`SqliteRecordingStore`] keeps them in a single SQLite table, created on
//! open if missing.

pub mod error;
pub mod record;
pub mod sqlite;
pub mod store;

pub use error::{Result, StoreError};
pub use record::Recording;
pub use sqlite::SqliteRecordingStore;
pub use store::RecordingStore;
