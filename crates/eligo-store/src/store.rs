//! The recording store interface.

use crate::error::Result;
use crate::record::Recording;

/// Keyed persistence for recordings.
///
/// `put` is an upsert: writing the same key again replaces the stored record,
/// so repeating a write is harmless.
pub trait RecordingStore: Send + Sync {
    /// Store `record` under `key`.
    fn put(&self, key: &str, record: &Recording) -> Result<()>;

    /// Fetch the record stored under `key`.
    fn get(&self, key: &str) -> Result<Option<Recording>>;

    /// Number of stored records.
    fn count(&self) -> Result<u64>;
}
