//! SQLite-backed recording store.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::record::Recording;
use crate::store::RecordingStore;

/// How long a write waits on a locked database before reporting capacity.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Recording store backed by a single SQLite connection.
pub struct SqliteRecordingStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteRecordingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRecordingStore").finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Initialization
// ─────────────────────────────────────────────────────────────────────────────

impl SqliteRecordingStore {
    /// Open or create a store at the given path.
    ///
    /// Creates the parent directory and the table if they don't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Access(format!("cannot create {}: {}", parent.display(), e))
                })?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize(true)?;

        info!(path = %path.display(), "Recording store opened");
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize(false)?;

        debug!("In-memory recording store created");
        Ok(store)
    }

    /// Change how long writes wait on a locked database.
    pub fn with_busy_timeout(self, timeout: Duration) -> Result<Self> {
        self.conn.lock().busy_timeout(timeout)?;
        Ok(self)
    }

    fn initialize(&self, on_disk: bool) -> Result<()> {
        let conn = self.conn.lock();

        if on_disk {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
        }
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS transcribe (
                transcribe_id TEXT PRIMARY KEY,
                doctor_id TEXT NOT NULL,
                duration INTEGER NOT NULL,
                transcribe TEXT NOT NULL,
                notes TEXT,
                timestamp TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_transcribe_doctor
                ON transcribe(doctor_id);
            "#,
        )?;

        Ok(())
    }

    fn row_to_recording(row: &rusqlite::Row<'_>) -> rusqlite::Result<(Recording, String)> {
        let timestamp: String = row.get(5)?;
        let recording = Recording {
            transcribe_id: row.get(0)?,
            doctor_id: row.get(1)?,
            duration: row.get(2)?,
            transcribe: row.get(3)?,
            notes: row.get(4)?,
            timestamp: DateTime::<Utc>::default(),
        };
        Ok((recording, timestamp))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RecordingStore
// ─────────────────────────────────────────────────────────────────────────────

impl RecordingStore for SqliteRecordingStore {
    fn put(&self, key: &str, record: &Recording) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute(
            r#"
            INSERT OR REPLACE INTO transcribe
                (transcribe_id, doctor_id, duration, transcribe, notes, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                key,
                record.doctor_id,
                record.duration,
                record.transcribe,
                record.notes,
                record.timestamp.to_rfc3339(),
            ],
        )?;

        debug!(transcribe_id = %key, "Recording stored");
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Recording>> {
        let conn = self.conn.lock();

        let row = conn
            .query_row(
                "SELECT transcribe_id, doctor_id, duration, transcribe, notes, timestamp \
                 FROM transcribe WHERE transcribe_id = ?1",
                params![key],
                Self::row_to_recording,
            )
            .optional()?;

        let Some((mut recording, timestamp)) = row else {
            return Ok(None);
        };
        recording.timestamp = DateTime::parse_from_rfc3339(&timestamp)
            .map_err(|e| StoreError::InvalidData(format!("timestamp '{}': {}", timestamp, e)))?
            .with_timezone(&Utc);

        Ok(Some(recording))
    }

    fn count(&self) -> Result<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM transcribe", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample(id: &str) -> Recording {
        Recording::new(id, "doctor-9", 120, "Patient presents with a cough.")
    }

    #[test]
    fn test_put_then_get() {
        let store = SqliteRecordingStore::open_in_memory().unwrap();
        let record = sample("t-1").with_notes("review in a week");

        store.put("t-1", &record).unwrap();
        let loaded = store.get("t-1").unwrap().unwrap();

        assert_eq!(loaded.transcribe_id, "t-1");
        assert_eq!(loaded.doctor_id, "doctor-9");
        assert_eq!(loaded.duration, 120);
        assert_eq!(loaded.notes.as_deref(), Some("review in a week"));
        assert_eq!(loaded.timestamp, record.timestamp);
    }

    #[test]
    fn test_get_missing() {
        let store = SqliteRecordingStore::open_in_memory().unwrap();
        assert!(store.get("nope").unwrap().is_none());
    }

    #[test]
    fn test_put_is_upsert() {
        let store = SqliteRecordingStore::open_in_memory().unwrap();

        store.put("t-1", &sample("t-1")).unwrap();
        store.put("t-1", &sample("t-1")).unwrap();
        assert_eq!(store.count().unwrap(), 1);

        let mut changed = sample("t-1");
        changed.duration = 30;
        store.put("t-1", &changed).unwrap();

        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.get("t-1").unwrap().unwrap().duration, 30);
    }

    #[test]
    fn test_open_creates_parent_dir_and_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("recordings.db");

        {
            let store = SqliteRecordingStore::open(&path).unwrap();
            store.put("t-1", &sample("t-1")).unwrap();
        }

        let reopened = SqliteRecordingStore::open(&path).unwrap();
        assert!(reopened.get("t-1").unwrap().is_some());
    }

    #[test]
    fn test_read_only_database_is_access_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("recordings.db");
        drop(SqliteRecordingStore::open(&path).unwrap());

        let conn = Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_ONLY).unwrap();
        let store = SqliteRecordingStore {
            conn: Mutex::new(conn),
        };

        let err = store.put("t-1", &sample("t-1")).unwrap_err();
        assert!(matches!(err, StoreError::Access(_)), "got {err:?}");
    }

    #[test]
    fn test_locked_database_is_capacity_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("recordings.db");
        let store = SqliteRecordingStore::open(&path)
            .unwrap()
            .with_busy_timeout(Duration::ZERO)
            .unwrap();

        let holder = Connection::open(&path).unwrap();
        holder.execute_batch("BEGIN EXCLUSIVE;").unwrap();

        let err = store.put("t-1", &sample("t-1")).unwrap_err();
        assert!(matches!(err, StoreError::Capacity(_)), "got {err:?}");

        holder.execute_batch("ROLLBACK;").unwrap();
        store.put("t-1", &sample("t-1")).unwrap();
    }
}
