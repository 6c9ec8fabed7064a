//! The recording record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A saved transcription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    /// Unique key of the transcription.
    pub transcribe_id: String,
    pub doctor_id: String,
    /// Length of the recording in seconds.
    pub duration: i64,
    /// Transcribed text.
    pub transcribe: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// When the server accepted the recording.
    pub timestamp: DateTime<Utc>,
}

impl Recording {
    /// Create a recording stamped with the current time.
    pub fn new(
        transcribe_id: impl Into<String>,
        doctor_id: impl Into<String>,
        duration: i64,
        transcribe: impl Into<String>,
    ) -> Self {
        Self {
            transcribe_id: transcribe_id.into(),
            doctor_id: doctor_id.into(),
            duration,
            transcribe: transcribe.into(),
            notes: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}
