//! Classification of a settled results page.
//!
//! Waiting for the page is the session's job; by the time [`classify`] runs the
//! text of both regions has already been read.

use crate::outcome::LookupOutcome;
use crate::parser::RECORD_HEADER;

/// Default phrases that mark a "no such patient" answer.
pub const DEFAULT_NOT_FOUND_MARKERS: [&str; 4] =
    ["not found", "no record", "no results", "invalid scheme"];

/// Text read from the results page after submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSnapshot {
    /// Text of the result region, if it was present.
    pub result_text: Option<String>,
    /// Text of the error banner, if it was present.
    pub error_text: Option<String>,
}

impl PageSnapshot {
    pub fn with_result(text: impl Into<String>) -> Self {
        Self {
            result_text: Some(text.into()),
            error_text: None,
        }
    }

    pub fn with_error(text: impl Into<String>) -> Self {
        Self {
            result_text: None,
            error_text: Some(text.into()),
        }
    }
}

/// Phrases used to recognise page states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    /// Present in the result region when a record is shown.
    pub success: String,
    /// Any of these (case-insensitive) means the identifier is unknown.
    pub not_found: Vec<String>,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            success: RECORD_HEADER.to_string(),
            not_found: DEFAULT_NOT_FOUND_MARKERS
                .iter()
                .map(|marker| marker.to_string())
                .collect(),
        }
    }
}

impl Markers {
    fn is_not_found(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.not_found
            .iter()
            .any(|marker| text.contains(&marker.to_lowercase()))
    }

    fn is_success(&self, text: &str) -> bool {
        text.to_lowercase().contains(&self.success.to_lowercase())
    }
}

/// Classify a snapshot. The error banner takes priority over the result region.
pub fn classify(snapshot: &PageSnapshot, markers: &Markers) -> LookupOutcome {
    let banner = snapshot
        .error_text
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty());

    if let Some(banner) = banner {
        if markers.is_not_found(banner) {
            return LookupOutcome::not_found();
        }
        return LookupOutcome::UnknownError {
            message: banner.to_string(),
        };
    }

    if let Some(result) = snapshot.result_text.as_deref() {
        if markers.is_success(result) {
            return LookupOutcome::Success {
                raw_text: result.to_string(),
            };
        }
        if markers.is_not_found(result) {
            return LookupOutcome::not_found();
        }
    }

    LookupOutcome::not_found()
}
