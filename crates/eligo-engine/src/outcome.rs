//! Lookup outcomes and the response contract handed to callers.

use eligo_cache::CacheValue;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Stable error codes reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The remote site has no record for the identifier (or gave no usable answer).
    PatientNotFound,
    /// Every attempt failed without the remote answering.
    NoResponse,
    /// The service could not reach the remote at all.
    SystemError,
}

impl ErrorCode {
    /// Wire name of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PatientNotFound => "PATIENT_NOT_FOUND",
            Self::NoResponse => "NO_RESPONSE",
            Self::SystemError => "SYSTEM_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one lookup attempt against the remote site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// The result region held a record.
    Success {
        /// Text extracted from the result region.
        raw_text: String,
    },
    /// The remote answered with a recognised negative.
    KnownError {
        code: ErrorCode,
        title: String,
        message: String,
    },
    /// The remote showed an error that is not recognised.
    UnknownError { message: String },
}

impl LookupOutcome {
    /// The canonical "no record" outcome.
    pub fn not_found() -> Self {
        Self::known(
            ErrorCode::PatientNotFound,
            "Patient not found",
            "No eligibility record was found for this identifier.",
        )
    }

    /// All attempts failed before the remote answered.
    pub fn no_response() -> Self {
        Self::known(
            ErrorCode::NoResponse,
            "No response",
            "The eligibility service did not respond. Please try again later.",
        )
    }

    /// The service could not obtain a session to ask the remote.
    pub fn system_error() -> Self {
        Self::known(
            ErrorCode::SystemError,
            "System error",
            "The eligibility service is currently unavailable.",
        )
    }

    fn known(code: ErrorCode, title: &str, message: &str) -> Self {
        Self::KnownError {
            code,
            title: title.to_string(),
            message: message.to_string(),
        }
    }

    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::KnownError { .. } => "known_error",
            Self::UnknownError { .. } => "unknown_error",
        }
    }
}

/// Structured eligibility record extracted from the result text.
///
/// Every field is optional; fields the remote did not show serialize as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityRecord {
    pub eligibility: Option<String>,
    pub scheme_id: Option<String>,
    pub scheme_type: Option<String>,
    pub doctor_number: Option<String>,
    pub date_of_birth: Option<String>,
    pub eligibility_start_date: Option<String>,
    pub eligibility_end_date: Option<String>,
}

/// Response returned for every lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LookupResponse {
    /// A record was found.
    Success { data: EligibilityRecord },
    /// No record could be produced.
    Error {
        code: ErrorCode,
        title: String,
        message: String,
    },
}

impl LookupResponse {
    /// Build an error response.
    pub fn error(code: ErrorCode, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            title: title.into(),
            message: message.into(),
        }
    }

    /// Error code if this is an error response.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Success { .. } => None,
            Self::Error { code, .. } => Some(*code),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

impl CacheValue for LookupResponse {
    fn is_negative(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}
