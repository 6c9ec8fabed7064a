//! Error types for the lookup engine.

use std::time::Duration;
use thiserror::Error;

/// Result type alias using the automation error type.
pub type Result<T> = std::result::Result<T, AutomationError>;

// ─────────────────────────────────────────────────────────────────────────────
// Automation Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Failure raised while driving a browser session.
#[derive(Debug, Clone, Error)]
pub enum AutomationError {
    /// The automation endpoint could not be reached.
    #[error("Automation endpoint unreachable: {0}")]
    Unreachable(String),

    /// An element did not appear within the allotted time.
    #[error("Timed out after {waited:?} waiting for '{selector}'")]
    Timeout {
        /// Selector that was being waited on.
        selector: String,
        /// How long the wait lasted.
        waited: Duration,
    },

    /// No element matched a selector that had to be present.
    #[error("No element matches '{0}'")]
    NoSuchElement(String),

    /// The automation endpoint rejected a command.
    #[error("WebDriver error '{error}': {message}")]
    WebDriver {
        /// Error code reported by the endpoint (e.g. "invalid session id").
        error: String,
        /// Human readable detail.
        message: String,
    },

    /// The endpoint answered with something that is not valid protocol.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A command was issued on a session that was already closed.
    #[error("Session already closed")]
    SessionClosed,
}

impl AutomationError {
    /// Create a timeout error for a selector.
    pub fn timeout(selector: impl Into<String>, waited: Duration) -> Self {
        Self::Timeout {
            selector: selector.into(),
            waited,
        }
    }

    /// Returns true if this error came from a wait that ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<reqwest::Error> for AutomationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AutomationError::Unreachable(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            AutomationError::Unreachable(format!("Connection failed: {}", err))
        } else if err.is_decode() {
            AutomationError::Protocol(err.to_string())
        } else {
            AutomationError::Unreachable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AutomationError {
    fn from(err: serde_json::Error) -> Self {
        AutomationError::Protocol(err.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pool Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Reasons the session pool could not hand out a session.
#[derive(Debug, Clone, Error)]
pub enum PoolError {
    /// A new session could not be constructed.
    #[error("Session unavailable: {0}")]
    Unavailable(String),

    /// Every session stayed leased for the whole acquire timeout.
    #[error("No session became free within {waited:?}")]
    Exhausted {
        /// How long the caller waited.
        waited: Duration,
    },

    /// The pool has been shut down.
    #[error("Session pool is shut down")]
    ShutDown,
}

// ─────────────────────────────────────────────────────────────────────────────
// Attempt Faults
// ─────────────────────────────────────────────────────────────────────────────

/// Why a single lookup attempt failed to produce an outcome.
///
/// See [`Fault::is_retryable`] for which faults the orchestrator retries.
#[derive(Debug, Clone, Error)]
pub enum Fault {
    /// No session could be obtained for the attempt.
    #[error(transparent)]
    Unavailable(#[from] PoolError),

    /// The remote interaction broke part way.
    #[error(transparent)]
    Interaction(#[from] AutomationError),

    /// The attempt as a whole ran past its deadline.
    #[error("Attempt exceeded {0:?}")]
    Timeout(Duration),
}

impl Fault {
    /// Returns true if another attempt may succeed.
    ///
    /// A pool that stayed busy for the whole acquire timeout, or one that is
    /// shut down, is reported at once instead of queued for again.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::Unavailable(PoolError::Exhausted { .. } | PoolError::ShutDown)
        )
    }

    /// Returns true if a new session could not be constructed.
    pub fn is_session_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(PoolError::Unavailable(_)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Error raised while assembling a lookup engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The builder was finished without a session factory.
    #[error("No session factory configured")]
    MissingFactory,

    /// A configuration value is unusable.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The automation backend could not be prepared.
    #[error(transparent)]
    Automation(#[from] AutomationError),
}
