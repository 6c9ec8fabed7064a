//! Retry around single lookup attempts.
//!
//! Only faults are retried. Any outcome the remote actually produced
//! (success, known error, unknown error) ends the run immediately. A pool
//! that is busy past its acquire timeout or shut down ends it with
//! `SYSTEM_ERROR`, whatever the exhaustion policy.

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::Fault;
use crate::outcome::LookupOutcome;

/// Default number of attempts per lookup.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay between attempts.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Upper bound on any single backoff delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// What a lookup reports once every attempt has faulted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionPolicy {
    /// Report `PATIENT_NOT_FOUND`, indistinguishable from a genuine negative.
    #[default]
    NotFound,
    /// Report `NO_RESPONSE`, or `SYSTEM_ERROR` if the last attempt could not
    /// construct a session.
    Distinct,
}

impl ExhaustionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Distinct => "distinct",
        }
    }
}

impl FromStr for ExhaustionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "not_found" | "not-found" => Ok(Self::NotFound),
            "distinct" => Ok(Self::Distinct),
            other => Err(format!(
                "unknown exhaustion policy '{}', expected 'not_found' or 'distinct'",
                other
            )),
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts per lookup, including the first.
    pub max_attempts: u32,

    /// Delay before the second attempt.
    pub backoff: Duration,

    /// Factor applied to the delay after each failed attempt (1.0 = fixed).
    pub backoff_multiplier: f64,

    pub exhaustion: ExhaustionPolicy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
            backoff_multiplier: 1.0,
            exhaustion: ExhaustionPolicy::NotFound,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the attempt budget (at least one).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set the backoff growth factor. Values below 1.0 are treated as 1.0.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier.max(1.0);
        self
    }

    pub fn with_exhaustion(mut self, exhaustion: ExhaustionPolicy) -> Self {
        self.exhaustion = exhaustion;
        self
    }

    /// Delay to use after `current`.
    fn next_backoff(&self, current: Duration) -> Duration {
        let scaled = current.as_secs_f64() * self.backoff_multiplier.max(1.0);
        Duration::try_from_secs_f64(scaled)
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF)
    }
}

/// Runs lookup attempts until one produces an outcome or the budget runs out.
#[derive(Debug, Clone, Default)]
pub struct RetryOrchestrator {
    policy: RetryPolicy,
}

impl RetryOrchestrator {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run attempts for `identifier`.
    ///
    /// `attempt` is called with the 1-based attempt number. It is responsible
    /// for acquiring and settling its own session.
    pub async fn run<F, Fut>(&self, identifier: &str, mut attempt: F) -> LookupOutcome
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<LookupOutcome, Fault>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut backoff = self.policy.backoff;
        let mut last_fault = None;

        for number in 1..=max_attempts {
            match attempt(number).await {
                Ok(outcome) => {
                    debug!(
                        identifier,
                        attempt = number,
                        outcome = outcome.kind(),
                        "Lookup attempt completed"
                    );
                    return outcome;
                }
                Err(fault) if !fault.is_retryable() => {
                    error!(
                        identifier,
                        attempt = number,
                        error = %fault,
                        "No session for lookup, not retrying"
                    );
                    return LookupOutcome::system_error();
                }
                Err(fault) => {
                    warn!(
                        identifier,
                        attempt = number,
                        max_attempts,
                        error = %fault,
                        "Lookup attempt failed"
                    );
                    last_fault = Some(fault);

                    if number < max_attempts {
                        debug!(
                            identifier,
                            backoff_ms = backoff.as_millis() as u64,
                            "Backing off before retry"
                        );
                        tokio::time::sleep(backoff).await;
                        backoff = self.policy.next_backoff(backoff);
                    }
                }
            }
        }

        self.exhausted(identifier, last_fault.as_ref())
    }

    fn exhausted(&self, identifier: &str, last_fault: Option<&Fault>) -> LookupOutcome {
        warn!(
            identifier,
            attempts = self.policy.max_attempts,
            policy = self.policy.exhaustion.as_str(),
            "Lookup attempts exhausted"
        );
        match self.policy.exhaustion {
            ExhaustionPolicy::NotFound => LookupOutcome::not_found(),
            ExhaustionPolicy::Distinct => match last_fault {
                Some(fault) if fault.is_session_unavailable() => LookupOutcome::system_error(),
                _ => LookupOutcome::no_response(),
            },
        }
    }
}
