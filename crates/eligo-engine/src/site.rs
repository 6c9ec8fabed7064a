//! The remote checker page and the steps of one lookup against it.

use std::time::Duration;

use tracing::debug;

use crate::error::Result;
use crate::outcome::LookupOutcome;
use crate::probe::{Markers, PageSnapshot, classify};
use crate::session::SessionHandle;

pub const DEFAULT_CHECK_URL: &str = "https://www.sspcrs.ie/portal/checker/pub/check";
pub const DEFAULT_INPUT_SELECTOR: &str = "#schemeIdInput";
pub const DEFAULT_RESULT_SELECTOR: &str = "#page-content > div.main-box > div.pt-2 > div > div";
pub const DEFAULT_ERROR_SELECTOR: &str = ".alert-danger";

/// Default wait for any single element.
pub const DEFAULT_INTERACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound on a whole attempt, from navigation to classification.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where and how to look up an identifier.
#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub check_url: String,
    pub input_selector: String,
    pub result_selector: String,
    pub error_selector: String,
    pub markers: Markers,
    pub interaction_timeout: Duration,
    pub attempt_timeout: Duration,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            check_url: DEFAULT_CHECK_URL.to_string(),
            input_selector: DEFAULT_INPUT_SELECTOR.to_string(),
            result_selector: DEFAULT_RESULT_SELECTOR.to_string(),
            error_selector: DEFAULT_ERROR_SELECTOR.to_string(),
            markers: Markers::default(),
            interaction_timeout: DEFAULT_INTERACTION_TIMEOUT,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

impl SiteProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_check_url(mut self, url: impl Into<String>) -> Self {
        self.check_url = url.into();
        self
    }

    pub fn with_selectors(
        mut self,
        input: impl Into<String>,
        result: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        self.input_selector = input.into();
        self.result_selector = result.into();
        self.error_selector = error.into();
        self
    }

    pub fn with_markers(mut self, markers: Markers) -> Self {
        self.markers = markers;
        self
    }

    pub fn with_interaction_timeout(mut self, timeout: Duration) -> Self {
        self.interaction_timeout = timeout;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Selector list that matches once the page has settled either way.
    pub fn settled_selector(&self) -> String {
        format!("{}, {}", self.result_selector, self.error_selector)
    }

    /// Submit `identifier` and classify what the page shows.
    pub async fn interact(
        &self,
        session: &mut dyn SessionHandle,
        identifier: &str,
    ) -> Result<LookupOutcome> {
        session.navigate(&self.check_url).await?;
        session
            .wait_for_element(&self.input_selector, self.interaction_timeout)
            .await?;
        session
            .fill_and_submit(&self.input_selector, identifier)
            .await?;
        session
            .wait_for_element(&self.settled_selector(), self.interaction_timeout)
            .await?;

        let snapshot = PageSnapshot {
            result_text: session.read_text(&self.result_selector).await?,
            error_text: session.read_text(&self.error_selector).await?,
        };
        debug!(
            identifier,
            has_result = snapshot.result_text.is_some(),
            has_error = snapshot.error_text.is_some(),
            "Captured results page"
        );

        Ok(classify(&snapshot, &self.markers))
    }
}
