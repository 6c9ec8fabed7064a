//! Scripted session factory for tests.
//!
//! Each identifier is mapped to a queue of [`MockPage`]s. Every submission of
//! that identifier consumes the next page; the last page repeats once the
//! queue is down to one. Counters record what the sessions were asked to do.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{AutomationError, Result};
use crate::session::{SessionFactory, SessionHandle};
use crate::site::{DEFAULT_ERROR_SELECTOR, DEFAULT_RESULT_SELECTOR, SiteProfile};

/// What the results page shows after a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockPage {
    /// The result region holds this text.
    Result(String),
    /// The error banner holds this text.
    Error(String),
    /// The page settles with an empty result region.
    Blank,
    /// Submitting fails with a protocol error.
    Fault(String),
    /// The page never settles; waits run out their timeout.
    Stall,
}

impl MockPage {
    pub fn result(text: impl Into<String>) -> Self {
        Self::Result(text.into())
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::Error(text.into())
    }

    pub fn fault(message: impl Into<String>) -> Self {
        Self::Fault(message.into())
    }
}

struct MockState {
    pages: HashMap<String, VecDeque<MockPage>>,
    default_page: MockPage,
    create_failures: usize,
    submit_delay: Duration,
    result_selector: String,
    error_selector: String,
    created: usize,
    closed: usize,
    live: usize,
    max_live: usize,
    navigations: Vec<String>,
    submissions: Vec<String>,
}

impl MockState {
    fn next_page(&mut self, identifier: &str) -> MockPage {
        match self.pages.get_mut(identifier) {
            Some(queue) if queue.len() > 1 => queue
                .pop_front()
                .unwrap_or_else(|| self.default_page.clone()),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| self.default_page.clone()),
            None => self.default_page.clone(),
        }
    }
}

/// A session factory driven by scripted pages.
#[derive(Clone)]
pub struct MockSessionFactory {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockSessionFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSessionFactory {
    /// Create a factory whose pages are all [`MockPage::Blank`].
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                pages: HashMap::new(),
                default_page: MockPage::Blank,
                create_failures: 0,
                submit_delay: Duration::ZERO,
                result_selector: DEFAULT_RESULT_SELECTOR.to_string(),
                error_selector: DEFAULT_ERROR_SELECTOR.to_string(),
                created: 0,
                closed: 0,
                live: 0,
                max_live: 0,
                navigations: Vec::new(),
                submissions: Vec::new(),
            })),
        }
    }

    /// Script a single page for an identifier.
    pub fn with_page(self, identifier: impl Into<String>, page: MockPage) -> Self {
        self.with_pages(identifier, vec![page])
    }

    /// Script a sequence of pages for an identifier.
    pub fn with_pages(self, identifier: impl Into<String>, pages: Vec<MockPage>) -> Self {
        self.state
            .lock()
            .pages
            .insert(identifier.into(), pages.into());
        self
    }

    /// Page shown for identifiers without a script.
    pub fn with_default_page(self, page: MockPage) -> Self {
        self.state.lock().default_page = page;
        self
    }

    /// Fail the next `count` session creations.
    pub fn with_create_failures(self, count: usize) -> Self {
        self.state.lock().create_failures = count;
        self
    }

    /// Delay every submission by `delay`.
    pub fn with_submit_delay(self, delay: Duration) -> Self {
        self.state.lock().submit_delay = delay;
        self
    }

    /// Answer reads for the selectors of `site`.
    pub fn with_site(self, site: &SiteProfile) -> Self {
        {
            let mut state = self.state.lock();
            state.result_selector = site.result_selector.clone();
            state.error_selector = site.error_selector.clone();
        }
        self
    }

    /// Sessions created so far.
    pub fn created(&self) -> usize {
        self.state.lock().created
    }

    /// Sessions closed so far.
    pub fn closed(&self) -> usize {
        self.state.lock().closed
    }

    /// Sessions currently open.
    pub fn live(&self) -> usize {
        self.state.lock().live
    }

    /// Highest number of sessions open at the same time.
    pub fn max_live(&self) -> usize {
        self.state.lock().max_live
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().navigations.clone()
    }

    /// Every identifier submitted, in order.
    pub fn submissions(&self) -> Vec<String> {
        self.state.lock().submissions.clone()
    }

    /// Number of submissions of one identifier.
    pub fn submissions_for(&self, identifier: &str) -> usize {
        self.state
            .lock()
            .submissions
            .iter()
            .filter(|submitted| submitted.as_str() == identifier)
            .count()
    }
}

#[async_trait]
impl SessionFactory for MockSessionFactory {
    async fn create(&self) -> Result<Box<dyn SessionHandle>> {
        let mut state = self.state.lock();
        if state.create_failures > 0 {
            state.create_failures -= 1;
            return Err(AutomationError::Unreachable(
                "mock: session creation refused".to_string(),
            ));
        }
        state.created += 1;
        state.live += 1;
        state.max_live = state.max_live.max(state.live);

        Ok(Box::new(MockSession {
            state: Arc::clone(&self.state),
            page: None,
            closed: false,
        }))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A session produced by [`MockSessionFactory`].
pub struct MockSession {
    state: Arc<Mutex<MockState>>,
    page: Option<MockPage>,
    closed: bool,
}

impl MockSession {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(AutomationError::SessionClosed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SessionHandle for MockSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.ensure_open()?;
        self.state.lock().navigations.push(url.to_string());
        self.page = None;
        Ok(())
    }

    async fn wait_for_element(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        self.ensure_open()?;
        if let Some(MockPage::Stall) = self.page {
            tokio::time::sleep(timeout).await;
            return Err(AutomationError::timeout(selector, timeout));
        }
        Ok(())
    }

    async fn fill_and_submit(&mut self, _selector: &str, text: &str) -> Result<()> {
        self.ensure_open()?;
        let delay = {
            let mut state = self.state.lock();
            state.submissions.push(text.to_string());
            state.submit_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let page = self.state.lock().next_page(text);
        if let MockPage::Fault(message) = page {
            return Err(AutomationError::Protocol(message));
        }
        self.page = Some(page);
        Ok(())
    }

    async fn read_text(&mut self, selector: &str) -> Result<Option<String>> {
        self.ensure_open()?;
        let state = self.state.lock();
        let text = match &self.page {
            Some(MockPage::Result(text)) if selector == state.result_selector => {
                Some(text.clone())
            }
            Some(MockPage::Error(text)) if selector == state.error_selector => Some(text.clone()),
            Some(MockPage::Blank) if selector == state.result_selector => Some(String::new()),
            _ => None,
        };
        Ok(text)
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let mut state = self.state.lock();
        state.closed += 1;
        state.live = state.live.saturating_sub(1);
        Ok(())
    }
}
