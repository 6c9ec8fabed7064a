//! Session abstraction over a remote automation endpoint.
//!
//! A [`SessionHandle`] is one live browser session; a [`SessionFactory`]
//! creates them. The pool only ever sees these traits, so the WebDriver
//! backend and the scripted test factory are interchangeable.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// One live automation session.
///
/// Handles are used by a single owner at a time (the pool enforces this), so
/// methods take `&mut self`.
#[async_trait]
pub trait SessionHandle: Send {
    /// Load a URL and wait for the page to become interactive.
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Wait until an element matching `selector` is present.
    ///
    /// `selector` is a CSS selector and may be a selector list
    /// (`"a, b"`), in which case any match ends the wait.
    async fn wait_for_element(&mut self, selector: &str, timeout: Duration) -> Result<()>;

    /// Replace the contents of an input and submit its form.
    async fn fill_and_submit(&mut self, selector: &str, text: &str) -> Result<()>;

    /// Visible text of the first matching element, or `None` if nothing matches.
    async fn read_text(&mut self, selector: &str) -> Result<Option<String>>;

    /// End the remote session. Calling this more than once is harmless.
    async fn close(&mut self) -> Result<()>;
}

/// Creates new automation sessions.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Start a new session.
    async fn create(&self) -> Result<Box<dyn SessionHandle>>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}
