//! W3C WebDriver backend.
//!
//! Talks to a Selenium server or chromedriver over HTTP. Each
//! [`WebDriverSession`] owns one remote browser session.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Value, json};
use tracing::{debug, info};
use url::Url;

use crate::error::{AutomationError, Result};
use crate::session::{SessionFactory, SessionHandle};

/// Default WebDriver endpoint (Selenium standalone).
pub const DEFAULT_ENDPOINT: &str = "http://localhost:4444";

/// Default per-request HTTP timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default interval between element lookups while waiting.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3";

/// Key under which WebDriver returns element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// The Enter key in WebDriver key input.
const ENTER_KEY: char = '\u{E007}';

/// Browser arguments for a headless, image-free Chrome.
pub fn default_browser_args() -> Vec<String> {
    [
        "--headless",
        "--no-sandbox",
        "--disable-dev-shm-usage",
        "--disable-gpu",
        "--window-size=1920x1080",
        "--disable-extensions",
        "--disable-infobars",
        "--blink-settings=imagesEnabled=false",
    ]
    .iter()
    .map(|arg| arg.to_string())
    .collect()
}

/// Configuration for the WebDriver backend.
#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    /// Base URL of the WebDriver server.
    pub endpoint: String,
    pub browser_name: String,
    pub browser_args: Vec<String>,
    /// Overrides the browser's user agent when set.
    pub user_agent: Option<String>,
    /// `normal`, `eager` or `none`.
    pub page_load_strategy: String,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            browser_name: "chrome".to_string(),
            browser_args: default_browser_args(),
            user_agent: Some(DEFAULT_USER_AGENT.to_string()),
            page_load_strategy: "eager".to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl WebDriverConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn with_browser_args(mut self, args: Vec<String>) -> Self {
        self.browser_args = args;
        self
    }

    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_page_load_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.page_load_strategy = strategy.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// New-session capabilities payload.
    pub fn capabilities(&self) -> Value {
        let mut args = self.browser_args.clone();
        if let Some(user_agent) = &self.user_agent {
            args.push(format!("--user-agent={}", user_agent));
        }

        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": self.browser_name,
                    "pageLoadStrategy": self.page_load_strategy,
                    "goog:chromeOptions": { "args": args }
                }
            }
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transport
// ─────────────────────────────────────────────────────────────────────────────

/// Send one WebDriver command and unwrap its `value`.
async fn send_command(
    client: &reqwest::Client,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> Result<Value> {
    let mut request = client.request(method.clone(), url);
    if method == Method::POST {
        request = request.json(&body.unwrap_or_else(|| json!({})));
    }

    let response = request.send().await?;
    let status = response.status();
    let payload: Value = response.json().await?;
    let value = payload.get("value").cloned().unwrap_or(Value::Null);

    if status.is_success() {
        Ok(value)
    } else {
        Err(command_error(&value, status))
    }
}

/// Map a WebDriver error payload into an [`AutomationError`].
fn command_error(value: &Value, status: reqwest::StatusCode) -> AutomationError {
    let error = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status));

    match error.as_str() {
        "no such element" => AutomationError::NoSuchElement(message),
        "invalid session id" => AutomationError::SessionClosed,
        _ => AutomationError::WebDriver { error, message },
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Factory
// ─────────────────────────────────────────────────────────────────────────────

/// Creates browser sessions on a WebDriver server.
pub struct WebDriverFactory {
    client: reqwest::Client,
    endpoint: Url,
    config: Arc<WebDriverConfig>,
}

impl WebDriverFactory {
    pub fn new(config: WebDriverConfig) -> Result<Self> {
        let endpoint = Url::parse(config.endpoint.trim_end_matches('/')).map_err(|e| {
            AutomationError::Protocol(format!("invalid endpoint '{}': {}", config.endpoint, e))
        })?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AutomationError::Protocol(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            config: Arc::new(config),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn session_url(&self) -> String {
        format!("{}/session", self.endpoint.as_str().trim_end_matches('/'))
    }
}

#[async_trait]
impl SessionFactory for WebDriverFactory {
    async fn create(&self) -> Result<Box<dyn SessionHandle>> {
        let value = send_command(
            &self.client,
            Method::POST,
            &self.session_url(),
            Some(self.config.capabilities()),
        )
        .await?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| AutomationError::Protocol("new session response lacks sessionId".to_string()))?
            .to_string();

        info!(
            session_id = %session_id,
            endpoint = %self.endpoint,
            "WebDriver session started"
        );

        Ok(Box::new(WebDriverSession {
            client: self.client.clone(),
            base: format!("{}/{}", self.session_url(), session_id),
            session_id,
            poll_interval: self.config.poll_interval,
            closed: false,
        }))
    }

    fn name(&self) -> &str {
        "webdriver"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// One remote browser session.
pub struct WebDriverSession {
    client: reqwest::Client,
    base: String,
    session_id: String,
    poll_interval: Duration,
    closed: bool,
}

impl WebDriverSession {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        if self.closed {
            return Err(AutomationError::SessionClosed);
        }
        send_command(&self.client, method, &format!("{}{}", self.base, path), body).await
    }

    /// Reference of the first element matching `selector`, if any.
    async fn find(&self, selector: &str) -> Result<Option<String>> {
        let found = self
            .command(
                Method::POST,
                "/element",
                Some(json!({ "using": "css selector", "value": selector })),
            )
            .await;

        match found {
            Ok(value) => value
                .get(ELEMENT_KEY)
                .and_then(Value::as_str)
                .map(|element| Some(element.to_string()))
                .ok_or_else(|| AutomationError::Protocol("element reference missing".to_string())),
            Err(AutomationError::NoSuchElement(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl SessionHandle for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        debug!(session_id = %self.session_id, url, "Navigating");
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn wait_for_element(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.find(selector).await?.is_some() {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(AutomationError::timeout(selector, timeout));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn fill_and_submit(&mut self, selector: &str, text: &str) -> Result<()> {
        let element = self
            .find(selector)
            .await?
            .ok_or_else(|| AutomationError::NoSuchElement(selector.to_string()))?;

        self.command(Method::POST, &format!("/element/{}/clear", element), None)
            .await?;
        self.command(
            Method::POST,
            &format!("/element/{}/value", element),
            Some(json!({ "text": format!("{}{}", text, ENTER_KEY) })),
        )
        .await?;
        Ok(())
    }

    async fn read_text(&mut self, selector: &str) -> Result<Option<String>> {
        let Some(element) = self.find(selector).await? else {
            return Ok(None);
        };
        let value = self
            .command(Method::GET, &format!("/element/{}/text", element), None)
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let result = self.command(Method::DELETE, "", None).await;
        self.closed = true;
        match result {
            Ok(_) | Err(AutomationError::SessionClosed) => {
                debug!(session_id = %self.session_id, "WebDriver session closed");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
