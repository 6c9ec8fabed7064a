//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [server]     # HTTP listener, rate limiting
//! [pool]       # browser session pool
//! [retry]      # attempt budget and backoff
//! [cache]      # lookup cache capacity and TTLs
//! [webdriver]  # automation endpoint and browser options
//! [site]       # checker page URL, selectors, markers
//! [store]      # recording database
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Default API rate limit, requests per minute.
pub const DEFAULT_API_RPM: u32 = 120;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged. A missing section means defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EligoConfig {
    /// HTTP server configuration.
    pub server: Option<ServerConfig>,

    /// Session pool configuration.
    pub pool: Option<PoolSection>,

    /// Retry configuration.
    pub retry: Option<RetrySection>,

    /// Lookup cache configuration.
    pub cache: Option<CacheSection>,

    /// WebDriver backend configuration.
    pub webdriver: Option<WebDriverSection>,

    /// Checker page configuration.
    pub site: Option<SiteSection>,

    /// Recording store configuration.
    pub store: Option<StoreSection>,
}

impl EligoConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections are replaced whole, never field by field.
    pub fn merge(&mut self, other: EligoConfig) {
        if other.server.is_some() {
            self.server = other.server;
        }
        if other.pool.is_some() {
            self.pool = other.pool;
        }
        if other.retry.is_some() {
            self.retry = other.retry;
        }
        if other.cache.is_some() {
            self.cache = other.cache;
        }
        if other.webdriver.is_some() {
            self.webdriver = other.webdriver;
        }
        if other.site.is_some() {
            self.site = other.site;
        }
        if other.store.is_some() {
            self.store = other.store;
        }
    }

    /// Server section, or defaults.
    pub fn server(&self) -> ServerConfig {
        self.server.clone().unwrap_or_default()
    }

    /// Pool section, or defaults.
    pub fn pool(&self) -> PoolSection {
        self.pool.clone().unwrap_or_default()
    }

    /// Retry section, or defaults.
    pub fn retry(&self) -> RetrySection {
        self.retry.clone().unwrap_or_default()
    }

    /// Cache section, or defaults.
    pub fn cache(&self) -> CacheSection {
        self.cache.clone().unwrap_or_default()
    }

    /// WebDriver section, or defaults.
    pub fn webdriver(&self) -> WebDriverSection {
        self.webdriver.clone().unwrap_or_default()
    }

    /// Site section, or defaults.
    pub fn site(&self) -> SiteSection {
        self.site.clone().unwrap_or_default()
    }

    /// Store section, or defaults.
    pub fn store(&self) -> StoreSection {
        self.store.clone().unwrap_or_default()
    }

    /// Reject values that parse but cannot run.
    pub fn validate(&self) -> Result<()> {
        let server = self.server();
        if server.bind.trim().is_empty() {
            return Err(ConfigError::invalid("server.bind", "must not be empty"));
        }
        if server.rate_limiting && server.api_rpm == 0 {
            return Err(ConfigError::invalid(
                "server.api_rpm",
                "must be positive when rate limiting is enabled",
            ));
        }

        if self.pool().capacity == 0 {
            return Err(ConfigError::invalid("pool.capacity", "must be at least 1"));
        }

        let retry = self.retry();
        if retry.max_attempts == 0 {
            return Err(ConfigError::invalid("retry.max_attempts", "must be at least 1"));
        }
        if !retry.backoff_multiplier.is_finite() || retry.backoff_multiplier < 1.0 {
            return Err(ConfigError::invalid(
                "retry.backoff_multiplier",
                "must be a finite number of at least 1.0",
            ));
        }

        if self.cache().capacity == 0 {
            return Err(ConfigError::invalid("cache.capacity", "must be at least 1"));
        }

        if self.webdriver().endpoint.trim().is_empty() {
            return Err(ConfigError::invalid("webdriver.endpoint", "must not be empty"));
        }

        if let Some(url) = self.site().check_url.as_deref()
            && url.trim().is_empty()
        {
            return Err(ConfigError::invalid("site.check_url", "must not be empty"));
        }

        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Server configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to listen on.
    pub port: u16,
    /// Address to bind to.
    pub bind: String,
    /// Enable rate limiting.
    pub rate_limiting: bool,
    /// API rate limit: requests per minute.
    pub api_rpm: u32,
    /// Enable request logging.
    pub request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            rate_limiting: true,
            api_rpm: DEFAULT_API_RPM,
            request_logging: true,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Lookup Engine Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Session pool configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSection {
    /// Maximum number of concurrent browser sessions.
    pub capacity: usize,
    /// How long a lookup waits for a free session.
    pub acquire_timeout_secs: u64,
}

impl Default for PoolSection {
    fn default() -> Self {
        Self {
            capacity: 5,
            acquire_timeout_secs: 30,
        }
    }
}

/// What a lookup reports once every attempt has failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exhaustion {
    /// Report the identifier as not found.
    #[default]
    NotFound,
    /// Report that the service did not respond.
    Distinct,
}

/// Retry configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    /// Attempts per lookup, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt, in milliseconds.
    pub backoff_ms: u64,
    /// Factor applied to the delay after each further attempt.
    pub backoff_multiplier: f64,
    /// Outcome reported when attempts run out.
    pub exhaustion: Exhaustion,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 1000,
            backoff_multiplier: 1.0,
            exhaustion: Exhaustion::NotFound,
        }
    }
}

/// Lookup cache configuration section.
///
/// A TTL of 0 keeps entries until they are evicted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Maximum number of cached identifiers.
    pub capacity: usize,
    /// Lifetime of successful lookups.
    pub positive_ttl_secs: u64,
    /// Lifetime of "not found" lookups.
    pub negative_ttl_secs: u64,
    /// How often expired entries are swept.
    pub cleanup_interval_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            capacity: 100,
            positive_ttl_secs: 0,
            negative_ttl_secs: 15 * 60,
            cleanup_interval_secs: 60,
        }
    }
}

/// WebDriver backend configuration section.
///
/// Unset browser args and user agent fall back to the built-in headless
/// Chrome profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebDriverSection {
    /// Base URL of the WebDriver endpoint.
    pub endpoint: String,
    /// Browser name sent in the capabilities.
    pub browser: String,
    /// Command-line arguments for the browser.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    /// User agent override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// WebDriver page load strategy.
    pub page_load_strategy: String,
    /// Timeout for one WebDriver HTTP call.
    pub request_timeout_secs: u64,
    /// Interval between element lookups while waiting.
    pub poll_interval_ms: u64,
}

impl Default for WebDriverSection {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:4444".to_string(),
            browser: "chrome".to_string(),
            args: None,
            user_agent: None,
            page_load_strategy: "eager".to_string(),
            request_timeout_secs: 30,
            poll_interval_ms: 250,
        }
    }
}

/// Checker page configuration section.
///
/// Unset strings fall back to the built-in checker page profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_selector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_selector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_selector: Option<String>,
    /// Phrase marking a successful result region.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_marker: Option<String>,
    /// Phrases marking an unknown identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_found_markers: Option<Vec<String>>,
    /// Bound on each element wait.
    pub interaction_timeout_secs: u64,
    /// Bound on one whole attempt.
    pub attempt_timeout_secs: u64,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            check_url: None,
            input_selector: None,
            result_selector: None,
            error_selector: None,
            success_marker: None,
            not_found_markers: None,
            interaction_timeout_secs: 10,
            attempt_timeout_secs: 30,
        }
    }
}

/// Recording store configuration section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Database file. Defaults to `recordings.db` in the config directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}
