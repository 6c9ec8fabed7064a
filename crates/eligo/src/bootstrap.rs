//! Builds runtime components from the merged configuration.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use eligo_config::{EligoConfig, Exhaustion};
use eligo_engine::{
    CacheConfig, ExhaustionPolicy, LookupEngine, PoolConfig, RetryPolicy, SiteProfile,
    WebDriverConfig, WebDriverFactory,
};
use eligo_store::SqliteRecordingStore;

// ─────────────────────────────────────────────────────────────────────────────
// Engine pieces
// ─────────────────────────────────────────────────────────────────────────────

pub fn pool_config(config: &EligoConfig) -> PoolConfig {
    let section = config.pool();
    PoolConfig::new()
        .with_capacity(section.capacity)
        .with_acquire_timeout(Duration::from_secs(section.acquire_timeout_secs))
}

pub fn retry_policy(config: &EligoConfig) -> RetryPolicy {
    let section = config.retry();
    let exhaustion = match section.exhaustion {
        Exhaustion::NotFound => ExhaustionPolicy::NotFound,
        Exhaustion::Distinct => ExhaustionPolicy::Distinct,
    };

    RetryPolicy::new()
        .with_max_attempts(section.max_attempts)
        .with_backoff(Duration::from_millis(section.backoff_ms))
        .with_backoff_multiplier(section.backoff_multiplier)
        .with_exhaustion(exhaustion)
}

/// A TTL of zero seconds means entries of that kind never expire.
pub fn cache_config(config: &EligoConfig) -> CacheConfig {
    let section = config.cache();
    let mut cache = CacheConfig::new().with_capacity(section.capacity);

    if section.positive_ttl_secs > 0 {
        cache = cache.with_positive_ttl(Duration::from_secs(section.positive_ttl_secs));
    }
    cache = if section.negative_ttl_secs > 0 {
        cache.with_negative_ttl(Duration::from_secs(section.negative_ttl_secs))
    } else {
        cache.without_negative_ttl()
    };

    if section.cleanup_interval_secs == 0 {
        cache.with_cleanup_task(false)
    } else {
        cache.with_cleanup_interval(Duration::from_secs(section.cleanup_interval_secs))
    }
}

pub fn webdriver_config(config: &EligoConfig) -> WebDriverConfig {
    let section = config.webdriver();
    let mut webdriver = WebDriverConfig::new(section.endpoint)
        .with_page_load_strategy(section.page_load_strategy)
        .with_request_timeout(Duration::from_secs(section.request_timeout_secs))
        .with_poll_interval(Duration::from_millis(section.poll_interval_ms));
    webdriver.browser_name = section.browser;

    if let Some(args) = section.args {
        webdriver = webdriver.with_browser_args(args);
    }
    if let Some(user_agent) = section.user_agent {
        // An empty string keeps the browser's own user agent.
        let user_agent = (!user_agent.is_empty()).then_some(user_agent);
        webdriver = webdriver.with_user_agent(user_agent);
    }
    webdriver
}

/// Unset fields keep the built-in profile.
pub fn site_profile(config: &EligoConfig) -> SiteProfile {
    let section = config.site();
    let mut site = SiteProfile::new()
        .with_interaction_timeout(Duration::from_secs(section.interaction_timeout_secs))
        .with_attempt_timeout(Duration::from_secs(section.attempt_timeout_secs));

    if let Some(url) = section.check_url {
        site = site.with_check_url(url);
    }
    if let Some(selector) = section.input_selector {
        site.input_selector = selector;
    }
    if let Some(selector) = section.result_selector {
        site.result_selector = selector;
    }
    if let Some(selector) = section.error_selector {
        site.error_selector = selector;
    }
    if let Some(marker) = section.success_marker {
        site.markers.success = marker;
    }
    if let Some(markers) = section.not_found_markers {
        site.markers.not_found = markers;
    }
    site
}

/// Build the lookup engine backed by a WebDriver server.
pub fn build_engine(config: &EligoConfig) -> Result<LookupEngine> {
    let webdriver = webdriver_config(config);
    let endpoint = webdriver.endpoint.clone();
    let factory = WebDriverFactory::new(webdriver)
        .with_context(|| format!("Invalid WebDriver endpoint: {}", endpoint))?;

    let engine = LookupEngine::builder()
        .with_factory(Arc::new(factory))
        .with_pool_config(pool_config(config))
        .with_retry_policy(retry_policy(config))
        .with_cache_config(cache_config(config))
        .with_site(site_profile(config))
        .build()?;
    Ok(engine)
}

// ─────────────────────────────────────────────────────────────────────────────
// Server pieces
// ─────────────────────────────────────────────────────────────────────────────

pub fn open_store(config: &EligoConfig) -> Result<SqliteRecordingStore> {
    let path = eligo_config::store_path(config);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    SqliteRecordingStore::open(&path)
        .with_context(|| format!("Failed to open recording store at {}", path.display()))
}

pub fn server_config(config: &EligoConfig) -> Result<eligo_server::ServerConfig> {
    let section = config.server();
    let ip: IpAddr = section
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address: {}", section.bind))?;

    Ok(eligo_server::ServerConfig::new()
        .with_bind_address(SocketAddr::new(ip, section.port))
        .with_rate_limiting(section.rate_limiting)
        .with_api_rpm(section.api_rpm)
        .with_request_logging(section.request_logging))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(toml: &str) -> EligoConfig {
        EligoConfig::from_toml(toml).unwrap()
    }

    #[test]
    fn test_defaults_match_engine_defaults() {
        let empty = EligoConfig::new();

        let pool = pool_config(&empty);
        assert_eq!(pool.capacity, 5);

        let retry = retry_policy(&empty);
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.exhaustion, ExhaustionPolicy::NotFound);

        let cache = cache_config(&empty);
        assert_eq!(cache.capacity, 100);
        assert!(cache.positive_ttl.is_none());
        assert_eq!(cache.negative_ttl, Some(Duration::from_secs(900)));

        let site = site_profile(&empty);
        assert_eq!(site.check_url, SiteProfile::default().check_url);
    }

    #[test]
    fn test_retry_mapping() {
        let config = config(
            r#"
[retry]
max_attempts = 5
backoff_ms = 200
backoff_multiplier = 2.0
exhaustion = "distinct"
"#,
        );

        let retry = retry_policy(&config);
        assert_eq!(retry.max_attempts, 5);
        assert_eq!(retry.backoff, Duration::from_millis(200));
        assert_eq!(retry.exhaustion, ExhaustionPolicy::Distinct);
    }

    #[test]
    fn test_zero_ttls_never_expire() {
        let config = config(
            r#"
[cache]
positive_ttl_secs = 0
negative_ttl_secs = 0
cleanup_interval_secs = 0
"#,
        );

        let cache = cache_config(&config);
        assert!(cache.positive_ttl.is_none());
        assert!(cache.negative_ttl.is_none());
        assert!(!cache.enable_cleanup_task);
    }

    #[test]
    fn test_site_overrides() {
        let config = config(
            r#"
[site]
check_url = "https://checker.test/form"
input_selector = "input#id"
success_marker = "Result Found"
not_found_markers = ["No match"]
"#,
        );

        let site = site_profile(&config);
        let default = SiteProfile::default();
        assert_eq!(site.check_url, "https://checker.test/form");
        assert_eq!(site.input_selector, "input#id");
        assert_eq!(site.result_selector, default.result_selector);
        assert_eq!(site.markers.success, "Result Found");
        assert_eq!(site.markers.not_found, vec!["No match".to_string()]);
    }

    #[test]
    fn test_webdriver_mapping() {
        let config = config(
            r#"
[webdriver]
endpoint = "http://grid:4444"
browser = "firefox"
args = ["-headless"]
user_agent = ""
"#,
        );

        let webdriver = webdriver_config(&config);
        assert_eq!(webdriver.endpoint, "http://grid:4444");
        assert_eq!(webdriver.browser_name, "firefox");
        assert_eq!(webdriver.browser_args, vec!["-headless".to_string()]);
        assert!(webdriver.user_agent.is_none());
    }

    #[test]
    fn test_server_config_mapping() {
        let config = config(
            r#"
[server]
port = 9090
bind = "0.0.0.0"
rate_limiting = false
"#,
        );

        let server = server_config(&config).unwrap();
        assert_eq!(server.bind_address, "0.0.0.0:9090".parse().unwrap());
        assert!(!server.rate_limiting);
    }

    #[test]
    fn test_server_config_rejects_bad_bind() {
        let config = config("[server]\nbind = \"localhost\"\n");
        assert!(server_config(&config).is_err());
    }

    #[test]
    fn test_open_store_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("recordings.db");
        let config = config(&format!("[store]\npath = {:?}\n", path.display().to_string()));

        open_store(&config).unwrap();
        assert!(path.exists());
    }
}
