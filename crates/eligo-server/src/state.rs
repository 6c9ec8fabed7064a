//! Application state shared across handlers.

use std::sync::Arc;

use eligo_engine::LookupEngine;
use eligo_store::RecordingStore;

use crate::config::ServerConfig;
use crate::ratelimit::{SharedRateLimiter, create_rate_limiter};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The lookup engine.
    pub engine: LookupEngine,

    /// Recording persistence.
    pub store: Arc<dyn RecordingStore>,

    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// Global limiter, present when rate limiting is enabled.
    pub limiter: Option<SharedRateLimiter>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(engine: LookupEngine, store: Arc<dyn RecordingStore>, config: ServerConfig) -> Self {
        let limiter = config
            .rate_limiting
            .then(|| create_rate_limiter(config.api_rpm));

        Self {
            engine,
            store,
            config: Arc::new(config),
            limiter,
        }
    }
}

#[cfg(test)]
impl AppState {
    /// State backed by a scripted session factory and an in-memory store.
    pub(crate) fn for_tests(
        factory: eligo_engine::testing::MockSessionFactory,
        config: ServerConfig,
    ) -> Self {
        use std::time::Duration;

        use eligo_engine::RetryPolicy;
        use eligo_store::SqliteRecordingStore;

        let engine = LookupEngine::builder()
            .with_factory(Arc::new(factory))
            .with_retry_policy(RetryPolicy::new().with_backoff(Duration::from_millis(1)))
            .build()
            .unwrap();
        let store = Arc::new(SqliteRecordingStore::open_in_memory().unwrap());

        Self::new(engine, store, config)
    }
}
