//! The lookup engine: cache in front of retried, pooled lookups.

use std::sync::Arc;

use eligo_cache::{CacheConfig, CacheStats, LookupCache};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{EngineError, Fault, PoolError};
use crate::outcome::{ErrorCode, LookupOutcome, LookupResponse};
use crate::parser::parse;
use crate::pool::{PoolConfig, PoolStats, SessionPool};
use crate::retry::{RetryOrchestrator, RetryPolicy};
use crate::session::SessionFactory;
use crate::site::SiteProfile;

/// A lookup result that must not be remembered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupFailure {
    pub code: ErrorCode,
    pub title: String,
    pub message: String,
}

impl LookupFailure {
    /// The remote's own wording stays in the log; callers get a fixed text.
    fn unrecognised() -> Self {
        Self {
            code: ErrorCode::SystemError,
            title: "Lookup failed".to_string(),
            message: "The eligibility service returned an unexpected error.".to_string(),
        }
    }

    pub fn into_response(self) -> LookupResponse {
        LookupResponse::error(self.code, self.title, self.message)
    }
}

/// Resolves identifiers into eligibility responses.
///
/// Cloning is cheap; clones share the pool and the cache.
#[derive(Clone)]
pub struct LookupEngine {
    pool: Arc<SessionPool>,
    cache: LookupCache<LookupResponse, LookupFailure>,
    retry: RetryOrchestrator,
    site: Arc<SiteProfile>,
}

impl LookupEngine {
    pub fn builder() -> LookupEngineBuilder {
        LookupEngineBuilder::default()
    }

    /// Look up one identifier.
    ///
    /// Answers from the cache when possible. Concurrent lookups of the same
    /// identifier share a single remote interaction.
    pub async fn lookup(&self, identifier: &str) -> LookupResponse {
        let engine = self.clone();
        let key = identifier.to_string();

        let result = self
            .cache
            .get_or_compute(identifier, move || async move { engine.resolve(&key).await })
            .await;

        match result {
            Ok(response) => response,
            Err(failure) => failure.into_response(),
        }
    }

    /// Run the retried lookup and decide whether the answer may be cached.
    async fn resolve(&self, identifier: &str) -> Result<LookupResponse, LookupFailure> {
        let outcome = self
            .retry
            .run(identifier, move |number| self.attempt(identifier, number))
            .await;

        match outcome {
            LookupOutcome::Success { raw_text } => {
                info!(identifier, "Eligibility record found");
                Ok(LookupResponse::Success {
                    data: parse(&raw_text),
                })
            }
            LookupOutcome::KnownError {
                code: ErrorCode::PatientNotFound,
                title,
                message,
            } => {
                info!(identifier, "No eligibility record");
                Ok(LookupResponse::error(ErrorCode::PatientNotFound, title, message))
            }
            LookupOutcome::KnownError {
                code,
                title,
                message,
            } => {
                warn!(identifier, code = %code, "Lookup gave no answer");
                Err(LookupFailure {
                    code,
                    title,
                    message,
                })
            }
            LookupOutcome::UnknownError { message } => {
                error!(identifier, message = %message, "Remote reported an unrecognised error");
                Err(LookupFailure::unrecognised())
            }
        }
    }

    /// One attempt: lease a session, drive the page, settle the lease.
    async fn attempt(&self, identifier: &str, number: u32) -> Result<LookupOutcome, Fault> {
        let mut lease = self.pool.acquire().await?;
        debug!(identifier, attempt = number, session_id = %lease.id(), "Starting lookup attempt");

        let Some(handle) = lease.handle() else {
            return Err(Fault::Unavailable(PoolError::Unavailable(
                "lease settled before use".to_string(),
            )));
        };

        let limit = self.site.attempt_timeout;
        let result = tokio::time::timeout(limit, self.site.interact(handle, identifier)).await;

        match result {
            Ok(Ok(outcome)) => {
                lease.release().await;
                Ok(outcome)
            }
            Ok(Err(e)) => {
                lease.discard().await;
                Err(Fault::Interaction(e))
            }
            Err(_) => {
                lease.discard().await;
                Err(Fault::Timeout(limit))
            }
        }
    }

    /// Forget a cached answer. Returns true if one was stored.
    pub fn invalidate(&self, identifier: &str) -> bool {
        self.cache.invalidate(identifier)
    }

    /// Start periodic removal of expired cache entries, if configured.
    pub fn spawn_maintenance(&self) -> Option<JoinHandle<()>> {
        self.cache.spawn_cleanup_task()
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn site(&self) -> &SiteProfile {
        &self.site
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        self.retry.policy()
    }

    /// Close every pooled session. Lookups after this answer SYSTEM_ERROR
    /// without touching the cache.
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }

    pub fn is_shut_down(&self) -> bool {
        self.pool.is_shut_down()
    }
}

/// Builder for [`LookupEngine`].
#[derive(Default)]
pub struct LookupEngineBuilder {
    factory: Option<Arc<dyn SessionFactory>>,
    pool: PoolConfig,
    retry: RetryPolicy,
    cache: CacheConfig,
    site: SiteProfile,
}

impl LookupEngineBuilder {
    /// Set the backend that creates sessions. Required.
    pub fn with_factory(mut self, factory: Arc<dyn SessionFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn with_pool_config(mut self, config: PoolConfig) -> Self {
        self.pool = config;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn with_cache_config(mut self, config: CacheConfig) -> Self {
        self.cache = config;
        self
    }

    pub fn with_site(mut self, site: SiteProfile) -> Self {
        self.site = site;
        self
    }

    pub fn build(self) -> Result<LookupEngine, EngineError> {
        let factory = self.factory.ok_or(EngineError::MissingFactory)?;
        if self.site.check_url.trim().is_empty() {
            return Err(EngineError::Config("site check URL is empty".to_string()));
        }

        info!(
            backend = factory.name(),
            pool_capacity = self.pool.capacity,
            max_attempts = self.retry.max_attempts,
            cache_capacity = self.cache.capacity,
            "Lookup engine ready"
        );

        Ok(LookupEngine {
            pool: SessionPool::new(factory, self.pool),
            cache: LookupCache::new(self.cache),
            retry: RetryOrchestrator::new(self.retry),
            site: Arc::new(self.site),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::ExhaustionPolicy;
    use crate::testing::{MockPage, MockSessionFactory};
    use std::time::Duration;

    const RECORD: &str = "Eligibility Details\nEligibility: Yes\nScheme Id: 12345\nDoctor Number: D1\n";

    fn engine_with(factory: &MockSessionFactory, retry: RetryPolicy) -> LookupEngine {
        LookupEngine::builder()
            .with_factory(Arc::new(factory.clone()))
            .with_pool_config(
                PoolConfig::new()
                    .with_capacity(2)
                    .with_acquire_timeout(Duration::from_millis(200)),
            )
            .with_retry_policy(retry.with_backoff(Duration::from_millis(1)))
            .build()
            .unwrap()
    }

    fn engine(factory: &MockSessionFactory) -> LookupEngine {
        engine_with(factory, RetryPolicy::new())
    }

    #[tokio::test]
    async fn test_lookup_success_parses_record() {
        let factory = MockSessionFactory::new().with_page("12345", MockPage::result(RECORD));
        let engine = engine(&factory);

        let response = engine.lookup("12345").await;

        let LookupResponse::Success { data } = response else {
            panic!("expected success, got {response:?}");
        };
        assert_eq!(data.eligibility.as_deref(), Some("Yes"));
        assert_eq!(data.scheme_id.as_deref(), Some("12345"));
        assert_eq!(data.doctor_number.as_deref(), Some("D1"));
        assert_eq!(data.scheme_type, None);

        let stats = engine.pool_stats();
        assert_eq!(stats.idle, 1);
        assert_eq!(stats.leased, 0);
    }

    #[tokio::test]
    async fn test_second_lookup_served_from_cache() {
        let factory = MockSessionFactory::new().with_page("12345", MockPage::result(RECORD));
        let engine = engine(&factory);

        let first = engine.lookup("12345").await;
        let second = engine.lookup("12345").await;

        assert_eq!(first, second);
        assert_eq!(factory.submissions_for("12345"), 1);
        assert_eq!(engine.cache_stats().hits, 1);
    }

    #[tokio::test]
    async fn test_missing_marker_is_not_found_and_cached() {
        let factory = MockSessionFactory::new()
            .with_page("12345", MockPage::result("Eligibility: Yes\nScheme Id: 12345"));
        let engine = engine(&factory);

        let response = engine.lookup("12345").await;
        assert_eq!(response.code(), Some(ErrorCode::PatientNotFound));

        engine.lookup("12345").await;
        assert_eq!(factory.submissions_for("12345"), 1);
    }

    #[tokio::test]
    async fn test_retries_through_faults() {
        let factory = MockSessionFactory::new().with_pages(
            "12345",
            vec![
                MockPage::fault("stale element"),
                MockPage::fault("stale element"),
                MockPage::result(RECORD),
            ],
        );
        let engine = engine(&factory);

        let response = engine.lookup("12345").await;

        assert!(response.is_success());
        assert_eq!(factory.submissions_for("12345"), 3);
        // Faulted sessions are discarded, not reused.
        assert_eq!(factory.closed(), 2);
        assert_eq!(engine.pool_stats().torn_down, 2);
    }

    #[tokio::test]
    async fn test_exhaustion_defaults_to_not_found() {
        let factory =
            MockSessionFactory::new().with_page("12345", MockPage::fault("connection reset"));
        let engine = engine(&factory);

        let response = engine.lookup("12345").await;

        assert_eq!(response.code(), Some(ErrorCode::PatientNotFound));
        assert_eq!(factory.submissions_for("12345"), 3);
        assert_eq!(engine.pool_stats().leased, 0);

        let again = engine.lookup("12345").await;
        assert_eq!(again, response);
        assert_eq!(factory.submissions_for("12345"), 3);
        assert_eq!(engine.cache_stats().size, 1);
    }

    #[tokio::test]
    async fn test_exhaustion_answer_expires_with_negative_ttl() {
        let factory =
            MockSessionFactory::new().with_page("12345", MockPage::fault("connection reset"));
        let engine = LookupEngine::builder()
            .with_factory(Arc::new(factory.clone()))
            .with_retry_policy(RetryPolicy::new().with_backoff(Duration::from_millis(1)))
            .with_cache_config(CacheConfig::new().with_negative_ttl(Duration::from_millis(50)))
            .build()
            .unwrap();

        engine.lookup("12345").await;
        engine.lookup("12345").await;
        assert_eq!(factory.submissions_for("12345"), 3);

        tokio::time::sleep(Duration::from_millis(100)).await;

        let response = engine.lookup("12345").await;
        assert_eq!(response.code(), Some(ErrorCode::PatientNotFound));
        assert_eq!(factory.submissions_for("12345"), 6);
    }

    #[tokio::test]
    async fn test_busy_pool_is_uncached_system_error() {
        let factory = MockSessionFactory::new()
            .with_page("AAA", MockPage::Stall)
            .with_page("BBB", MockPage::result(RECORD));
        let engine = LookupEngine::builder()
            .with_factory(Arc::new(factory.clone()))
            .with_pool_config(
                PoolConfig::new()
                    .with_capacity(1)
                    .with_acquire_timeout(Duration::from_millis(50)),
            )
            .with_retry_policy(RetryPolicy::new().with_max_attempts(1))
            .with_site(
                SiteProfile::default()
                    .with_interaction_timeout(Duration::from_secs(60))
                    .with_attempt_timeout(Duration::from_millis(300)),
            )
            .build()
            .unwrap();

        let stalled = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.lookup("AAA").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(engine.pool_stats().leased, 1);

        let busy = engine.lookup("BBB").await;
        assert_eq!(busy.code(), Some(ErrorCode::SystemError));
        assert_eq!(factory.submissions_for("BBB"), 0);
        assert_eq!(engine.cache_stats().size, 0);

        stalled.await.unwrap();

        let response = engine.lookup("BBB").await;
        assert!(response.is_success(), "got {response:?}");
        assert_eq!(factory.submissions_for("BBB"), 1);
    }

    #[tokio::test]
    async fn test_lookup_after_shutdown_is_uncached_system_error() {
        let factory = MockSessionFactory::new().with_page("12345", MockPage::result(RECORD));
        let engine = engine(&factory);

        engine.shutdown().await;

        let response = engine.lookup("12345").await;
        assert_eq!(response.code(), Some(ErrorCode::SystemError));
        assert_eq!(engine.cache_stats().size, 0);
        assert_eq!(factory.created(), 0);
    }

    #[tokio::test]
    async fn test_distinct_exhaustion_not_cached() {
        let factory =
            MockSessionFactory::new().with_page("12345", MockPage::fault("connection reset"));
        let engine = engine_with(
            &factory,
            RetryPolicy::new().with_exhaustion(ExhaustionPolicy::Distinct),
        );

        let response = engine.lookup("12345").await;
        assert_eq!(response.code(), Some(ErrorCode::NoResponse));

        engine.lookup("12345").await;
        assert_eq!(factory.submissions_for("12345"), 6);
        assert_eq!(engine.cache_stats().size, 0);
    }

    #[tokio::test]
    async fn test_distinct_exhaustion_without_sessions_is_system_error() {
        let factory = MockSessionFactory::new().with_create_failures(usize::MAX);
        let engine = engine_with(
            &factory,
            RetryPolicy::new().with_exhaustion(ExhaustionPolicy::Distinct),
        );

        let response = engine.lookup("12345").await;

        assert_eq!(response.code(), Some(ErrorCode::SystemError));
        assert!(factory.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_error_not_retried_or_cached() {
        let factory = MockSessionFactory::new()
            .with_page("12345", MockPage::error("Service temporarily unavailable"));
        let engine = engine(&factory);

        let response = engine.lookup("12345").await;
        match &response {
            LookupResponse::Error { code, message, .. } => {
                assert_eq!(*code, ErrorCode::SystemError);
                assert_eq!(message, "The eligibility service returned an unexpected error.");
                assert!(!message.contains("temporarily"));
            }
            other => panic!("expected error, got {other:?}"),
        }
        assert_eq!(factory.submissions_for("12345"), 1);

        engine.lookup("12345").await;
        assert_eq!(factory.submissions_for("12345"), 2);
    }

    #[tokio::test]
    async fn test_concurrent_lookups_share_one_interaction() {
        let factory = MockSessionFactory::new()
            .with_page("12345", MockPage::result(RECORD))
            .with_submit_delay(Duration::from_millis(50));
        let engine = engine(&factory);

        let mut tasks = Vec::new();
        for _ in 0..10 {
            let engine = engine.clone();
            tasks.push(tokio::spawn(async move { engine.lookup("12345").await }));
        }
        for task in tasks {
            assert!(task.await.unwrap().is_success());
        }

        assert_eq!(factory.submissions_for("12345"), 1);
        assert_eq!(factory.created(), 1);
    }

    #[tokio::test]
    async fn test_attempt_timeout_discards_session() {
        let factory = MockSessionFactory::new().with_page("12345", MockPage::Stall);
        let engine = LookupEngine::builder()
            .with_factory(Arc::new(factory.clone()))
            .with_retry_policy(
                RetryPolicy::new()
                    .with_max_attempts(2)
                    .with_backoff(Duration::from_millis(1)),
            )
            .with_site(
                SiteProfile::default()
                    .with_interaction_timeout(Duration::from_secs(60))
                    .with_attempt_timeout(Duration::from_millis(20)),
            )
            .build()
            .unwrap();

        let response = engine.lookup("12345").await;

        assert_eq!(response.code(), Some(ErrorCode::PatientNotFound));
        assert_eq!(factory.submissions_for("12345"), 2);
        assert_eq!(factory.closed(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_lookup_frees_session() {
        let factory = MockSessionFactory::new()
            .with_page("12345", MockPage::result(RECORD))
            .with_submit_delay(Duration::from_secs(60));
        let engine = engine(&factory);

        let task = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.lookup("12345").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(engine.pool_stats().leased, 1);

        task.abort();
        let _ = task.await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        let stats = engine.pool_stats();
        assert_eq!(stats.leased, 0);
        assert_eq!(stats.torn_down, 1);
        assert_eq!(factory.live(), 0);
        assert_eq!(engine.cache_stats().in_flight, 0);
    }

    #[tokio::test]
    async fn test_invalidate_forces_fresh_lookup() {
        let factory = MockSessionFactory::new().with_page("12345", MockPage::result(RECORD));
        let engine = engine(&factory);

        engine.lookup("12345").await;
        assert!(engine.invalidate("12345"));
        engine.lookup("12345").await;

        assert_eq!(factory.submissions_for("12345"), 2);
    }

    #[test]
    fn test_builder_requires_factory() {
        let result = LookupEngine::builder().build();
        assert!(matches!(result, Err(EngineError::MissingFactory)));
    }
}
