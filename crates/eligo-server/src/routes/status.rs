//! Runtime status endpoint.

use axum::{Json, extract::State};
use eligo_engine::{CacheStats, PoolStats};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use crate::state::AppState;

/// Session pool counters.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PoolStatus {
    pub capacity: usize,
    pub idle: usize,
    pub leased: usize,
    /// Sessions created since start.
    pub created: u64,
    /// Sessions torn down since start.
    pub torn_down: u64,
    pub shut_down: bool,
}

/// Lookup cache counters.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CacheStatus {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    /// Lookups that shared another caller's computation.
    pub joined: u64,
    pub in_flight: usize,
}

/// Status response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub pool: PoolStatus,
    pub cache: CacheStatus,
    /// Stored recordings, absent if the store could not be read.
    pub recordings: Option<u64>,
}

impl PoolStatus {
    fn from_stats(stats: PoolStats, shut_down: bool) -> Self {
        Self {
            capacity: stats.capacity,
            idle: stats.idle,
            leased: stats.leased,
            created: stats.created,
            torn_down: stats.torn_down,
            shut_down,
        }
    }
}

impl From<CacheStats> for CacheStatus {
    fn from(stats: CacheStats) -> Self {
        Self {
            size: stats.size,
            capacity: stats.capacity,
            hits: stats.hits,
            misses: stats.misses,
            joined: stats.joined,
            in_flight: stats.in_flight,
        }
    }
}

/// GET /status - Pool, cache and store counters.
#[utoipa::path(
    get,
    path = "/status",
    responses(
        (status = 200, description = "Current counters", body = StatusResponse),
    ),
    tag = "health"
)]
pub async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    let engine = &state.engine;

    let recordings = match state.store.count() {
        Ok(count) => Some(count),
        Err(e) => {
            warn!(error = %e, "Failed to count recordings");
            None
        }
    };

    Json(StatusResponse {
        pool: PoolStatus::from_stats(engine.pool_stats(), engine.is_shut_down()),
        cache: engine.cache_stats().into(),
        recordings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        routing::get,
    };
    use eligo_engine::testing::{MockPage, MockSessionFactory};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_status_reports_counters() {
        let factory = MockSessionFactory::new()
            .with_default_page(MockPage::result("Eligibility Details\nEligibility: Yes"));
        let state = AppState::for_tests(factory, ServerConfig::new());
        state.engine.lookup("123").await;
        state.engine.lookup("123").await;

        let app = Router::new()
            .route("/status", get(status_handler))
            .with_state(state);
        let response = app
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let status: StatusResponse = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(status.pool.created, 1);
        assert_eq!(status.pool.idle, 1);
        assert!(!status.pool.shut_down);
        assert_eq!(status.cache.size, 1);
        assert_eq!(status.cache.hits, 1);
        assert_eq!(status.cache.misses, 1);
        assert_eq!(status.recordings, Some(0));
    }
}
