//! Eligibility lookup endpoint.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use eligo_engine::LookupResponse;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::error::{ErrorResponse, Result, ServerError};
use crate::state::AppState;

/// Request to check one scheme identifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LookupRequest {
    /// Scheme identifier, alphanumeric once trimmed.
    #[serde(default)]
    pub scheme_id: Option<String>,
}

/// Trim and validate an identifier before it reaches the engine.
///
/// The engine caches by exact key, so every caller goes through here.
pub fn normalize_scheme_id(raw: Option<&str>) -> Result<String> {
    let id = raw.map(str::trim).unwrap_or_default();

    if id.is_empty() {
        return Err(ServerError::BadRequest("Scheme ID is required".to_string()));
    }
    if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ServerError::BadRequest(
            "Scheme ID must be alphanumeric".to_string(),
        ));
    }

    Ok(id.to_string())
}

/// POST /check_status - Look up eligibility for a scheme identifier.
///
/// Lookup failures are answered with 200 and an `error` status body.
#[utoipa::path(
    post,
    path = "/check_status",
    request_body = LookupRequest,
    responses(
        (status = 200, description = "Lookup answered", body = LookupResponse),
        (status = 400, description = "Missing or malformed scheme ID", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = ErrorResponse),
    ),
    tag = "lookup"
)]
pub async fn check_status_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LookupRequest>, JsonRejection>,
) -> Result<Json<LookupResponse>> {
    let Json(request) = payload.map_err(|rejection| {
        debug!(error = %rejection, "Rejected lookup body");
        ServerError::invalid_json()
    })?;
    let scheme_id = normalize_scheme_id(request.scheme_id.as_deref())?;

    let response = state.engine.lookup(&scheme_id).await;

    match response.code() {
        None => info!(scheme_id = %scheme_id, "Lookup succeeded"),
        Some(code) => info!(scheme_id = %scheme_id, code = %code, "Lookup answered with error"),
    }

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header},
        routing::post,
    };
    use eligo_engine::ErrorCode;
    use eligo_engine::testing::{MockPage, MockSessionFactory};
    use tower::ServiceExt;

    const RECORD: &str = "Eligibility Details\nEligibility: Yes\nScheme Id: 12345\n";

    fn router(factory: MockSessionFactory) -> Router {
        let state = AppState::for_tests(factory, ServerConfig::new().with_rate_limiting(false));
        Router::new()
            .route("/check_status", post(check_status_handler))
            .with_state(state)
    }

    async fn post_json(app: Router, body: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/check_status")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_normalize_trims() {
        assert_eq!(normalize_scheme_id(Some("  ab12 ")).unwrap(), "ab12");
    }

    #[test]
    fn test_normalize_rejects() {
        for raw in [None, Some(""), Some("   "), Some("12-34"), Some("12 34"), Some("ü1")] {
            assert!(
                matches!(normalize_scheme_id(raw), Err(ServerError::BadRequest(_))),
                "accepted {raw:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_check_status_success() {
        let factory = MockSessionFactory::new().with_page("12345", MockPage::result(RECORD));

        let (status, body) = post_json(router(factory.clone()), r#"{"scheme_id": " 12345 "}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["eligibility"], "Yes");
        assert_eq!(body["data"]["schemeId"], "12345");
        assert!(body["data"]["doctorNumber"].is_null());
        assert_eq!(factory.submissions(), vec!["12345".to_string()]);
    }

    #[tokio::test]
    async fn test_check_status_not_found_is_ok() {
        let factory = MockSessionFactory::new().with_default_page(MockPage::error("Record not found"));

        let (status, body) = post_json(router(factory), r#"{"scheme_id": "999"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "error");
        assert_eq!(body["code"], ErrorCode::PatientNotFound.as_str());
    }

    #[tokio::test]
    async fn test_check_status_missing_id() {
        let factory = MockSessionFactory::new();

        let (status, body) = post_json(router(factory.clone()), "{}").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Scheme ID is required");
        assert_eq!(factory.created(), 0);
    }

    #[tokio::test]
    async fn test_check_status_rejects_non_alphanumeric() {
        let factory = MockSessionFactory::new();

        let (status, body) = post_json(router(factory.clone()), r#"{"scheme_id": "1; DROP"}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "bad_request");
        assert!(factory.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_check_status_invalid_json() {
        let (status, body) = post_json(router(MockSessionFactory::new()), "{not json").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid JSON");
    }
}
