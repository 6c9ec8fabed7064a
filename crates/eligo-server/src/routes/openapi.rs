//! OpenAPI documentation configuration.

use eligo_engine::{EligibilityRecord, ErrorCode, LookupResponse};
use eligo_store::Recording;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::{health, lookup, recordings, status};
use crate::error::ErrorResponse;

/// Path of the generated OpenAPI document.
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// Path of the Swagger UI.
pub const SWAGGER_UI_PATH: &str = "/swagger-ui";

/// OpenAPI documentation for the Eligo API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Eligo API",
        description = "Scheme eligibility lookups and transcription storage",
        license(name = "MIT"),
    ),
    servers(
        (url = "/", description = "Local server"),
    ),
    paths(
        health::health,
        status::status_handler,
        lookup::check_status_handler,
        recordings::save_transcription_handler,
    ),
    components(
        schemas(
            ErrorResponse,
            health::HealthResponse,
            status::StatusResponse,
            status::PoolStatus,
            status::CacheStatus,
            lookup::LookupRequest,
            LookupResponse,
            EligibilityRecord,
            ErrorCode,
            recordings::SaveRecordingRequest,
            recordings::SaveRecordingResponse,
            Recording,
        )
    ),
    tags(
        (name = "health", description = "Liveness and runtime counters"),
        (name = "lookup", description = "Eligibility lookups"),
        (name = "recordings", description = "Transcription storage"),
    )
)]
pub struct ApiDoc;

/// Create the Swagger UI router, which also serves the OpenAPI document.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new(SWAGGER_UI_PATH).url(OPENAPI_PATH, ApiDoc::openapi())
}
