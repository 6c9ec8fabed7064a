//! API routes.

pub mod health;
pub mod lookup;
pub mod openapi;
pub mod recordings;
pub mod status;

pub use health::{HealthResponse, health_routes};
pub use lookup::{LookupRequest, check_status_handler, normalize_scheme_id};
pub use openapi::{ApiDoc, swagger_ui};
pub use recordings::{SaveRecordingRequest, SaveRecordingResponse, save_transcription_handler};
pub use status::{StatusResponse, status_handler};
