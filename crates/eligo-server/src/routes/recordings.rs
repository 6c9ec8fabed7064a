//! Recording (transcription) persistence endpoint.

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use eligo_store::Recording;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::error::{ErrorResponse, Result, ServerError};
use crate::state::AppState;

const REQUIRED_FIELDS: [&str; 4] = ["transcribeId", "doctorId", "duration", "transcribe"];

/// Body accepted by `POST /save/transcribe`.
///
/// Text fields also accept numbers and booleans, which are stored as text.
/// `duration` also accepts a string holding an integer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveRecordingRequest {
    pub transcribe_id: String,
    pub doctor_id: String,
    /// Length of the recording in seconds.
    pub duration: i64,
    pub transcribe: String,
    pub notes: Option<String>,
}

/// Response to a successful save.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SaveRecordingResponse {
    /// Always `success`.
    pub status: String,
    pub message: String,
    /// The record as stored, including its server-side timestamp.
    pub data: Recording,
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────────────────

fn text_field(body: &Map<String, Value>, field: &str) -> Result<Option<String>> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(_) => Err(ServerError::BadRequest(format!(
            "Data type error: {} must be a string",
            field
        ))),
    }
}

fn missing_field(field: &str) -> ServerError {
    ServerError::BadRequest(format!("Missing required field: {}", field))
}

fn required_text(body: &Map<String, Value>, field: &str) -> Result<String> {
    text_field(body, field)?.ok_or_else(|| missing_field(field))
}

fn duration_field(value: &Value) -> Result<i64> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        ServerError::BadRequest("Data type error: duration must be an integer".to_string())
    })
}

/// Build a recording from a request body, stamping it with the current time.
pub fn recording_from_body(body: &Value) -> Result<Recording> {
    let Value::Object(body) = body else {
        return Err(ServerError::BadRequest(
            "Request body must be a JSON object".to_string(),
        ));
    };

    // Presence is checked for every field before any type is.
    if let Some(field) = REQUIRED_FIELDS
        .iter()
        .find(|field| matches!(body.get(**field), None | Some(Value::Null)))
    {
        return Err(missing_field(field));
    }

    let transcribe_id = required_text(body, "transcribeId")?;
    let doctor_id = required_text(body, "doctorId")?;
    let duration = duration_field(&body["duration"])?;
    let transcribe = required_text(body, "transcribe")?;

    let mut recording = Recording::new(transcribe_id, doctor_id, duration, transcribe);
    if let Some(notes) = text_field(body, "notes")? {
        recording = recording.with_notes(notes);
    }
    Ok(recording)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /save/transcribe - Store a transcription.
#[utoipa::path(
    post,
    path = "/save/transcribe",
    request_body = SaveRecordingRequest,
    responses(
        (status = 200, description = "Transcription saved", body = SaveRecordingResponse),
        (status = 400, description = "Missing field or bad value", body = ErrorResponse),
        (status = 403, description = "Store not writable", body = ErrorResponse),
        (status = 429, description = "Store busy or rate limit exceeded", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse),
    ),
    tag = "recordings"
)]
pub async fn save_transcription_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<SaveRecordingResponse>> {
    let Json(body) = payload.map_err(|rejection| {
        debug!(error = %rejection, "Rejected recording body");
        ServerError::invalid_json()
    })?;
    let recording = recording_from_body(&body)?;

    let store = Arc::clone(&state.store);
    let stored = recording.clone();
    tokio::task::spawn_blocking(move || store.put(&stored.transcribe_id, &stored))
        .await
        .map_err(|e| ServerError::Internal(format!("store task failed: {}", e)))??;

    info!(
        transcribe_id = %recording.transcribe_id,
        doctor_id = %recording.doctor_id,
        duration = recording.duration,
        "Transcription saved"
    );

    Ok(Json(SaveRecordingResponse {
        status: "success".to_string(),
        message: "Transcription saved successfully".to_string(),
        data: recording,
    }))
}
