//! Server integration tests.
//!
//! A real listener in front of the engine (scripted browser backend) and an
//! on-disk recording store.

mod common;

use std::time::Duration;

use anyhow::Result;
use futures::future::join_all;

use eligo_engine::testing::{MockPage, MockSessionFactory};
use eligo_server::ServerConfig;
use eligo_store::{RecordingStore, SqliteRecordingStore};
use serde_json::{Value, json};

const RECORD: &str = "Eligibility Details
Eligibility: Yes
Scheme Id: 12345
Scheme Type: GMS
Doctor Number: D1";

#[tokio::test]
async fn test_health_reports_service() -> Result<()> {
    let server = common::TestServer::start().await?;

    let body: Value = server.get("/health").send().await?.json().await?;

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "online");
    assert!(body.get("version").is_some());
    Ok(())
}

#[tokio::test]
async fn test_lookup_success_then_cached() -> Result<()> {
    let factory = MockSessionFactory::new().with_page("12345", MockPage::result(RECORD));
    let server = common::TestServer::start_with_factory(factory).await?;

    for _ in 0..2 {
        let resp = server
            .post("/check_status")
            .json(&json!({ "scheme_id": "12345" }))
            .send()
            .await?;
        assert_eq!(resp.status().as_u16(), 200);

        let body: Value = resp.json().await?;
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["schemeType"], "GMS");
        assert_eq!(body["data"]["doctorNumber"], "D1");
        assert!(body["data"]["dateOfBirth"].is_null());
    }

    assert_eq!(server.factory.submissions_for("12345"), 1);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_lookups_share_one_interaction() -> Result<()> {
    let factory = MockSessionFactory::new()
        .with_page("777", MockPage::result(RECORD))
        .with_submit_delay(Duration::from_millis(100));
    let server = common::TestServer::start_with_factory(factory).await?;

    let requests = (0..5).map(|_| {
        server
            .post("/check_status")
            .json(&json!({ "scheme_id": "777" }))
            .send()
    });
    let responses = join_all(requests).await;

    for resp in responses {
        let body: Value = resp?.json().await?;
        assert_eq!(body["status"], "success");
    }
    assert_eq!(server.factory.submissions_for("777"), 1);
    Ok(())
}

#[tokio::test]
async fn test_lookup_not_found() -> Result<()> {
    let factory =
        MockSessionFactory::new().with_default_page(MockPage::error("Invalid scheme number"));
    let server = common::TestServer::start_with_factory(factory).await?;

    let body: Value = server
        .post("/check_status")
        .json(&json!({ "scheme_id": "000" }))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], "PATIENT_NOT_FOUND");
    assert_eq!(body["title"], "Patient not found");
    Ok(())
}

#[tokio::test]
async fn test_lookup_faults_exhaust_to_not_found() -> Result<()> {
    let factory = MockSessionFactory::new().with_default_page(MockPage::fault("tab crashed"));
    let server = common::TestServer::start_with_factory(factory).await?;

    let body: Value = server
        .post("/check_status")
        .json(&json!({ "scheme_id": "42" }))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(body["code"], "PATIENT_NOT_FOUND");
    assert_eq!(server.factory.submissions_for("42"), 3);
    assert!(!body.to_string().contains("tab crashed"));
    Ok(())
}

#[tokio::test]
async fn test_lookup_validation() -> Result<()> {
    let server = common::TestServer::start().await?;

    let resp = server
        .post("/check_status")
        .json(&json!({ "scheme_id": "  " }))
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await?;
    assert_eq!(body["message"], "Scheme ID is required");

    let resp = server
        .post("/check_status")
        .header("content-type", "application/json")
        .body("{oops")
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 400);

    assert_eq!(server.factory.created(), 0);
    Ok(())
}

#[tokio::test]
async fn test_save_transcription_round_trip() -> Result<()> {
    let server = common::TestServer::start().await?;

    let resp = server
        .post("/save/transcribe")
        .json(&json!({
            "transcribeId": "rec-1",
            "doctorId": "doc-9",
            "duration": "61",
            "transcribe": "Follow-up visit."
        }))
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 200);

    let body: Value = resp.json().await?;
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["duration"], 61);

    let store = SqliteRecordingStore::open(server.temp_dir.path().join("recordings.db"))?;
    let saved = store.get("rec-1")?.expect("recording stored");
    assert_eq!(saved.doctor_id, "doc-9");
    assert_eq!(saved.transcribe, "Follow-up visit.");
    Ok(())
}

#[tokio::test]
async fn test_save_transcription_validation() -> Result<()> {
    let server = common::TestServer::start().await?;

    let resp = server
        .post("/save/transcribe")
        .json(&json!({ "transcribeId": "rec-2", "doctorId": "doc-9", "transcribe": "x" }))
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await?;
    assert_eq!(body["code"], "bad_request");
    assert_eq!(body["message"], "Missing required field: duration");

    let resp = server
        .post("/save/transcribe")
        .json(&json!({
            "transcribeId": "rec-2",
            "doctorId": "doc-9",
            "duration": "long",
            "transcribe": "x"
        }))
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 400);
    Ok(())
}

#[tokio::test]
async fn test_status_reflects_activity() -> Result<()> {
    let factory = MockSessionFactory::new().with_default_page(MockPage::result(RECORD));
    let server = common::TestServer::start_with_factory(factory).await?;

    server
        .post("/check_status")
        .json(&json!({ "scheme_id": "1" }))
        .send()
        .await?;

    let body: Value = server.get("/status").send().await?.json().await?;
    assert_eq!(body["pool"]["capacity"], 5);
    assert_eq!(body["pool"]["created"], 1);
    assert_eq!(body["cache"]["size"], 1);
    assert_eq!(body["recordings"], 0);
    Ok(())
}

#[tokio::test]
async fn test_rate_limit_enforced() -> Result<()> {
    let config = ServerConfig::new().with_rate_limiting(true).with_api_rpm(2);
    let server = common::TestServer::start_with(MockSessionFactory::new(), config).await?;

    let mut limited = 0;
    for _ in 0..3 {
        let resp = server.get("/health").send().await?;
        if resp.status().as_u16() == 429 {
            limited += 1;
            let body: Value = resp.json().await?;
            assert_eq!(body["code"], "rate_limit_exceeded");
        }
    }

    assert!(limited >= 1);
    Ok(())
}

#[tokio::test]
async fn test_openapi_document() -> Result<()> {
    let server = common::TestServer::start().await?;

    let doc: Value = server.get("/api-docs/openapi.json").send().await?.json().await?;

    assert!(doc["paths"].get("/check_status").is_some());
    assert!(doc["paths"].get("/save/transcribe").is_some());
    Ok(())
}

#[tokio::test]
async fn test_shutdown_engine_still_answers() -> Result<()> {
    let factory = MockSessionFactory::new().with_default_page(MockPage::result(RECORD));
    let server = common::TestServer::start_with_factory(factory).await?;

    server.engine.shutdown().await;

    let body: Value = server
        .post("/check_status")
        .json(&json!({ "scheme_id": "5" }))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(body["status"], "error");
    assert_eq!(server.factory.created(), 0);
    Ok(())
}
