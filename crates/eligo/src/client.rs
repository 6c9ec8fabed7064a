//! HTTP client for talking to a running Eligo server.

use anyhow::Result;
use eligo_engine::LookupResponse;
use eligo_server::{HealthResponse, StatusResponse};
use serde_json::json;
use url::Url;

/// Thin wrapper over the server's REST API.
pub struct Client {
    base_url: Url,
    http: reqwest::Client,
}

impl Client {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;

        Ok(Self {
            base_url,
            http: reqwest::Client::new(),
        })
    }

    /// Check server health.
    pub async fn health(&self) -> Result<HealthResponse> {
        let url = self.base_url.join("/health")?;

        let response = self.http.get(url).send().await?;

        if !response.status().is_success() {
            anyhow::bail!("Server returned error: {}", response.status());
        }

        Ok(response.json().await?)
    }

    /// Fetch pool, cache and store counters.
    pub async fn status(&self) -> Result<StatusResponse> {
        let url = self.base_url.join("/status")?;

        let response = self.http.get(url).send().await?;

        if !response.status().is_success() {
            anyhow::bail!("Server returned error: {}", response.status());
        }

        Ok(response.json().await?)
    }

    /// Run a lookup on the server.
    pub async fn check_status(&self, scheme_id: &str) -> Result<LookupResponse> {
        let url = self.base_url.join("/check_status")?;

        let response = self
            .http
            .post(url)
            .json(&json!({ "scheme_id": scheme_id }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            let message = body["message"].as_str().unwrap_or("unknown error");
            anyhow::bail!("Server returned {}: {}", status, message);
        }

        Ok(response.json().await?)
    }
}
