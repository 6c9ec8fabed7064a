//! Common test utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use eligo_engine::testing::MockSessionFactory;
use eligo_engine::{LookupEngine, RetryPolicy};
use eligo_server::{AppState, Server, ServerConfig};
use eligo_store::SqliteRecordingStore;

/// A test server that runs in the background.
pub struct TestServer {
    /// The server's address.
    pub addr: SocketAddr,
    /// HTTP client configured for this server.
    pub client: Client,
    /// Scripted browser backend behind the engine.
    pub factory: MockSessionFactory,
    /// The engine, for inspecting counters.
    pub engine: LookupEngine,
    /// Handle to the server task.
    _handle: JoinHandle<()>,
    /// Temporary directory holding the recording database.
    pub temp_dir: TempDir,
}

impl TestServer {
    /// Start a test server whose pages are all blank.
    pub async fn start() -> Result<Self> {
        Self::start_with(MockSessionFactory::new(), ServerConfig::new()).await
    }

    /// Start a test server with a scripted backend.
    pub async fn start_with_factory(factory: MockSessionFactory) -> Result<Self> {
        Self::start_with(factory, ServerConfig::new()).await
    }

    /// Start a test server with a scripted backend and server settings.
    pub async fn start_with(factory: MockSessionFactory, config: ServerConfig) -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let addr = find_available_port().await?;

        let engine = LookupEngine::builder()
            .with_factory(Arc::new(factory.clone()))
            .with_retry_policy(RetryPolicy::new().with_backoff(Duration::from_millis(1)))
            .build()?;
        let store = Arc::new(SqliteRecordingStore::open(
            temp_dir.path().join("recordings.db"),
        )?);

        let config = config
            .with_bind_address(addr)
            .with_request_logging(false);
        let state = AppState::new(engine.clone(), store, config);

        let server = Server::from_state(state);
        let handle = tokio::spawn(async move {
            let _ = server.run_on(addr).await;
        });

        let client = Client::new();
        wait_for_server(&client, addr).await?;

        Ok(Self {
            addr,
            client,
            factory,
            engine,
            _handle: handle,
            temp_dir,
        })
    }

    /// Get the base URL for the server.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get a GET request builder.
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.get(format!("{}{}", self.base_url(), path))
    }

    /// Get a POST request builder.
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.post(format!("{}{}", self.base_url(), path))
    }

    /// Check if server is healthy.
    pub async fn health(&self) -> Result<bool> {
        let resp = self.get("/health").send().await?;
        Ok(resp.status().is_success())
    }
}

/// Find an available port for the test server.
async fn find_available_port() -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}

/// Wait for the server to become ready.
async fn wait_for_server(client: &Client, addr: SocketAddr) -> Result<()> {
    let url = format!("http://{}/health", addr);

    let result = timeout(Duration::from_secs(5), async {
        loop {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return,
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    })
    .await;

    match result {
        Ok(()) => Ok(()),
        Err(_) => anyhow::bail!("Timeout waiting for server to start"),
    }
}
