//! Start command - launches the Eligo server.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use eligo_config::EligoConfig;
use eligo_server::{AppState, Server};
use tracing::{info, warn};

use super::Context;
use crate::bootstrap;

/// Arguments for the start command.
///
/// CLI arguments override config file values.
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind to (overrides config)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// WebDriver server URL (overrides config)
    #[arg(long, env = "ELIGO_WEBDRIVER_URL")]
    pub webdriver: Option<String>,

    /// Recording database path (overrides config)
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Disable request rate limiting
    #[arg(long)]
    pub no_rate_limit: bool,
}

impl StartArgs {
    fn apply(&self, config: &mut EligoConfig) {
        let mut server = config.server();
        if let Some(port) = self.port {
            server.port = port;
        }
        if let Some(bind) = &self.bind {
            server.bind = bind.clone();
        }
        if self.no_rate_limit {
            server.rate_limiting = false;
        }
        config.server = Some(server);

        if let Some(endpoint) = &self.webdriver {
            let mut webdriver = config.webdriver();
            webdriver.endpoint = endpoint.clone();
            config.webdriver = Some(webdriver);
        }

        if let Some(path) = &self.store {
            let mut store = config.store();
            store.path = Some(path.clone());
            config.store = Some(store);
        }
    }
}

/// Run the start command.
pub async fn run(args: StartArgs, ctx: &Context) -> Result<()> {
    // ── Load configuration ──────────────────────────────────────────────

    let mut config = ctx.load_config()?.config;
    args.apply(&mut config);
    config.validate()?;

    let server_config = bootstrap::server_config(&config)?;
    let addr = server_config.bind_address;

    // ── Engine and store ────────────────────────────────────────────────

    let engine = bootstrap::build_engine(&config)?;
    let store = bootstrap::open_store(&config)?;
    let maintenance = engine.spawn_maintenance();

    if ctx.verbose {
        let site = engine.site();
        let policy = engine.retry_policy();
        println!("Bind address: {}", addr);
        println!("WebDriver: {}", config.webdriver().endpoint);
        println!("Check page: {}", site.check_url);
        println!(
            "Retry: {} attempts, exhaustion {}",
            policy.max_attempts,
            policy.exhaustion.as_str()
        );
        println!(
            "Recording store: {}",
            eligo_config::store_path(&config).display()
        );
        println!(
            "Rate limiting: {}",
            if server_config.rate_limiting {
                format!("{} req/min", server_config.api_rpm)
            } else {
                "disabled".to_string()
            }
        );
    }

    // ── Serve ───────────────────────────────────────────────────────────

    let state = AppState::new(engine.clone(), Arc::new(store), server_config);
    let server = Server::from_state(state);

    println!("Eligo server starting on http://{}", addr);
    println!("Press Ctrl+C to stop");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Shutdown requested");
    };

    let result = server.run_until(addr, shutdown).await;

    // Sessions are released even if the listener failed.
    engine.shutdown().await;
    if let Some(handle) = maintenance {
        handle.abort();
    }

    result?;
    println!("Eligo server stopped");
    Ok(())
}
