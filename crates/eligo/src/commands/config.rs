//! Config command - configuration management.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration
    Show,

    /// Show which config files are loaded and their precedence
    Which,

    /// Initialize a config file with defaults
    Init {
        /// Create project-local config (./eligo.toml) instead of user config
        #[arg(long)]
        local: bool,
    },

    /// Show configuration file path
    Path,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx).await,
        ConfigCommand::Which => cmd_which(ctx).await,
        ConfigCommand::Init { local } => cmd_init(local).await,
        ConfigCommand::Path => cmd_path().await,
    }
}

async fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = ctx.discover_config()?;
    let config = &loaded.config;

    println!("# Eligo Configuration\n");

    // Sources
    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("No config files loaded (using defaults)\n");
    } else {
        println!("Config files:");
        for source in &sources {
            println!("  {}", source.display());
        }
        println!();
    }

    let server = config.server();
    println!("Server:");
    println!("  bind: {}:{}", server.bind, server.port);
    if server.rate_limiting {
        println!("  rate limit: {} req/min", server.api_rpm);
    } else {
        println!("  rate limit: disabled");
    }
    println!();

    let webdriver = config.webdriver();
    let site = config.site();
    println!("Lookup:");
    println!("  webdriver: {} ({})", webdriver.endpoint, webdriver.browser);
    println!(
        "  check page: {}",
        site.check_url.as_deref().unwrap_or("(built-in)")
    );
    let pool = config.pool();
    let retry = config.retry();
    println!("  sessions: {}", pool.capacity);
    println!(
        "  attempts: {} (backoff {}ms)",
        retry.max_attempts, retry.backoff_ms
    );
    println!();

    println!("Store:");
    println!("  path: {}", eligo_config::store_path(config).display());
    println!();

    // Warnings
    let invalid = config.validate().err();
    if !loaded.warnings.is_empty() || invalid.is_some() {
        println!("Warnings:");
        for w in &loaded.warnings {
            println!("  ⚠ {}", w);
        }
        if let Some(e) = invalid {
            println!("  ⚠ {}", e);
        }
        println!();
    }

    if ctx.verbose {
        println!("---\nRaw config:\n");
        if let Ok(toml_str) = config.to_toml() {
            println!("{}", toml_str);
        }
    }

    Ok(())
}

async fn cmd_which(ctx: &Context) -> Result<()> {
    let loaded = ctx.discover_config()?;

    println!("Config file search order (later overrides earlier):\n");

    for source in &loaded.sources {
        let status = if source.loaded {
            "✓ loaded"
        } else {
            "· not found"
        };
        println!("  {} {}", status, source.path.display());
    }

    println!();
    let loaded_count = loaded.loaded_from().len();
    if loaded_count == 0 {
        println!("No config files found. Run 'eligo config init' to create one.");
    } else {
        println!("{} config file(s) loaded.", loaded_count);
    }

    Ok(())
}

const TEMPLATE: &str = r##"# Eligo Configuration

# HTTP server
[server]
port = 8080
bind = "127.0.0.1"
rate_limiting = true
api_rpm = 120

# WebDriver server that drives the browser
[webdriver]
endpoint = "http://localhost:4444"
browser = "chrome"

# Browser sessions kept alive between lookups
[pool]
capacity = 5
acquire_timeout_secs = 30

# Attempts per lookup; "not_found" or "distinct" once all attempts fault
[retry]
max_attempts = 3
backoff_ms = 1000
exhaustion = "not_found"

# Lookup cache; a TTL of 0 never expires
[cache]
capacity = 100
positive_ttl_secs = 0
negative_ttl_secs = 900

# Checker page overrides (uncomment to use)
# [site]
# check_url = "https://example.org/eligibility"
# input_selector = "#schemeId"
# result_selector = "#result"
# error_selector = ".error"

# Recording database (default: recordings.db in the config directory)
# [store]
# path = "/var/lib/eligo/recordings.db"
"##;

async fn cmd_init(local: bool) -> Result<()> {
    let path = if local {
        PathBuf::from(eligo_config::PROJECT_CONFIG_FILE)
    } else {
        let dir = eligo_config::xdg_config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        std::fs::create_dir_all(&dir)?;
        dir.join(eligo_config::USER_CONFIG_FILE)
    };

    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }

    std::fs::write(&path, TEMPLATE)?;
    println!("✓ Created config file: {}", path.display());
    println!();
    println!("Next steps:");
    println!("  eligo config show    # verify configuration");
    println!("  eligo start          # run the server");

    Ok(())
}

async fn cmd_path() -> Result<()> {
    if let Some(path) = eligo_config::xdg_config_path() {
        println!("{}", path.display());
    } else {
        eprintln!("Could not determine config directory");
    }
    Ok(())
}
