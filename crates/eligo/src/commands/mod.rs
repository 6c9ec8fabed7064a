//! CLI command handlers.

pub mod check;
pub mod config;
pub mod start;
pub mod status;

use std::path::PathBuf;

use anyhow::Result;
use eligo_config::LoadedConfig;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Explicit config file, applied last.
    pub config_path: Option<PathBuf>,
    /// Server URL override for client commands.
    pub server_url: Option<String>,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Server URL for client commands: `--server`, else localhost on the
    /// configured port.
    pub fn server_url(&self) -> String {
        if let Some(url) = &self.server_url {
            return url.clone();
        }
        let port = self
            .discover_config()
            .map(|loaded| loaded.config.server().port)
            .unwrap_or(eligo_config::DEFAULT_PORT);
        format!("http://localhost:{}", port)
    }

    /// Discover and merge config layers, then the explicit file if any.
    ///
    /// Broken discovered layers are reported and skipped; a broken explicit
    /// file or an unusable merged config is an error.
    pub fn load_config(&self) -> Result<LoadedConfig> {
        let loaded = self.discover_config()?;

        for warning in &loaded.warnings {
            eprintln!("warning: {}", warning);
        }

        if self.verbose {
            let sources = loaded.loaded_from();
            if sources.is_empty() {
                eprintln!("No config files found, using defaults + CLI args");
            } else {
                for source in sources {
                    eprintln!("Loaded config: {}", source.display());
                }
            }
        }

        loaded.config.validate()?;
        Ok(loaded)
    }

    /// Merged config layers without validation or reporting.
    pub fn discover_config(&self) -> Result<LoadedConfig> {
        let loaded = match self.config_path.as_deref() {
            Some(path) => eligo_config::load_config_with_override(path, None)?,
            None => eligo_config::load_config(None)?,
        };
        Ok(loaded)
    }
}
