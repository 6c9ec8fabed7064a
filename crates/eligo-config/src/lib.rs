//! Configuration system for the Eligo lookup service.
//!
//! Provides TOML-based configuration with:
//! - One section per subsystem (`[server]`, `[pool]`, `[retry]`, `[cache]`,
//!   `[webdriver]`, `[site]`, `[store]`), each with working defaults
//! - Config file layering (XDG user config + project-local overrides)
//! - An explicit `--config` file applied last and required to parse

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, PROJECT_CONFIG_FILE, USER_CONFIG_FILE, load_config,
    load_config_file, load_config_with_options, load_config_with_override, logs_dir,
    save_config, store_path, xdg_config_dir, xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
