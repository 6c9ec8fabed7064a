//! Config file discovery and layered merging.
//!
//! Resolution order (later overrides earlier):
//! 1. `~/.config/eligo/config.toml` (XDG user config)
//! 2. `./eligo.toml` (project-local)
//! 3. CLI arguments (handled externally)

use std::path::{Path, PathBuf};

use crate::{ConfigError, EligoConfig, Result};

/// Default config filename for project-local config.
pub const PROJECT_CONFIG_FILE: &str = "eligo.toml";

/// Default config filename within XDG config directory.
pub const USER_CONFIG_FILE: &str = "config.toml";

/// Application name for XDG directory resolution.
const APP_NAME: &str = "eligo";

/// Environment variable to override the config directory.
const CONFIG_DIR_ENV: &str = "ELIGO_CONFIG_DIR";

/// Default recording database filename within the config directory.
const STORE_FILE: &str = "recordings.db";

/// Log directory within the config directory.
const LOGS_DIR: &str = "logs";

/// Tracks where each config layer was loaded from.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    /// Path to the config file.
    pub path: PathBuf,
    /// Whether the file was found and loaded.
    pub loaded: bool,
}

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The merged configuration.
    pub config: EligoConfig,
    /// Sources that were checked, in order of precedence (lowest first).
    pub sources: Vec<ConfigSource>,
    /// Primary source file (first successfully loaded), for save operations.
    pub source: Option<ConfigSource>,
    /// Warnings generated during loading (e.g., a layer that failed to parse).
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Get paths of sources that were actually loaded.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Load configuration by discovering and merging all config layers.
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(project_dir, None)
}

/// Load configuration with explicit control over the user config directory.
///
/// `config_dir` overrides both `ELIGO_CONFIG_DIR` and the platform default.
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    let mut config = EligoConfig::new();
    let mut sources = Vec::new();
    let mut warnings = Vec::new();

    // 1. User config
    let user_config_path = match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => xdg_config_path(),
    };
    if let Some(path) = user_config_path {
        sources.push(load_layer(&mut config, &path, &mut warnings));
    }

    // 2. Project-local config
    let project_path = project_dir
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    sources.push(load_layer(&mut config, &project_path, &mut warnings));

    let source = sources.iter().find(|s| s.loaded).cloned();

    Ok(LoadedConfig {
        config,
        sources,
        source,
        warnings,
    })
}

/// Load discovered layers, then an explicit file on top.
///
/// Unlike discovered layers, a failure to read or parse `path` is an error.
pub fn load_config_with_override(path: &Path, config_dir: Option<&Path>) -> Result<LoadedConfig> {
    let mut loaded = load_config_with_options(None, config_dir)?;
    let layer = load_config_file(path)?;
    loaded.config.merge(layer);

    let source = ConfigSource {
        path: path.to_path_buf(),
        loaded: true,
    };
    if loaded.source.is_none() {
        loaded.source = Some(source.clone());
    }
    loaded.sources.push(source);
    Ok(loaded)
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<EligoConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    EligoConfig::from_toml(&contents)
}

/// Save configuration to a file.
///
/// Creates parent directories if they don't exist.
pub fn save_config(config: &EligoConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let contents = config.to_toml()?;
    std::fs::write(path, contents).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

/// Get the XDG config file path for eligo.
pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// Get the XDG config directory for eligo.
///
/// Checks `ELIGO_CONFIG_DIR` env var first, then falls back to platform default.
pub fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Recording database path: the configured one, else inside the config dir.
pub fn store_path(config: &EligoConfig) -> PathBuf {
    if let Some(path) = config.store().path {
        return path;
    }
    xdg_config_dir()
        .map(|d| d.join(STORE_FILE))
        .unwrap_or_else(|| PathBuf::from(STORE_FILE))
}

/// Directory for rolling log files.
pub fn logs_dir() -> PathBuf {
    xdg_config_dir()
        .map(|d| d.join(LOGS_DIR))
        .unwrap_or_else(|| PathBuf::from(LOGS_DIR))
}

/// Try to load a config file and merge it into the existing config.
fn load_layer(config: &mut EligoConfig, path: &Path, warnings: &mut Vec<String>) -> ConfigSource {
    if !path.is_file() {
        return ConfigSource {
            path: path.to_path_buf(),
            loaded: false,
        };
    }

    match load_config_file(path) {
        Ok(layer) => {
            config.merge(layer);
            ConfigSource {
                path: path.to_path_buf(),
                loaded: true,
            }
        }
        Err(e) => {
            warnings.push(format!("Failed to load {}: {}", path.display(), e));
            ConfigSource {
                path: path.to_path_buf(),
                loaded: false,
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_xdg_config_path_shape() {
        if let Some(p) = xdg_config_path() {
            assert!(p.ends_with(USER_CONFIG_FILE));
        }
    }

    #[test]
    fn test_load_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[pool]\ncapacity = 2\n").unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.pool().capacity, 2);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let err = load_config_file(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "this is not valid toml {{{{").unwrap();

        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_config_no_files() {
        let dir = TempDir::new().unwrap();
        let empty_config_dir = TempDir::new().unwrap();

        let loaded =
            load_config_with_options(Some(dir.path()), Some(empty_config_dir.path())).unwrap();
        assert_eq!(loaded.config, EligoConfig::default());
        assert!(loaded.loaded_from().is_empty());
        assert!(loaded.source.is_none());
    }

    #[test]
    fn test_load_config_layered_merge() {
        let user_dir = TempDir::new().unwrap();
        let project_dir = TempDir::new().unwrap();

        fs::write(
            user_dir.path().join("config.toml"),
            r#"
[server]
port = 8000

[pool]
capacity = 3
"#,
        )
        .unwrap();
        fs::write(
            project_dir.path().join("eligo.toml"),
            r#"
[server]
port = 3000
"#,
        )
        .unwrap();

        let loaded =
            load_config_with_options(Some(project_dir.path()), Some(user_dir.path())).unwrap();

        // Project-local overrides user config; untouched sections survive.
        assert_eq!(loaded.config.server().port, 3000);
        assert_eq!(loaded.config.pool().capacity, 3);
        assert_eq!(loaded.loaded_from().len(), 2);
        assert!(
            loaded
                .source
                .as_ref()
                .unwrap()
                .path
                .ends_with("config.toml")
        );
    }

    #[test]
    fn test_malformed_layer_warns_but_continues() {
        let dir = TempDir::new().unwrap();
        let empty_config_dir = TempDir::new().unwrap();
        fs::write(dir.path().join("eligo.toml"), "not valid toml {{{{").unwrap();

        let loaded =
            load_config_with_options(Some(dir.path()), Some(empty_config_dir.path())).unwrap();
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains("Failed to load"));
        assert!(loaded.loaded_from().is_empty());
    }

    #[test]
    fn test_override_file_applies_last() {
        let user_dir = TempDir::new().unwrap();
        fs::write(user_dir.path().join("config.toml"), "[pool]\ncapacity = 3\n").unwrap();

        let explicit = user_dir.path().join("explicit.toml");
        fs::write(&explicit, "[pool]\ncapacity = 7\n").unwrap();

        let loaded = load_config_with_override(&explicit, Some(user_dir.path())).unwrap();
        assert_eq!(loaded.config.pool().capacity, 7);
        assert!(loaded.loaded_from().iter().any(|p| p.ends_with("explicit.toml")));
    }

    #[test]
    fn test_override_file_parse_failure_is_error() {
        let user_dir = TempDir::new().unwrap();
        let explicit = user_dir.path().join("explicit.toml");
        fs::write(&explicit, "[pool\n").unwrap();

        let err = load_config_with_override(&explicit, Some(user_dir.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = EligoConfig::from_toml("[cache]\ncapacity = 12\n").unwrap();

        save_config(&config, &path).unwrap();
        assert_eq!(load_config_file(&path).unwrap(), config);
    }

    #[test]
    fn test_store_path_prefers_configured() {
        let config =
            EligoConfig::from_toml("[store]\npath = \"/tmp/eligo-test.db\"\n").unwrap();
        assert_eq!(store_path(&config), PathBuf::from("/tmp/eligo-test.db"));

        assert!(store_path(&EligoConfig::default()).ends_with(STORE_FILE));
    }
}
