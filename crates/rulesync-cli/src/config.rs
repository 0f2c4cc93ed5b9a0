//! Configuration file loading
//!
//! The engine configuration is read from TOML. An explicitly named file must
//! exist; the default file (`<config_dir>/rulesync/rulesync.toml`) is optional.
//!
//! ```toml
//! rules_key = "rulesync.rules"
//! values_key = "rulesync.instructions"
//! offer_import_on_activate = true
//! default_resolution = "push"
//! ```

use rulesync_engine::SyncConfig;
use std::path::{Path, PathBuf};

/// File name of the configuration file
pub const CONFIG_FILE: &str = "rulesync.toml";

/// Configuration loading error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read config {path}: {source}")]
    Read {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid configuration
    #[error("invalid config {path}: {source}")]
    Parse {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: toml::de::Error,
    },
}

/// Default configuration file location
#[must_use]
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("rulesync").join(CONFIG_FILE))
}

/// Load configuration from `explicit`, else from the default file if present
///
/// # Errors
/// Returns `ConfigError` if a file that should be read cannot be read or parsed
pub fn load(explicit: Option<&Path>) -> Result<SyncConfig, ConfigError> {
    if let Some(path) = explicit {
        return load_file(path);
    }
    match default_path() {
        Some(path) if path.is_file() => load_file(&path),
        _ => {
            tracing::debug!("no config file; using defaults");
            Ok(SyncConfig::default())
        }
    }
}

/// Load configuration from a TOML file
///
/// # Errors
/// Returns `ConfigError` if the file cannot be read or parsed
pub fn load_file(path: &Path) -> Result<SyncConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "config loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rulesync_engine::{Resolution, config::DEFAULT_VALUES_KEY};
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "rules_key = \"team.rules\"\ndefault_resolution = \"pull\"").unwrap();

        let config = load(Some(file.path())).unwrap();
        assert_eq!(config.rules_key, "team.rules");
        assert_eq!(config.values_key, DEFAULT_VALUES_KEY);
        assert_eq!(config.default_resolution, Some(Resolution::Pull));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn bad_resolution_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_resolution = \"merge\"").unwrap();
        assert!(matches!(
            load_file(file.path()).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }
}
