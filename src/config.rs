//! Server configuration.
//!
//! Resolution order, later wins:
//! 1. built-in defaults
//! 2. TOML file (`--config`, else `<config_dir>/reminders-mcp/config.toml` if present)
//! 3. environment: `REQUEST_TIMEOUT` (seconds), `LOG_LEVEL`
//! 4. command-line flags

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable overriding [`ServerConfig::request_timeout_secs`].
pub const ENV_REQUEST_TIMEOUT: &str = "REQUEST_TIMEOUT";
/// Environment variable overriding [`ServerConfig::log_level`].
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

const DEFAULT_REQUEST_TIMEOUT_SECS: f64 = 60.0;

/// Errors loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Which reminder store to connect to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// The user's Reminders via EventKit (macOS).
    #[default]
    #[serde(alias = "event_kit")]
    EventKit,
    /// A throwaway in-memory store.
    Memory,
}

impl std::str::FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eventkit" | "event_kit" => Ok(Self::EventKit),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::Invalid(format!(
                "unknown backend {other:?} (expected \"eventkit\" or \"memory\")"
            ))),
        }
    }
}

/// Top-level server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Deadline for the permission prompt and callback-based fetches.
    pub request_timeout_secs: f64,
    /// Tracing filter directive (e.g. `info`, `reminders_mcp=debug`).
    pub log_level: String,
    /// Also write logs to this file.
    pub log_file: Option<PathBuf>,
    /// Expose only read-only tools.
    pub read_only: bool,
    pub backend: BackendKind,
    /// Page size for list tools when the caller passes no `limit`.
    pub default_limit: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            log_level: "info".to_owned(),
            log_file: None,
            read_only: false,
            backend: BackendKind::default(),
            default_limit: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `path`, or from the default location when it exists.
    ///
    /// A missing default file is not an error; an explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_config_path() {
                Some(default) if default.is_file() => Self::from_file(&default),
                _ => Ok(Self::default()),
            },
        }
    }

    /// `<config_dir>/reminders-mcp/config.toml`, if the platform has a config dir.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("reminders-mcp").join("config.toml"))
    }

    /// Apply environment overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT) {
            self.request_timeout_secs = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!(
                    "{ENV_REQUEST_TIMEOUT} must be a number of seconds, got {raw:?}"
                ))
            })?;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|l| !l.trim().is_empty()) {
            self.log_level = level.trim().to_owned();
        }
        Ok(())
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.request_timeout_secs.is_finite() || self.request_timeout_secs <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "request_timeout_secs must be positive, got {}",
                self.request_timeout_secs
            )));
        }
        if Duration::try_from_secs_f64(self.request_timeout_secs).is_err() {
            return Err(ConfigError::Invalid(format!(
                "request_timeout_secs is too large, got {}",
                self.request_timeout_secs
            )));
        }
        if self.default_limit == Some(0) {
            return Err(ConfigError::Invalid(
                "default_limit must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }

    /// The request timeout. Values `validate` rejects fall back to the default.
    pub fn request_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.request_timeout_secs)
            .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_REQUEST_TIMEOUT_SECS))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.backend, BackendKind::EventKit);
        assert!(!config.read_only);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "read_only = true\nbackend = \"memory\"\n").unwrap();

        let config = ServerConfig::from_file(&path).unwrap();
        assert!(config.read_only);
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.request_timeout_secs, 60.0);
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").unwrap();
        assert!(matches!(
            ServerConfig::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let result = ServerConfig::load(Some(Path::new("/nonexistent/reminders.toml")));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = ServerConfig::default();
        config
            .apply_overrides(env(&[("REQUEST_TIMEOUT", "2.5"), ("LOG_LEVEL", "debug")]))
            .unwrap();
        assert_eq!(config.request_timeout(), Duration::from_millis(2500));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn bad_timeout_env_is_rejected() {
        let mut config = ServerConfig::default();
        let err = config
            .apply_overrides(env(&[("REQUEST_TIMEOUT", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("REQUEST_TIMEOUT"));
    }

    #[test]
    fn huge_timeout_env_fails_validation_without_panicking() {
        let mut config = ServerConfig::default();
        config
            .apply_overrides(env(&[("REQUEST_TIMEOUT", "1e20")]))
            .unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("too large"));
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn non_positive_timeout_fails_validation() {
        let config = ServerConfig {
            request_timeout_secs: 0.0,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn backend_parses_from_str() {
        assert_eq!("EventKit".parse::<BackendKind>().unwrap(), BackendKind::EventKit);
        assert_eq!("memory".parse::<BackendKind>().unwrap(), BackendKind::Memory);
        assert!("sqlite".parse::<BackendKind>().is_err());
    }
}
