//! Configuration
//!
//! Three layers, later ones winning:
//! 1. Built-in defaults
//! 2. Config file (~/.config/instance-tail/config.toml or --config)
//! 3. CLI flags
//!
//! The access token is never read from the config file. The tail page size
//! and poll interval are fixed and have no keys either.

mod defaults;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::query::HttpClientConfig;

pub use defaults::BuiltinDefaults;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Contents of the config file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub endpoint: Option<String>,
    pub request_timeout_seconds: Option<u64>,
    pub connect_timeout_seconds: Option<u64>,
    pub log_level: Option<String>,
}

impl FileConfig {
    /// Parse config file contents
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load from a specific path
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load `explicit` if given (it must exist), else the default file if present
    pub fn discover(explicit: Option<&Path>) -> Result<Option<Self>, ConfigError> {
        match explicit {
            Some(path) => Self::load(path).map(Some),
            None => match default_path() {
                Some(path) if path.exists() => Self::load(&path).map(Some),
                _ => Ok(None),
            },
        }
    }
}

/// Default config file path, if HOME is set
pub fn default_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".config/instance-tail/config.toml"))
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub endpoint: Option<String>,
    pub log_level: Option<String>,
}

/// Fully resolved settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub endpoint: String,
    pub request_timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
    pub log_level: String,
}

impl Settings {
    /// Merge the layers and validate the result
    pub fn resolve(file: Option<FileConfig>, cli: &CliOverrides) -> Result<Self, ConfigError> {
        let d = BuiltinDefaults::default();
        let f = file.unwrap_or_default();

        let settings = Self {
            endpoint: cli.endpoint.clone().or(f.endpoint).unwrap_or(d.endpoint),
            request_timeout_seconds: f.request_timeout_seconds.unwrap_or(d.request_timeout_seconds),
            connect_timeout_seconds: f.connect_timeout_seconds.unwrap_or(d.connect_timeout_seconds),
            log_level: cli.log_level.clone().or(f.log_level).unwrap_or(d.log_level),
        };

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "endpoint must be an http(s) URL, got {}",
                self.endpoint
            )));
        }

        // Timeouts must be in (0, 300]
        for (name, value) in [
            ("request_timeout_seconds", self.request_timeout_seconds),
            ("connect_timeout_seconds", self.connect_timeout_seconds),
        ] {
            if value == 0 || value > 300 {
                return Err(ConfigError::Invalid(format!(
                    "{} must be in (0, 300], got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }

    /// HTTP client settings
    pub fn http_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            endpoint: self.endpoint.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_seconds),
            connect_timeout: Duration::from_secs(self.connect_timeout_seconds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_only() {
        let s = Settings::resolve(None, &CliOverrides::default()).unwrap();
        assert_eq!(s.endpoint, "https://logging.googleapis.com");
        assert_eq!(s.log_level, "info");
        assert_eq!(s.http_config().request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = FileConfig::parse(
            r#"
            endpoint = "http://localhost:8080"
            request_timeout_seconds = 5
            log_level = "warn"
            "#,
        )
        .unwrap();

        let s = Settings::resolve(Some(file), &CliOverrides::default()).unwrap();
        assert_eq!(s.endpoint, "http://localhost:8080");
        assert_eq!(s.request_timeout_seconds, 5);
        assert_eq!(s.connect_timeout_seconds, 10);
        assert_eq!(s.log_level, "warn");
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = FileConfig {
            endpoint: Some("http://localhost:8080".into()),
            log_level: Some("warn".into()),
            ..Default::default()
        };
        let cli = CliOverrides {
            endpoint: Some("http://localhost:9090".into()),
            log_level: Some("debug".into()),
        };

        let s = Settings::resolve(Some(file), &cli).unwrap();
        assert_eq!(s.endpoint, "http://localhost:9090");
        assert_eq!(s.log_level, "debug");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = FileConfig::parse("access_token = \"nope\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_tail_cadence_not_configurable() {
        for key in ["page_size = 1000", "poll_interval_ms = 250"] {
            let result = FileConfig::parse(key);
            assert!(matches!(result, Err(ConfigError::Parse(_))), "{}", key);
        }
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        for file in [
            FileConfig { request_timeout_seconds: Some(0), ..Default::default() },
            FileConfig { connect_timeout_seconds: Some(301), ..Default::default() },
            FileConfig { endpoint: Some("ftp://x".into()), ..Default::default() },
        ] {
            let result = Settings::resolve(Some(file.clone()), &CliOverrides::default());
            assert!(matches!(result, Err(ConfigError::Invalid(_))), "{:?}", file);
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "request_timeout_seconds = 20").unwrap();

        let file = FileConfig::discover(Some(tmp.path())).unwrap().unwrap();
        assert_eq!(file.request_timeout_seconds, Some(20));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let result = FileConfig::discover(Some(&missing));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }
}
