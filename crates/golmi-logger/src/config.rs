//! Configuration loading for the session logger and its recorder binary.
//!
//! Configuration lives in `golmi-logger.yaml`. Every section and field has
//! a default, so an absent file or an empty document is valid. Environment
//! variables override the file:
//!
//! - `GOLMI_LOG_MODE` overrides `logger.mode`
//! - `GOLMI_UPLOAD_URL` overrides `upload.base_url`
//! - `GOLMI_UPLOAD_PATH` overrides `upload.path`
//! - `GOLMI_UPLOAD_TIMEOUT_MS` overrides `upload.timeout_ms`
//! - `GOLMI_SAVE_PATH` overrides `upload.save_path`
//! - `NATS_URL` overrides `channel.nats_url`
//! - `GOLMI_SUBJECT_PREFIX` overrides `channel.subject_prefix`

use std::path::{Path, PathBuf};
use std::time::Duration;

use golmi_types::LogMode;
use serde::Deserialize;

/// Errors raised while loading `golmi-logger.yaml`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The logger config file exists but could not be read.
    #[error("failed to read logger config: {source}")]
    Io {
        /// Why the read failed.
        #[from]
        source: std::io::Error,
    },

    /// The logger config is not valid YAML or has a malformed field
    /// (for example an unknown `logger.mode`).
    #[error("invalid logger config: {source}")]
    Yaml {
        /// What `serde_yml` rejected.
        source: serde_yml::Error,
    },

    /// An environment override could not be parsed.
    #[error("invalid value for {name}: {reason}")]
    InvalidEnv {
        /// The environment variable.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoggerConfig {
    /// Session logger behaviour.
    #[serde(default)]
    pub logger: SessionConfig,

    /// Where and how the log is uploaded.
    #[serde(default)]
    pub upload: UploadConfig,

    /// Where state-update events come from.
    #[serde(default)]
    pub channel: ChannelConfig,

    /// Diagnostic output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl LoggerConfig {
    /// Load configuration from a YAML file, then apply environment overrides.
    ///
    /// A file that does not exist yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file exists but cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, or
    /// [`ConfigError::InvalidEnv`] if an override is malformed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse_yaml(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => return Err(e.into()),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string and apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::InvalidEnv`] if an override is malformed.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config = Self::parse_yaml(yaml)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn parse_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Override file values with environment variables when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] for an unparseable mode or timeout.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("GOLMI_LOG_MODE") {
            self.logger.mode = val.parse().map_err(|e| ConfigError::InvalidEnv {
                name: "GOLMI_LOG_MODE",
                reason: format!("{e}"),
            })?;
        }
        if let Ok(val) = std::env::var("GOLMI_UPLOAD_URL") {
            self.upload.base_url = val;
        }
        if let Ok(val) = std::env::var("GOLMI_UPLOAD_PATH") {
            self.upload.path = val;
        }
        if let Ok(val) = std::env::var("GOLMI_UPLOAD_TIMEOUT_MS") {
            self.upload.timeout_ms = val.parse().map_err(|e| ConfigError::InvalidEnv {
                name: "GOLMI_UPLOAD_TIMEOUT_MS",
                reason: format!("{e}"),
            })?;
        }
        if let Ok(val) = std::env::var("GOLMI_SAVE_PATH") {
            self.upload.save_path = Some(PathBuf::from(val));
        }
        if let Ok(val) = std::env::var("NATS_URL") {
            self.channel.nats_url = val;
        }
        if let Ok(val) = std::env::var("GOLMI_SUBJECT_PREFIX") {
            self.channel.subject_prefix = val;
        }
        Ok(())
    }
}

/// Session logger behaviour.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
    /// `full` to reconstruct complete state in every snapshot, `delta` to
    /// record only the triggering update.
    #[serde(default)]
    pub mode: LogMode,
}

/// Upload target configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadConfig {
    /// Scheme, host and port of the server receiving logs.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Default path on `base_url`, overridable per upload.
    #[serde(default = "default_upload_path")]
    pub path: String,

    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Also write the export object here on shutdown.
    #[serde(default)]
    pub save_path: Option<PathBuf>,
}

impl UploadConfig {
    /// Request timeout as a [`Duration`].
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            path: default_upload_path(),
            timeout_ms: default_timeout_ms(),
            save_path: None,
        }
    }
}

/// Event source configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChannelConfig {
    /// NATS server URL.
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// Subject prefix; events arrive on `{prefix}.{event_name}`.
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            nats_url: default_nats_url(),
            subject_prefix: default_subject_prefix(),
        }
    }
}

/// Diagnostic output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `pretty` or `json`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_owned()
}

fn default_upload_path() -> String {
    "/save_log".to_owned()
}

const fn default_timeout_ms() -> u64 {
    10_000
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_owned()
}

fn default_subject_prefix() -> String {
    "golmi".to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_log_format() -> String {
    "pretty".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = LoggerConfig::default();
        assert_eq!(config.logger.mode, LogMode::Full);
        assert_eq!(config.upload.path, "/save_log");
        assert_eq!(config.upload.timeout(), Duration::from_secs(10));
        assert_eq!(config.channel.subject_prefix, "golmi");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
logger:
  mode: delta

upload:
  base_url: "http://golmi.example:8000"
  path: "/logs/save"
  timeout_ms: 2500
  save_path: "/tmp/session.json"

channel:
  nats_url: "nats://broker:4222"
  subject_prefix: "pentomino"

logging:
  level: debug
  format: json
"#;
        let config: LoggerConfig = serde_yml::from_str(yaml).unwrap();
        assert_eq!(config.logger.mode, LogMode::Delta);
        assert_eq!(config.upload.base_url, "http://golmi.example:8000");
        assert_eq!(config.upload.path, "/logs/save");
        assert_eq!(config.upload.timeout_ms, 2500);
        assert_eq!(
            config.upload.save_path,
            Some(PathBuf::from("/tmp/session.json"))
        );
        assert_eq!(config.channel.subject_prefix, "pentomino");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn partial_yaml_uses_defaults() {
        let config: LoggerConfig = serde_yml::from_str("upload:\n  path: /other\n").unwrap();
        assert_eq!(config.upload.path, "/other");
        assert_eq!(config.upload.base_url, "http://127.0.0.1:5000");
        assert_eq!(config.logger.mode, LogMode::Full);
    }

    #[test]
    fn empty_document_is_default() {
        let config = LoggerConfig::parse_yaml("  \n").unwrap();
        assert_eq!(config, LoggerConfig::default());
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let result = serde_yml::from_str::<LoggerConfig>("logger:\n  mode: sometimes\n");
        assert!(result.is_err());
    }

    #[test]
    fn malformed_yaml_names_the_logger_config() {
        let err = LoggerConfig::parse("logger: [unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
        assert!(err.to_string().starts_with("invalid logger config"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");
        let config = LoggerConfig::from_file(&path);
        assert!(config.is_ok());
    }
}
