//! Configuration loading and validation for Mender.
//!
//! Loads configuration from `~/.mender/config.toml` with environment
//! variable overrides. Validates all settings at load time.

use mender_core::PolicyOverrides;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.mender/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model API family assumed when none is given (e.g. "openai-completions")
    #[serde(default = "default_model_api")]
    pub default_model_api: String,

    /// Provider assumed when none is given
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Model id assumed when none is given
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Transcript repair settings
    #[serde(default)]
    pub transcript: TranscriptConfig,
}

fn default_model_api() -> String {
    "openai-completions".into()
}
fn default_provider() -> String {
    "openrouter".into()
}
fn default_model() -> String {
    "anthropic/claude-sonnet-4".into()
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptConfig {
    /// Force individual policy switches on or off regardless of provider
    #[serde(default, skip_serializing_if = "PolicyOverrides::is_empty")]
    pub overrides: PolicyOverrides,

    /// Log a summary whenever a repair changed the transcript
    #[serde(default = "default_true")]
    pub log_repairs: bool,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            overrides: PolicyOverrides::default(),
            log_repairs: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location.
    ///
    /// Environment variables take precedence over the file:
    /// - `MENDER_MODEL_API`
    /// - `MENDER_PROVIDER`
    /// - `MENDER_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if let Ok(api) = std::env::var("MENDER_MODEL_API") {
            config.default_model_api = api;
        }

        if let Ok(provider) = std::env::var("MENDER_PROVIDER") {
            config.default_provider = provider;
        }

        if let Ok(model) = std::env::var("MENDER_MODEL") {
            config.default_model = model;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".mender")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_provider.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "default_provider must not be empty".into(),
            ));
        }

        if self.default_model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "default_model must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_model_api: default_model_api(),
            default_provider: default_provider(),
            default_model: default_model(),
            transcript: TranscriptConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for mender_core::Error {
    fn from(err: ConfigError) -> Self {
        mender_core::Error::Config {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.default_provider, "openrouter");
        assert!(config.transcript.overrides.is_empty());
        assert!(config.transcript.log_repairs);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(parsed.default_model_api, config.default_model_api);
    }

    #[test]
    fn empty_provider_rejected() {
        let config = AppConfig {
            default_provider: "  ".into(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        let config = result.unwrap();
        assert_eq!(config.default_provider, "openrouter");
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("openrouter"));
        assert!(toml_str.contains("[transcript]"));
    }

    #[test]
    fn overrides_parse_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
default_provider = "github-copilot"
default_model = "gemini-2.5-pro"

[transcript]
log_repairs = false

[transcript.overrides]
split_parallel_tool_calls = false
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.default_provider, "github-copilot");
        assert_eq!(config.default_model_api, "openai-completions");
        assert!(!config.transcript.log_repairs);
        assert_eq!(config.transcript.overrides.split_parallel_tool_calls, Some(false));
        assert_eq!(config.transcript.overrides.textify_tool_call_history, None);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "default_provider = [").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }
}
