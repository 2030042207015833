//! Configuration loading, validation, and management for Ambit.
//!
//! Loads configuration from `~/.ambit/config.toml` (or the file named by
//! `AMBIT_CONFIG`) with environment variable overrides. Validates all
//! settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.ambit/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the completion backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// OpenAI-compatible base URL of the completion backend
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used for proposals and one-shot completions
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens per completion (0 = backend default)
    #[serde(default)]
    pub max_tokens: u32,

    /// Control loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Local tool service settings
    #[serde(default)]
    pub tool_service: ToolServiceConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("agent", &self.agent)
            .field("tool_service", &self.tool_service)
            .field("logging", &self.logging)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Seconds between two observation flushes
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// How many recent user messages keep their content (<= 0 = all)
    #[serde(default = "default_remain_content")]
    pub remain_content: i64,

    /// How many recent turns are rendered into the dialogue (0 = all)
    #[serde(default)]
    pub history_window: usize,

    /// Ceiling on concurrent backend calls
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Attempts per proposal before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Sampling temperature of the first attempt
    #[serde(default)]
    pub first_temperature: f32,

    /// Sampling temperature of every later attempt
    #[serde(default = "default_retry_temperature")]
    pub retry_temperature: f32,

    /// Append-only debug transcript of assembled dialogues ("" disables it)
    #[serde(default = "default_transcript_path")]
    pub transcript_path: String,

    /// Reject unknown operation names instead of ignoring them
    #[serde(default)]
    pub strict_operations: bool,
}

fn default_interval_secs() -> u64 {
    15
}
fn default_remain_content() -> i64 {
    -1
}
fn default_max_concurrency() -> usize {
    16
}
fn default_max_attempts() -> u32 {
    5
}
fn default_retry_temperature() -> f32 {
    0.5
}
fn default_transcript_path() -> String {
    "reflect.json".into()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            remain_content: default_remain_content(),
            history_window: 0,
            max_concurrency: default_max_concurrency(),
            max_attempts: default_max_attempts(),
            first_temperature: 0.0,
            retry_temperature: default_retry_temperature(),
            transcript_path: default_transcript_path(),
            strict_operations: false,
        }
    }
}

impl AgentConfig {
    /// The transcript path, or `None` when disabled.
    pub fn transcript(&self) -> Option<PathBuf> {
        if self.transcript_path.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.transcript_path))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolServiceConfig {
    /// Base URL of the loop-back tool service
    #[serde(default = "default_tool_service_url")]
    pub base_url: String,

    /// Operation names that must not be offered to the backend
    #[serde(default)]
    pub disabled: Vec<String>,
}

fn default_tool_service_url() -> String {
    "http://127.0.0.1:8000".into()
}

impl Default for ToolServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_tool_service_url(),
            disabled: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `AMBIT_CONFIG` or the default path
    /// (~/.ambit/config.toml).
    ///
    /// Also checks environment variables:
    /// - `AMBIT_API_KEY`, then `OPENAI_API_KEY`
    /// - `AMBIT_MODEL`
    /// - `AMBIT_BASE_URL`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_at(None)
    }

    /// Like [`AppConfig::load`], reading `path` when given.
    pub fn load_at(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::config_path);
        let mut config = Self::load_from(&path)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// The config file used when no path is given explicitly.
    pub fn config_path() -> PathBuf {
        std::env::var("AMBIT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::config_dir().join("config.toml"))
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
        Ok(config)
    }

    /// Environment variable overrides (highest priority).
    fn apply_env(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var("AMBIT_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(model) = std::env::var("AMBIT_MODEL") {
            self.model = model;
        }

        if let Ok(base_url) = std::env::var("AMBIT_BASE_URL") {
            self.base_url = base_url;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".ambit")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, t) in [
            ("agent.first_temperature", self.agent.first_temperature),
            ("agent.retry_temperature", self.agent.retry_temperature),
        ] {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be between 0.0 and 2.0"
                )));
            }
        }

        if self.agent.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_attempts must be at least 1".into(),
            ));
        }

        if self.agent.max_concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_concurrency must be at least 1".into(),
            ));
        }

        if self.agent.interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "agent.interval_secs must be at least 1".into(),
            ));
        }

        if !self.tool_service.base_url.starts_with("http://")
            && !self.tool_service.base_url.starts_with("https://")
        {
            return Err(ConfigError::ValidationError(
                "tool_service.base_url must start with http:// or https://".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `ambit init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            max_tokens: 0,
            agent: AgentConfig::default(),
            tool_service: ToolServiceConfig::default(),
            logging: LoggingConfig::default(),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.agent.interval_secs, 15);
        assert_eq!(config.agent.max_concurrency, 16);
        assert_eq!(config.agent.max_attempts, 5);
        assert_eq!(config.agent.first_temperature, 0.0);
        assert!((config.agent.retry_temperature - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.tool_service.base_url, "http://127.0.0.1:8000");
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model, config.model);
        assert_eq!(parsed.agent.remain_content, config.agent.remain_content);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.agent.retry_temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_attempts_rejected() {
        let mut config = AppConfig::default();
        config.agent.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn non_http_tool_service_rejected() {
        let mut config = AppConfig::default();
        config.tool_service.base_url = "ftp://localhost".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.model, "gpt-4o-mini");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
model = "local-model"

[agent]
interval_secs = 30
remain_content = 3
strict_operations = true

[tool_service]
disabled = ["rename_file"]
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.model, "local-model");
        assert_eq!(config.agent.interval_secs, 30);
        assert_eq!(config.agent.remain_content, 3);
        assert!(config.agent.strict_operations);
        assert_eq!(config.agent.max_attempts, 5);
        assert_eq!(config.tool_service.disabled, vec!["rename_file".to_string()]);
    }

    #[test]
    fn unparseable_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "agent = 12").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("[REDACTED]"));
    }

    #[test]
    fn empty_transcript_path_disables_transcript() {
        let mut agent = AgentConfig::default();
        assert_eq!(agent.transcript(), Some(PathBuf::from("reflect.json")));
        agent.transcript_path = String::new();
        assert!(agent.transcript().is_none());
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gpt-4o-mini"));
        assert!(toml_str.contains("127.0.0.1:8000"));
    }
}
