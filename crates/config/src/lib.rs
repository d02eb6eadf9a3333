//! Configuration loading, validation, and management for Conductor.
//!
//! Loads configuration from `~/.conductor/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.conductor/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-backend)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Backend serving agents with no explicit backend selector
    #[serde(default = "default_backend")]
    pub default_backend: String,

    /// Model used when a backend does not name its own
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per agent response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Backend-specific configurations
    #[serde(default)]
    pub backends: HashMap<String, BackendConfig>,

    /// Execution engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Routing heuristics used by the pattern catalogue
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Session memory settings
    #[serde(default)]
    pub session: SessionConfig,
}

fn default_backend() -> String {
    "ollama".into()
}
fn default_model() -> String {
    "llama3.2".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    2048
}

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
            .field("default_backend", &self.default_backend)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("backends", &self.backends)
            .field("engine", &self.engine)
            .field("routing", &self.routing)
            .field("session", &self.session)
            .finish()
    }
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Upper bound on one agent call, enforced by the backend invoker
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: None,
            model: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// What a Sequence or Parallel node does when a child fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicyKind {
    /// Abort the node and report the failure (default)
    #[default]
    FailFast,
    /// Substitute the placeholder and keep going
    Continue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub failure_policy: FailurePolicyKind,

    /// Placeholder used under `continue`; `{error}` is replaced by the failure
    #[serde(default = "default_placeholder")]
    pub continue_placeholder: String,

    /// Deepest tree an orchestration may build
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Progress events buffered before the engine waits for the consumer
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_placeholder() -> String {
    "[step unavailable: {error}]".into()
}
fn default_max_depth() -> usize {
    16
}
fn default_event_buffer() -> usize {
    64
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicyKind::default(),
            continue_placeholder: default_placeholder(),
            max_depth: default_max_depth(),
            event_buffer: default_event_buffer(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Backend that serves premium-tier agents
    #[serde(default = "default_premium_backend")]
    pub premium_backend: String,

    /// Keywords that push a query to the premium tier
    #[serde(default = "default_premium_keywords")]
    pub premium_keywords: Vec<String>,

    /// Queries longer than this (in characters) go to the premium tier
    #[serde(default = "default_length_threshold")]
    pub length_threshold: usize,

    /// Keywords that route a query to the security specialist
    #[serde(default = "default_security_keywords")]
    pub security_keywords: Vec<String>,

    /// Backends tried in order when the default backend fails
    #[serde(default)]
    pub fallback: Vec<String>,
}

fn default_premium_backend() -> String {
    "premium".into()
}
fn default_premium_keywords() -> Vec<String> {
    [
        "roadmap",
        "investment",
        "architecture",
        "security",
        "analyze",
        "budget",
        "forecast",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_length_threshold() -> usize {
    200
}
fn default_security_keywords() -> Vec<String> {
    ["security", "risk", "hack", "cyber", "vulnerability"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            premium_backend: default_premium_backend(),
            premium_keywords: default_premium_keywords(),
            length_threshold: default_length_threshold(),
            security_keywords: default_security_keywords(),
            fallback: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// "file" (default) or "memory"
    #[serde(default = "default_session_store")]
    pub store: String,

    /// Turns recalled into each call that carries a session key
    #[serde(default = "default_recall_limit")]
    pub recall_limit: usize,

    /// Override for the JSONL file location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

fn default_session_store() -> String {
    "file".into()
}
fn default_recall_limit() -> usize {
    6
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            store: default_session_store(),
            recall_limit: default_recall_limit(),
            path: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.conductor/config.toml).
    ///
    /// Also checks environment variables:
    /// - `CONDUCTOR_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `CONDUCTOR_BACKEND` overrides the default backend
    /// - `CONDUCTOR_MODEL` overrides the default model
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("CONDUCTOR_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(backend) = std::env::var("CONDUCTOR_BACKEND") {
            config.default_backend = backend;
        }

        if let Ok(model) = std::env::var("CONDUCTOR_MODEL") {
            config.default_model = model;
        }

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
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".conductor")
    }

    /// Where the file session store keeps its turns.
    pub fn session_path(&self) -> PathBuf {
        match &self.session.path {
            Some(path) => PathBuf::from(path),
            None => Self::config_dir().join("sessions").join("turns.jsonl"),
        }
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.engine.max_depth == 0 {
            return Err(ConfigError::ValidationError(
                "engine.max_depth must be at least 1".into(),
            ));
        }

        if self.engine.event_buffer == 0 {
            return Err(ConfigError::ValidationError(
                "engine.event_buffer must be at least 1".into(),
            ));
        }

        if !matches!(self.session.store.as_str(), "file" | "memory") {
            return Err(ConfigError::ValidationError(format!(
                "session.store must be \"file\" or \"memory\", got \"{}\"",
                self.session.store
            )));
        }

        if let Some(name) = self
            .routing
            .fallback
            .iter()
            .find(|name| **name == self.default_backend)
        {
            return Err(ConfigError::ValidationError(format!(
                "routing.fallback must not repeat the default backend \"{name}\""
            )));
        }

        if let Some((name, _)) = self.backends.iter().find(|(_, b)| b.timeout_secs == 0) {
            return Err(ConfigError::ValidationError(format!(
                "backends.{name}.timeout_secs must be at least 1"
            )));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some() || self.backends.values().any(|b| b.api_key.is_some())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let mut config = Self::default();
        config.backends.insert(
            "ollama".into(),
            BackendConfig {
                api_url: Some("http://localhost:11434/v1".into()),
                model: Some("llama3.2".into()),
                ..BackendConfig::default()
            },
        );
        config.backends.insert(
            "premium".into(),
            BackendConfig {
                api_url: Some("https://generativelanguage.googleapis.com/v1beta/openai".into()),
                model: Some("gemini-2.0-flash".into()),
                ..BackendConfig::default()
            },
        );
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_backend: default_backend(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            backends: HashMap::new(),
            engine: EngineConfig::default(),
            routing: RoutingConfig::default(),
            session: SessionConfig::default(),
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
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.default_backend, "ollama");
        assert_eq!(config.engine.failure_policy, FailurePolicyKind::FailFast);
        assert_eq!(config.routing.length_threshold, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_backend, config.default_backend);
        assert_eq!(parsed.engine.max_depth, config.engine.max_depth);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            default_temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_session_store_rejected() {
        let mut config = AppConfig::default();
        config.session.store = "redis".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("redis"));
    }

    #[test]
    fn fallback_repeating_default_rejected() {
        let mut config = AppConfig::default();
        config.routing.fallback = vec!["premium".into(), "ollama".into()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("routing.fallback"));
    }

    #[test]
    fn zero_timeout_rejected() {
        let mut config = AppConfig::default();
        config.backends.insert(
            "ollama".into(),
            BackendConfig {
                timeout_secs: 0,
                ..BackendConfig::default()
            },
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        let config = result.unwrap();
        assert_eq!(config.default_backend, "ollama");
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("ollama"));
        assert!(toml_str.contains("premium"));
        assert!(toml_str.contains("fail_fast"));
    }

    #[test]
    fn backend_and_engine_sections_parse() {
        let toml_str = r#"
default_backend = "ollama"

[backends.ollama]
api_url = "http://localhost:11434/v1"
model = "llama3.2"
timeout_secs = 30

[backends.premium]
api_url = "https://example.test/v1"
api_key = "sk-test"

[engine]
failure_policy = "continue"
continue_placeholder = "(skipped: {error})"

[routing]
length_threshold = 120
fallback = ["premium"]
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.backends.len(), 2);
        assert_eq!(config.backends["ollama"].timeout_secs, 30);
        assert_eq!(config.backends["premium"].timeout_secs, 120);
        assert_eq!(config.engine.failure_policy, FailurePolicyKind::Continue);
        assert_eq!(config.engine.continue_placeholder, "(skipped: {error})");
        assert_eq!(config.routing.length_threshold, 120);
        assert_eq!(config.routing.fallback, vec!["premium".to_string()]);
        assert!(!config.routing.premium_keywords.is_empty());
        assert!(config.has_api_key());
    }

    #[test]
    fn load_from_file_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[engine]\nevent_buffer = 0").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_backend = [").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn debug_redacts_keys() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn session_path_override() {
        let mut config = AppConfig::default();
        assert!(config.session_path().ends_with("sessions/turns.jsonl"));
        config.session.path = Some("/var/lib/conductor/turns.jsonl".into());
        assert_eq!(
            config.session_path(),
            PathBuf::from("/var/lib/conductor/turns.jsonl")
        );
    }
}
