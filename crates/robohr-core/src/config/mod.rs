//! Configuration types for RoboHR.
//!
//! The whole configuration lives in one YAML file (`robohr.yaml`). Every
//! section is optional and falls back to the defaults documented on each
//! field. The binary loads it once and passes the pieces explicitly into the
//! components it constructs; inner components never read the environment.

pub mod actions;
pub mod gateway;
pub mod history;
pub mod intent;
pub mod languages;
pub mod server;
pub mod speech;
pub mod store;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use actions::ActionsConfig;
pub use gateway::GatewayConfig;
pub use history::{HistoryBackend, HistoryConfig};
pub use intent::{IntentProvider, IntentServiceConfig, LowConfidencePolicy};
pub use languages::LanguagesConfig;
pub use server::ServerConfig;
pub use speech::{SpeechConfig, SpeechProvider};
pub use store::{StoreBackend, StoreConfig};

/// Complete RoboHR configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RobohrConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Intent recognition service.
    #[serde(default)]
    pub intent: IntentServiceConfig,

    /// Speech transcription and synthesis providers.
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Request-level gateway policy.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Supported languages.
    #[serde(default)]
    pub languages: LanguagesConfig,

    /// Per-action limits.
    #[serde(default)]
    pub actions: ActionsConfig,

    /// Domain record store.
    #[serde(default)]
    pub store: StoreConfig,

    /// Command history.
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RobohrConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Check settings that serde cannot check on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.intent.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Config(format!(
                "intent.confidence_threshold must be within [0, 1], got {}",
                threshold
            )));
        }

        for (name, secs) in [
            ("intent.text_timeout_secs", self.intent.text_timeout_secs),
            ("intent.audio_timeout_secs", self.intent.audio_timeout_secs),
            ("speech.timeout_secs", self.speech.timeout_secs),
            ("gateway.overall_timeout_secs", self.gateway.overall_timeout_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::Config(format!("{} must be greater than zero", name)));
            }
        }

        if self.intent.provider == IntentProvider::Http && self.intent.base_url.trim().is_empty() {
            return Err(ConfigError::Config(
                "intent.base_url is required when intent.provider is http".to_string(),
            ));
        }

        if self.speech.provider == SpeechProvider::Http && self.speech.base_url.trim().is_empty() {
            return Err(ConfigError::Config(
                "speech.base_url is required when speech.provider is http".to_string(),
            ));
        }

        if !self
            .languages
            .supported
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&self.languages.fallback))
        {
            return Err(ConfigError::Config(format!(
                "languages.fallback '{}' is not in languages.supported",
                self.languages.fallback
            )));
        }

        if self.store.backend == StoreBackend::Postgres
            && self.store.database_url.is_none()
            && self.store.credentials_env.is_none()
        {
            return Err(ConfigError::Config(
                "store.database_url or store.credentials_env is required for the postgres backend"
                    .to_string(),
            ));
        }

        if self.history.enabled
            && self.history.backend == HistoryBackend::File
            && self.history.file_path.is_none()
        {
            return Err(ConfigError::Config(
                "history.file_path is required for the file backend".to_string(),
            ));
        }

        Ok(())
    }
}
