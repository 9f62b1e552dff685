//! Intent recognition service configuration.

use serde::{Deserialize, Serialize};

/// Which intent recognizer the gateway talks to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IntentProvider {
    /// Remote intent recognition service over HTTP.
    #[default]
    Http,
    /// Built-in pattern recognizer (offline, English only).
    Pattern,
}

/// What the dispatcher does with an intent below the confidence threshold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LowConfidencePolicy {
    /// Run the command and flag the response.
    #[default]
    Execute,
    /// Do not run the command; ask the caller to clarify.
    Clarify,
}

/// Configuration for the intent recognition service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentServiceConfig {
    #[serde(default)]
    pub provider: IntentProvider,

    /// Base URL of the service, e.g. `http://127.0.0.1:8000`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for a text interpretation round-trip.
    #[serde(default = "default_text_timeout_secs")]
    pub text_timeout_secs: u64,

    /// Timeout for an audio round-trip (transcription).
    #[serde(default = "default_audio_timeout_secs")]
    pub audio_timeout_secs: u64,

    /// Confidence below which an intent is flagged as low confidence.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    #[serde(default)]
    pub low_confidence_policy: LowConfidencePolicy,
}

impl Default for IntentServiceConfig {
    fn default() -> Self {
        Self {
            provider: IntentProvider::default(),
            base_url: default_base_url(),
            text_timeout_secs: default_text_timeout_secs(),
            audio_timeout_secs: default_audio_timeout_secs(),
            confidence_threshold: default_confidence_threshold(),
            low_confidence_policy: LowConfidencePolicy::default(),
        }
    }
}

pub(crate) fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_text_timeout_secs() -> u64 {
    10
}

fn default_audio_timeout_secs() -> u64 {
    15
}

fn default_confidence_threshold() -> f64 {
    0.5
}
