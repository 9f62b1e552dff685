//! Speech transcription / synthesis provider configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SpeechProvider {
    /// Remote speech endpoints over HTTP.
    #[default]
    Http,
    /// No speech support; audio commands are answered as service unavailable.
    Disabled,
}

/// Configuration for the speech providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    #[serde(default)]
    pub provider: SpeechProvider,

    /// Base URL of the speech service.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for a synthesis request.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum accepted audio payload in bytes.
    #[serde(default = "default_max_audio_bytes")]
    pub max_audio_bytes: usize,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            provider: SpeechProvider::default(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_audio_bytes: default_max_audio_bytes(),
        }
    }
}

fn default_base_url() -> String {
    super::intent::default_base_url()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_max_audio_bytes() -> usize {
    10 * 1024 * 1024
}
