//! Supported languages.

use serde::{Deserialize, Serialize};

/// Language codes accepted end-to-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguagesConfig {
    #[serde(default = "default_supported")]
    pub supported: Vec<String>,

    /// Code used when a request names an unsupported language.
    #[serde(default = "default_fallback")]
    pub fallback: String,
}

impl Default for LanguagesConfig {
    fn default() -> Self {
        Self {
            supported: default_supported(),
            fallback: default_fallback(),
        }
    }
}

fn default_supported() -> Vec<String> {
    ["en", "es", "fr", "de", "it", "pt", "zh", "ja", "ko", "ru", "ar", "hi"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

fn default_fallback() -> String {
    "en".to_string()
}
