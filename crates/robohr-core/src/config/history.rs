//! Command history configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HistoryBackend {
    /// Discard events.
    Null,
    /// JSON lines on stdout.
    Console,
    /// JSON lines appended to a file.
    File,
    /// Bounded in-memory ring.
    #[default]
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub backend: HistoryBackend,

    /// File path (file backend).
    #[serde(default)]
    pub file_path: Option<String>,

    /// Number of events kept by the memory backend.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            backend: HistoryBackend::default(),
            file_path: None,
            capacity: default_capacity(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_capacity() -> usize {
    1000
}
