//! Request-level policy enforced by the command gateway.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the command gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Timeout around the whole pipeline of one request.
    #[serde(default = "default_overall_timeout_secs")]
    pub overall_timeout_secs: u64,

    /// How long a failed health status short-circuits requests.
    #[serde(default = "default_health_cache_secs")]
    pub health_cache_secs: u64,

    /// Interval of the background health probe. Zero disables the probe task.
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            overall_timeout_secs: default_overall_timeout_secs(),
            health_cache_secs: default_health_cache_secs(),
            probe_interval_secs: default_probe_interval_secs(),
        }
    }
}

impl GatewayConfig {
    pub fn overall_timeout(&self) -> Duration {
        Duration::from_secs(self.overall_timeout_secs)
    }

    pub fn health_cache_window(&self) -> Duration {
        Duration::from_secs(self.health_cache_secs)
    }

    pub fn probe_interval(&self) -> Option<Duration> {
        (self.probe_interval_secs > 0).then(|| Duration::from_secs(self.probe_interval_secs))
    }
}

fn default_overall_timeout_secs() -> u64 {
    20
}

fn default_health_cache_secs() -> u64 {
    30
}

fn default_probe_interval_secs() -> u64 {
    15
}
