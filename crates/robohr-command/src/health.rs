//! Health status of the intent recognition service.
//!
//! A single slot holding the last observed status and when it was observed.
//! Every request reads it; probes and failed recognition calls write it.

use crate::intent_client::IntentRecognizer;
use serde::Serialize;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    /// Nothing observed yet.
    Unknown,
}

impl HealthStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Unhealthy => "unhealthy",
            HealthStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug)]
pub struct HealthCache {
    slot: RwLock<Option<(HealthStatus, Instant)>>,
    window: Duration,
}

impl HealthCache {
    pub fn new(window: Duration) -> Self {
        Self {
            slot: RwLock::new(None),
            window,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Replace the slot with the latest observation.
    pub fn record(&self, healthy: bool) {
        let status = if healthy {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        if slot.map(|(previous, _)| previous) != Some(status) {
            tracing::info!(status = status.as_str(), "Intent service health changed");
        }
        *slot = Some((status, Instant::now()));
    }

    /// Last observed status, regardless of age.
    pub fn status(&self) -> HealthStatus {
        self.read().map_or(HealthStatus::Unknown, |(status, _)| status)
    }

    /// Time since the last observation.
    pub fn checked_ago(&self) -> Option<Duration> {
        self.read().map(|(_, at)| at.elapsed())
    }

    /// Whether a failure was observed within the cache window.
    pub fn is_failing(&self) -> bool {
        matches!(
            self.read(),
            Some((HealthStatus::Unhealthy, at)) if at.elapsed() < self.window
        )
    }

    fn read(&self) -> Option<(HealthStatus, Instant)> {
        *self.slot.read().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for HealthCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

/// Probe the recognizer every `interval` and record the outcome.
pub fn spawn_probe(
    recognizer: Arc<dyn IntentRecognizer>,
    cache: Arc<HealthCache>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let healthy = recognizer.probe().await;
            tracing::debug!(recognizer = recognizer.name(), healthy, "Health probe");
            cache.record(healthy);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_until_recorded() {
        let cache = HealthCache::new(Duration::from_secs(30));
        assert_eq!(cache.status(), HealthStatus::Unknown);
        assert!(!cache.is_failing());
        assert!(cache.checked_ago().is_none());
    }

    #[test]
    fn test_failure_within_window() {
        let cache = HealthCache::new(Duration::from_secs(30));
        cache.record(false);
        assert!(cache.is_failing());
        cache.record(true);
        assert!(!cache.is_failing());
        assert_eq!(cache.status(), HealthStatus::Healthy);
    }

    #[test]
    fn test_failure_expires() {
        let cache = HealthCache::new(Duration::from_millis(20));
        cache.record(false);
        std::thread::sleep(Duration::from_millis(40));
        assert!(!cache.is_failing());
        assert_eq!(cache.status(), HealthStatus::Unhealthy);
    }
}
