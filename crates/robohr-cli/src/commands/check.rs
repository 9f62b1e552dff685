//! `robohr check` command implementation.
//!
//! Loads the configuration and reports problems in three severities:
//! - errors that stop the server from starting (parse failures, invalid values)
//! - warnings for settings that work but probably do not do what was meant
//! - informational notes about disabled features
//!
//! With `--connect`, the intent service and the database are contacted too.

use crate::bootstrap;
use anyhow::Result;
use robohr_command::{HttpIntentClient, IntentRecognizer};
use robohr_core::{IntentProvider, RobohrConfig, SpeechProvider, StoreBackend};
use std::path::Path;

// ============================================================================
// Check Result Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A single check finding.
#[derive(Debug, Clone)]
pub struct CheckFinding {
    pub severity: Severity,
    /// Configuration section the finding is about (e.g. "intent").
    pub section: String,
    pub message: String,
}

impl CheckFinding {
    fn error(section: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, section, message)
    }

    fn warning(section: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, section, message)
    }

    fn info(section: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, section, message)
    }

    fn new(severity: Severity, section: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            section: section.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CheckResults {
    pub findings: Vec<CheckFinding>,
}

impl CheckResults {
    fn add(&mut self, finding: CheckFinding) {
        self.findings.push(finding);
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }

    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }

    fn print(&self) {
        let mut findings: Vec<_> = self.findings.iter().collect();
        findings.sort_by(|a, b| b.severity.cmp(&a.severity).then_with(|| a.section.cmp(&b.section)));

        for finding in findings {
            let icon = match finding.severity {
                Severity::Error => "✗",
                Severity::Warning => "⚠",
                Severity::Info => "ℹ",
            };
            println!("  {} [{}]: {}", icon, finding.section, finding.message);
        }

        println!();
        println!("{}", "═".repeat(60));
        if self.has_errors() {
            println!(
                "❌ {} error(s), {} warning(s)",
                self.count(Severity::Error),
                self.count(Severity::Warning)
            );
        } else if self.count(Severity::Warning) > 0 {
            println!("Summary: {} warning(s)", self.count(Severity::Warning));
        } else {
            println!("✅ All checks passed!");
        }
    }
}

// ============================================================================
// Checks
// ============================================================================

/// Load the configuration, recording a finding instead of failing.
fn load(path: Option<&Path>, results: &mut CheckResults) -> Option<RobohrConfig> {
    let Some(path) = path else {
        results.add(CheckFinding::info("config", "No configuration file given, using defaults"));
        return Some(RobohrConfig::default());
    };
    match RobohrConfig::from_file(path) {
        Ok(config) => Some(config),
        Err(e) => {
            results.add(CheckFinding::error("config", format!("{}: {}", path.display(), e)));
            None
        }
    }
}

/// Checks that need nothing but the configuration itself.
pub fn check_settings(config: &RobohrConfig) -> CheckResults {
    let mut results = CheckResults::default();

    if let Err(e) = config.validate() {
        results.add(CheckFinding::error("config", e.to_string()));
    }

    if config.intent.provider == IntentProvider::Pattern {
        let non_english: Vec<_> = config
            .languages
            .supported
            .iter()
            .filter(|code| !code.eq_ignore_ascii_case("en"))
            .cloned()
            .collect();
        if !non_english.is_empty() {
            results.add(CheckFinding::warning(
                "intent",
                format!(
                    "The pattern recognizer only understands English, but languages.supported also lists {}",
                    non_english.join(", ")
                ),
            ));
        }
    }

    if config.intent.confidence_threshold == 0.0 {
        results.add(CheckFinding::warning(
            "intent",
            "confidence_threshold is 0, low-confidence intents are never flagged",
        ));
    }

    if config.gateway.overall_timeout_secs < config.intent.text_timeout_secs {
        results.add(CheckFinding::warning(
            "gateway",
            format!(
                "overall_timeout_secs ({}) is shorter than intent.text_timeout_secs ({})",
                config.gateway.overall_timeout_secs, config.intent.text_timeout_secs
            ),
        ));
    }

    if config.gateway.probe_interval().is_none() {
        results.add(CheckFinding::info(
            "gateway",
            "Health probe disabled, service health is only learned from traffic",
        ));
    }

    if config.speech.provider == SpeechProvider::Disabled {
        results.add(CheckFinding::info("speech", "Speech disabled, audio commands will be refused"));
    }

    if !config.history.enabled {
        results.add(CheckFinding::info("history", "Command history is disabled"));
    }

    if config.store.backend == StoreBackend::Memory && !config.store.seed_demo_data {
        results.add(CheckFinding::info(
            "store",
            "In-memory store without demo data starts with no employees",
        ));
    }

    results
}

/// Contact the external services the configuration points at.
async fn check_connections(config: &RobohrConfig, results: &mut CheckResults) {
    if config.intent.provider == IntentProvider::Http {
        match HttpIntentClient::from_config(&config.intent) {
            Ok(client) => {
                if client.probe().await {
                    results.add(CheckFinding::info(
                        "intent",
                        format!("Intent service at {} is healthy", client.base_url()),
                    ));
                } else {
                    results.add(CheckFinding::error(
                        "intent",
                        format!("Intent service at {} is not reachable or unhealthy", client.base_url()),
                    ));
                }
            }
            Err(e) => results.add(CheckFinding::error("intent", e.to_string())),
        }
    }

    if config.store.backend == StoreBackend::Postgres {
        match bootstrap::connect_postgres(&config.store).await {
            Ok(_) => results.add(CheckFinding::info("store", "Connected to PostgreSQL")),
            Err(e) => results.add(CheckFinding::error("store", format!("{:#}", e))),
        }
    }
}

/// Run all configuration checks.
pub async fn run(path: Option<&Path>, connect: bool) -> Result<()> {
    println!("🔍 Checking RoboHR configuration...");
    println!();

    let mut results = CheckResults::default();
    if let Some(config) = load(path, &mut results) {
        results.findings.extend(check_settings(&config).findings);
        if connect && !results.has_errors() {
            check_connections(&config, &mut results).await;
        }
    }
    results.print();

    if results.has_errors() {
        anyhow::bail!(
            "Configuration has {} error(s). Fix them before starting the server.",
            results.count(Severity::Error)
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config_file(yaml: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_have_no_errors() {
        let results = check_settings(&RobohrConfig::default());
        assert!(!results.has_errors());
    }

    #[test]
    fn test_invalid_threshold_is_an_error() {
        let mut config = RobohrConfig::default();
        config.intent.confidence_threshold = 1.5;
        let results = check_settings(&config);
        assert!(results.has_errors());
        assert!(results.findings[0].message.contains("confidence_threshold"));
    }

    #[test]
    fn test_pattern_recognizer_with_other_languages_warns() {
        let config = RobohrConfig::from_yaml(
            "intent:\n  provider: pattern\nlanguages:\n  supported: [en, es]\n  fallback: en\n",
        )
        .unwrap();
        let results = check_settings(&config);
        assert!(!results.has_errors());
        let warning = results
            .findings
            .iter()
            .find(|f| f.severity == Severity::Warning && f.section == "intent")
            .unwrap();
        assert!(warning.message.contains("es"));
    }

    #[test]
    fn test_unparsable_file_is_reported() {
        let file = config_file("intent: [not, a, map]\n");
        let mut results = CheckResults::default();
        assert!(load(Some(file.path()), &mut results).is_none());
        assert!(results.has_errors());
    }

    #[test]
    fn test_postgres_without_url_is_an_error() {
        let file = config_file("store:\n  backend: postgres\n");
        let mut results = CheckResults::default();
        let config = load(Some(file.path()), &mut results).unwrap();
        let results = check_settings(&config);
        assert!(results.findings.iter().any(|f| f.severity == Severity::Error
            && f.message.contains("store.database_url")));
    }

    #[tokio::test]
    async fn test_run_fails_on_errors() {
        let file = config_file("gateway:\n  overall_timeout_secs: 0\n");
        assert!(run(Some(file.path()), false).await.is_err());
    }
}
