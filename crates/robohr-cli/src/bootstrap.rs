//! Wiring of the command pipeline from configuration.
//!
//! This is the only place that reads the environment (`store.credentials_env`).
//! Everything below it receives its settings through constructors.

use anyhow::{Context, Result};
use robohr_adapter_pg::PostgresStore;
use robohr_audit::CommandLogger;
use robohr_command::{
    ActionRegistry, AppState, Clock, CommandGateway, DisabledSpeech, HttpIntentClient,
    HttpSpeechClient, IntentRecognizer, PatternRecognizer, Synthesizer, SystemClock, Transcriber,
};
use robohr_core::{IntentProvider, RobohrConfig, SpeechProvider, StoreBackend, StoreConfig};
use robohr_store::{InMemoryStore, Stores, demo_employees};
use std::sync::Arc;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Switch to the built-in recognizer and a seeded in-memory store.
pub fn go_offline(config: &mut RobohrConfig) {
    config.intent.provider = IntentProvider::Pattern;
    config.store.backend = StoreBackend::Memory;
    config.store.seed_demo_data = true;
}

/// Resolve the database URL, directly or through the named environment variable.
pub fn database_url(config: &StoreConfig) -> Result<String> {
    if let Some(url) = &config.database_url {
        return Ok(url.clone());
    }
    let var = config
        .credentials_env
        .as_deref()
        .context("store.database_url or store.credentials_env is required for postgres")?;
    std::env::var(var).with_context(|| format!("Environment variable {} is not set", var))
}

pub async fn connect_postgres(config: &StoreConfig) -> Result<PostgresStore> {
    let url = database_url(config)?;
    let store = PostgresStore::connect(&url, config.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS))
        .await
        .context("Failed to connect to PostgreSQL")?;
    Ok(store)
}

pub async fn build_stores(config: &StoreConfig) -> Result<Stores> {
    match config.backend {
        StoreBackend::Memory => {
            let store = if config.seed_demo_data {
                InMemoryStore::with_demo_data()
            } else {
                InMemoryStore::new()
            };
            tracing::info!(seeded = config.seed_demo_data, "Using in-memory store");
            Ok(Stores::shared(Arc::new(store)))
        }
        StoreBackend::Postgres => {
            let store = connect_postgres(config).await?;
            store.ensure_schema().await.context("Failed to create the RoboHR tables")?;
            if config.seed_demo_data {
                let inserted = store
                    .seed_if_empty(&demo_employees())
                    .await
                    .context("Failed to seed demo employees")?;
                tracing::info!(inserted, "Seeded demo employees");
            }
            tracing::info!("Using PostgreSQL store");
            Ok(Stores::shared(Arc::new(store)))
        }
    }
}

pub fn build_recognizer(config: &RobohrConfig, clock: Arc<dyn Clock>) -> Result<Arc<dyn IntentRecognizer>> {
    let recognizer: Arc<dyn IntentRecognizer> = match config.intent.provider {
        IntentProvider::Http => Arc::new(
            HttpIntentClient::from_config(&config.intent).context("Failed to build the intent client")?,
        ),
        IntentProvider::Pattern => {
            Arc::new(PatternRecognizer::new(clock).context("Failed to compile recognizer patterns")?)
        }
    };
    tracing::info!(recognizer = recognizer.name(), "Intent recognizer ready");
    Ok(recognizer)
}

/// Transcriber and synthesizer, plus whether they are backed by a real service.
pub fn build_speech(config: &RobohrConfig) -> Result<(Arc<dyn Transcriber>, Arc<dyn Synthesizer>, bool)> {
    match config.speech.provider {
        SpeechProvider::Http => {
            let client = Arc::new(
                HttpSpeechClient::from_config(&config.speech).context("Failed to build the speech client")?,
            );
            let transcriber: Arc<dyn Transcriber> = client.clone();
            let synthesizer: Arc<dyn Synthesizer> = client;
            Ok((transcriber, synthesizer, true))
        }
        SpeechProvider::Disabled => {
            let disabled = Arc::new(DisabledSpeech);
            let transcriber: Arc<dyn Transcriber> = disabled.clone();
            let synthesizer: Arc<dyn Synthesizer> = disabled;
            Ok((transcriber, synthesizer, false))
        }
    }
}

/// Build the full application state described by `config`.
pub async fn build_state(config: &RobohrConfig) -> Result<Arc<AppState>> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let stores = build_stores(&config.store).await?;
    let registry = ActionRegistry::builtin(&stores, &config.actions, clock.clone())
        .context("Failed to register the built-in actions")?;
    let recognizer = build_recognizer(config, clock.clone())?;
    let (transcriber, synthesizer, speech_enabled) = build_speech(config)?;
    let history = CommandLogger::new(&config.history).context("Failed to open command history")?;

    let gateway = CommandGateway::new(Arc::new(registry), recognizer, transcriber, config)
        .with_clock(clock)
        .with_history(history);

    Ok(Arc::new(AppState::new(
        Arc::new(gateway),
        synthesizer,
        speech_enabled,
        config.speech.max_audio_bytes,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_go_offline() {
        let mut config = RobohrConfig::default();
        config.store.backend = StoreBackend::Postgres;
        go_offline(&mut config);
        assert_eq!(config.intent.provider, IntentProvider::Pattern);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert!(config.store.seed_demo_data);
    }

    #[test]
    fn test_database_url_prefers_explicit_url() {
        let config = StoreConfig {
            database_url: Some("postgres://localhost/robohr".to_string()),
            credentials_env: Some("ROBOHR_UNUSED_VARIABLE".to_string()),
            ..Default::default()
        };
        assert_eq!(database_url(&config).unwrap(), "postgres://localhost/robohr");
    }

    #[test]
    fn test_database_url_missing_variable() {
        let config = StoreConfig {
            credentials_env: Some("ROBOHR_SURELY_UNSET_VARIABLE".to_string()),
            ..Default::default()
        };
        let err = database_url(&config).unwrap_err();
        assert!(err.to_string().contains("ROBOHR_SURELY_UNSET_VARIABLE"));
    }

    #[tokio::test]
    async fn test_offline_state_wiring() {
        let mut config = RobohrConfig::default();
        go_offline(&mut config);
        config.speech.provider = SpeechProvider::Disabled;

        let state = build_state(&config).await.unwrap();
        assert!(!state.speech_enabled);
        assert_eq!(state.gateway.registry().len(), 9);
        assert_eq!(state.gateway.recognizer().name(), "pattern");
    }
}
