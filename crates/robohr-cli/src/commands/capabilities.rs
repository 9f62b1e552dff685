//! `robohr capabilities` - Print what the command pipeline understands.

use crate::bootstrap;
use anyhow::{Context, Result};
use robohr_command::{ActionRegistry, AppState, CommandGateway, DisabledSpeech, SystemClock};
use robohr_core::{RobohrConfig, SpeechProvider};
use robohr_store::{InMemoryStore, Stores};
use std::sync::Arc;

/// The registry does not depend on the store backend, so an empty in-memory
/// store is enough to describe it without touching the database.
pub fn run(config: RobohrConfig) -> Result<()> {
    let stores = Stores::shared(Arc::new(InMemoryStore::new()));
    let clock = Arc::new(SystemClock);
    let registry = ActionRegistry::builtin(&stores, &config.actions, clock.clone())
        .context("Failed to register the built-in actions")?;
    let recognizer = bootstrap::build_recognizer(&config, clock)?;
    let gateway = CommandGateway::new(Arc::new(registry), recognizer, Arc::new(DisabledSpeech), &config);
    let speech_enabled = config.speech.provider == SpeechProvider::Http;
    let state = AppState::new(
        Arc::new(gateway),
        Arc::new(DisabledSpeech),
        speech_enabled,
        config.speech.max_audio_bytes,
    );

    println!("{}", serde_json::to_string_pretty(&state.capabilities())?);
    Ok(())
}
