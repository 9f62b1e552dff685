//! # robohr-core
//!
//! Types shared by every RoboHR crate: the caller's identity, the structured
//! intent returned by the interpreter, per-request command values, the error
//! taxonomy of the command pipeline, language resolution and configuration.

// Configuration types shared across all RoboHR crates
pub mod config;

pub mod caller;
pub mod command;
pub mod intent;
pub mod language;

pub use caller::{CallerContext, Role};
pub use command::{CommandInput, CommandRequest, CommandResult, DispatchStage, ErrorKind};
pub use config::{
    ActionsConfig, ConfigError, GatewayConfig, HistoryBackend, HistoryConfig, IntentProvider,
    IntentServiceConfig, LanguagesConfig, LowConfidencePolicy, RobohrConfig, ServerConfig,
    SpeechConfig, SpeechProvider, StoreBackend, StoreConfig,
};
pub use intent::Intent;
pub use language::LanguagePolicy;
