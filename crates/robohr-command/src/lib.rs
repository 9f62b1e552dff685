//! # robohr-command
//!
//! Command interpretation and execution pipeline for RoboHR.
//!
//! Free-form text (typed, or transcribed from audio) is turned into an intent
//! by an [`IntentRecognizer`], validated and executed by the [`Dispatcher`]
//! against the [`ActionRegistry`], and rendered for the caller by the
//! [`ResponseComposer`]. The [`CommandGateway`] ties the stages together and
//! applies the request-level policies.
//!
//! ## Architecture
//!
//! ```text
//! POST /command, /command/audio
//!       │
//!       ▼
//! ┌──────────────────────┐
//! │ CommandGateway        │
//! │ 1. Transcribe audio   │  ← Transcriber
//! │ 2. Health gate        │  ← HealthCache
//! │ 3. Recognize intent   │  ← IntentRecognizer (HTTP or pattern)
//! │ 4. Dispatch           │  ← Dispatcher + ActionRegistry
//! │ 5. Compose response   │  ← ResponseComposer
//! │ 6. Record history     │  ← robohr-audit
//! └──────────┬───────────┘
//!            ▼
//!     employee / attendance / leave / payroll stores
//! ```
//!
//! ## Failure handling
//!
//! Every recoverable failure is reported as a [`robohr_core::CommandResult`]
//! with an [`robohr_core::ErrorKind`]. Nothing is retried automatically.
//! Only store backend faults escape as [`GatewayError`].

pub mod actions;
pub mod clock;
pub mod composer;
pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod health;
pub mod http_transport;
pub mod intent_client;
pub mod parameters;
pub mod protocol;
pub mod recognizer;
pub mod registry;
pub mod speech;

pub use clock::{Clock, FixedClock, SystemClock};
pub use composer::{ResponseComposer, UserResponse};
pub use dispatcher::Dispatcher;
pub use error::{
    DispatchError, GatewayError, HandlerError, RecognitionFailure, RegistryError, SpeechError,
};
pub use gateway::{CommandGateway, GatewayResponse};
pub use health::{HealthCache, HealthStatus, spawn_probe};
pub use http_transport::{AppState, HttpServer, create_router};
pub use intent_client::{HttpIntentClient, IntentRecognizer};
pub use parameters::{ParamKind, ParamSpec, ParamValue, Parameters};
pub use protocol::{CapabilitiesEnvelope, CommandEnvelope};
pub use recognizer::PatternRecognizer;
pub use registry::{
    Access, ActionDescriptor, ActionHandler, ActionRegistry, HandlerOutcome, StoreKind,
};
pub use speech::{DisabledSpeech, HttpSpeechClient, SynthesizedSpeech, Synthesizer, Transcriber};
