//! Command gateway.
//!
//! Entry point of the pipeline: transcription (for audio), health gating,
//! intent recognition, dispatch and composition, all under one overall
//! timeout. Recoverable failures come back as a failed [`CommandResult`]
//! inside an `Ok`; only unexpected faults surface as [`GatewayError`].

use crate::clock::Clock;
use crate::composer::{ResponseComposer, UserResponse};
use crate::dispatcher::Dispatcher;
use crate::error::GatewayError;
use crate::health::HealthCache;
use crate::intent_client::IntentRecognizer;
use crate::registry::ActionRegistry;
use crate::speech::Transcriber;
use robohr_audit::{CommandEvent, CommandLogger, InputKind};
use robohr_core::{
    CallerContext, CommandInput, CommandRequest, CommandResult, DispatchStage, ErrorKind, Intent,
    LanguagePolicy, RobohrConfig,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// Everything the transport needs to answer one command.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub result: CommandResult,
    pub response: UserResponse,
    /// Interpreter confidence, when an intent was produced.
    pub confidence: Option<f64>,
    /// Resolved language of the exchange.
    pub language: String,
    /// The command text (typed, or transcribed from audio).
    pub original_text: Option<String>,
}

/// What the pipeline produced before composition.
struct Outcome {
    text: Option<String>,
    intent: Option<Intent>,
    result: CommandResult,
}

impl Outcome {
    fn failed(text: Option<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            text,
            intent: None,
            result: CommandResult::failure("", kind, message).with_stage(DispatchStage::RecognitionFailed),
        }
    }
}

pub struct CommandGateway {
    dispatcher: Dispatcher,
    recognizer: Arc<dyn IntentRecognizer>,
    transcriber: Arc<dyn Transcriber>,
    composer: ResponseComposer,
    languages: LanguagePolicy,
    health: Arc<HealthCache>,
    history: CommandLogger,
    text_timeout: Duration,
    audio_timeout: Duration,
    overall_timeout: Duration,
}

impl CommandGateway {
    pub fn new(
        registry: Arc<ActionRegistry>,
        recognizer: Arc<dyn IntentRecognizer>,
        transcriber: Arc<dyn Transcriber>,
        config: &RobohrConfig,
    ) -> Self {
        let dispatcher = Dispatcher::new(registry)
            .with_confidence_threshold(config.intent.confidence_threshold)
            .with_low_confidence_policy(config.intent.low_confidence_policy);
        Self {
            dispatcher,
            recognizer,
            transcriber,
            composer: ResponseComposer::new(config.actions.speakable_record_limit),
            languages: LanguagePolicy::new(&config.languages),
            health: Arc::new(HealthCache::new(config.gateway.health_cache_window())),
            history: CommandLogger::disabled(),
            text_timeout: Duration::from_secs(config.intent.text_timeout_secs),
            audio_timeout: Duration::from_secs(config.intent.audio_timeout_secs),
            overall_timeout: config.gateway.overall_timeout(),
        }
    }

    pub fn with_history(mut self, history: CommandLogger) -> Self {
        self.history = history;
        self
    }

    /// Clock used to resolve relative dates in parameters.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.dispatcher = self.dispatcher.with_clock(clock);
        self
    }

    pub fn with_health_cache(mut self, health: Arc<HealthCache>) -> Self {
        self.health = health;
        self
    }

    pub fn with_timeouts(mut self, text: Duration, audio: Duration, overall: Duration) -> Self {
        self.text_timeout = text;
        self.audio_timeout = audio;
        self.overall_timeout = overall;
        self
    }

    pub fn registry(&self) -> &ActionRegistry {
        self.dispatcher.registry()
    }

    pub fn recognizer(&self) -> &Arc<dyn IntentRecognizer> {
        &self.recognizer
    }

    pub fn health(&self) -> &Arc<HealthCache> {
        &self.health
    }

    pub fn languages(&self) -> &LanguagePolicy {
        &self.languages
    }

    pub fn history(&self) -> &CommandLogger {
        &self.history
    }

    /// Probe the recognizer now and record the outcome.
    pub async fn refresh_health(&self) -> bool {
        let healthy = self.recognizer.probe().await;
        self.health.record(healthy);
        healthy
    }

    /// Run one command for the caller of `session`.
    ///
    /// The session's employee id wins over the id carried in the request.
    pub async fn handle(
        &self,
        request: CommandRequest,
        session: &CallerContext,
    ) -> Result<GatewayResponse, GatewayError> {
        let started = Instant::now();
        let language = self.languages.resolve(&request.language);
        let caller = CallerContext::new(
            session.employee_id.or(request.caller_employee_id),
            session.role,
            language.clone(),
        );
        let input_kind = match request.input {
            CommandInput::Text(_) => InputKind::Text,
            CommandInput::Audio(_) => InputKind::Audio,
        };

        let recognizing = AtomicBool::new(false);
        let run = self.run(&request.input, &caller, &recognizing);
        let outcome = match timeout(self.overall_timeout, run).await {
            Ok(outcome) => outcome?,
            Err(_) => {
                let abandoned_recognition = recognizing.load(Ordering::SeqCst);
                tracing::warn!(
                    timeout_secs = self.overall_timeout.as_secs_f64(),
                    abandoned_recognition,
                    "Command exceeded the overall timeout"
                );
                if abandoned_recognition {
                    self.health.record(false);
                }
                Outcome::failed(
                    None,
                    ErrorKind::ServiceUnavailable,
                    format!("Command timed out after {:.1}s", self.overall_timeout.as_secs_f64()),
                )
            }
        };

        let response = self.composer.compose(&outcome.result, &language);
        let confidence = outcome.intent.as_ref().map(|i| i.confidence);
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            action = %outcome.result.action,
            success = outcome.result.success,
            error_kind = ?outcome.result.error_kind,
            elapsed_ms,
            "Command handled"
        );

        let mut event = CommandEvent::builder(caller.role, language.clone(), input_kind)
            .employee_id(caller.employee_id)
            .action(outcome.result.action.clone())
            .outcome(outcome.result.error_kind)
            .response_time_ms(elapsed_ms);
        if let Some(text) = &outcome.text {
            event = event.command_text(text.clone());
        }
        if let Some(confidence) = confidence {
            event = event.confidence(confidence);
        }
        if let Err(e) = self.history.log(event.build()).await {
            tracing::warn!(error = %e, "Failed to record command history");
        }

        Ok(GatewayResponse {
            result: outcome.result,
            response,
            confidence,
            language,
            original_text: outcome.text,
        })
    }

    /// `recognizing` is set while the recognizer call is in flight.
    async fn run(
        &self,
        input: &CommandInput,
        caller: &CallerContext,
        recognizing: &AtomicBool,
    ) -> Result<Outcome, GatewayError> {
        let text = match input {
            CommandInput::Text(text) => text.trim().to_string(),
            CommandInput::Audio(audio) => {
                match timeout(self.audio_timeout, self.transcriber.transcribe(audio, &caller.language)).await {
                    Ok(Ok(text)) => text.trim().to_string(),
                    Ok(Err(e)) => {
                        tracing::warn!(error = %e, "Transcription failed");
                        return Ok(Outcome::failed(None, ErrorKind::ServiceUnavailable, e.to_string()));
                    }
                    Err(_) => {
                        tracing::warn!("Transcription timed out");
                        return Ok(Outcome::failed(
                            None,
                            ErrorKind::ServiceUnavailable,
                            "speech service timed out",
                        ));
                    }
                }
            }
        };
        if text.is_empty() {
            return Ok(Outcome::failed(None, ErrorKind::MissingParameter, "Command text is empty"));
        }

        if self.health.is_failing() {
            tracing::debug!("Skipping intent recognition, service recently unhealthy");
            return Ok(Outcome::failed(
                Some(text),
                ErrorKind::ServiceUnavailable,
                "AI service unavailable",
            ));
        }

        recognizing.store(true, Ordering::SeqCst);
        let recognized = timeout(
            self.text_timeout,
            self.recognizer.interpret(&text, &caller.language, caller),
        )
        .await;
        recognizing.store(false, Ordering::SeqCst);
        let intent = match recognized {
            Ok(Ok(intent)) => {
                self.health.record(true);
                intent
            }
            Ok(Err(failure)) => {
                tracing::warn!(error = %failure, "Intent recognition failed");
                if failure.affects_health() {
                    self.health.record(false);
                }
                return Ok(Outcome::failed(Some(text), failure.kind(), failure.to_string()));
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.text_timeout.as_secs_f64(),
                    "Intent recognition timed out"
                );
                self.health.record(false);
                return Ok(Outcome::failed(
                    Some(text),
                    ErrorKind::ServiceUnavailable,
                    "intent recognition service timed out",
                ));
            }
        };

        let result = self.dispatcher.dispatch(&intent, caller).await?;
        Ok(Outcome {
            text: Some(text),
            intent: Some(intent),
            result,
        })
    }
}
