//! HTTP transport for the command gateway.
//!
//! The caller's identity is established upstream and forwarded in the
//! `x-employee-id` and `x-employee-role` headers. Recoverable command
//! failures are answered with 200 and `success: false`; 5xx is reserved
//! for gateway faults.

use crate::error::{GatewayError, SpeechError};
use crate::gateway::CommandGateway;
use crate::protocol::{
    AudioQuery, CapabilitiesEnvelope, CommandBody, CommandDescription, CommandEnvelope,
    ErrorEnvelope, HealthEnvelope, HealthQuery, SpeechBody, SpeechEnvelope,
};
use crate::speech::{SynthesizedSpeech, Synthesizer};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::Engine;
use robohr_core::{CallerContext, CommandRequest, Role};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub const EMPLOYEE_ID_HEADER: &str = "x-employee-id";
pub const ROLE_HEADER: &str = "x-employee-role";

const SPEECH_FORMATS: &[&str] = &["wav", "mp3", "ogg", "webm"];

/// Shared state of the command routes.
pub struct AppState {
    pub gateway: Arc<CommandGateway>,
    pub synthesizer: Arc<dyn Synthesizer>,
    /// Whether audio commands and synthesis are backed by a real provider.
    pub speech_enabled: bool,
    pub max_audio_bytes: usize,
}

impl AppState {
    pub fn new(
        gateway: Arc<CommandGateway>,
        synthesizer: Arc<dyn Synthesizer>,
        speech_enabled: bool,
        max_audio_bytes: usize,
    ) -> Self {
        Self {
            gateway,
            synthesizer,
            speech_enabled,
            max_audio_bytes,
        }
    }

    pub fn capabilities(&self) -> CapabilitiesEnvelope {
        let commands = self
            .gateway
            .registry()
            .descriptors()
            .into_iter()
            .map(|d| CommandDescription {
                name: d.name.clone(),
                description: d.description.clone(),
                required_parameters: d.required_parameters(),
                optional_parameters: d.optional_parameters(),
            })
            .collect();

        let mut features = vec!["text_commands".to_string(), "multilingual_responses".to_string()];
        if self.speech_enabled {
            features.push("voice_commands".to_string());
            features.push("text_to_speech".to_string());
        }
        features.push("low_confidence_flagging".to_string());

        CapabilitiesEnvelope {
            supported_languages: self.gateway.languages().supported().to_vec(),
            commands,
            features,
            speech_formats: if self.speech_enabled {
                SPEECH_FORMATS.iter().map(|f| f.to_string()).collect()
            } else {
                Vec::new()
            },
        }
    }
}

/// Create the HTTP router for the command surface.
pub fn create_router(state: Arc<AppState>) -> Router {
    let audio_limit = state.max_audio_bytes;
    Router::new()
        .route("/command", post(handle_command))
        .route(
            "/command/audio",
            post(handle_audio_command).layer(DefaultBodyLimit::max(audio_limit)),
        )
        .route("/text-to-speech", post(handle_text_to_speech))
        .route("/health", get(handle_health))
        .route("/capabilities", get(handle_capabilities))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn error_response(status: StatusCode, error: &str, message: impl Into<String>) -> Response {
    (status, Json(ErrorEnvelope::new(error, message))).into_response()
}

/// Caller identity from the session headers. A missing role means `employee`.
fn caller_from_headers(headers: &HeaderMap, language: &str) -> Result<CallerContext, Response> {
    let header = |name: &str| -> Result<Option<String>, Response> {
        match headers.get(name) {
            None => Ok(None),
            Some(value) => value
                .to_str()
                .map(|v| Some(v.trim().to_string()))
                .map_err(|_| error_response(StatusCode::BAD_REQUEST, "invalid_header", format!("{} is not valid text", name))),
        }
    };

    let employee_id = match header(EMPLOYEE_ID_HEADER)?.filter(|v| !v.is_empty()) {
        None => None,
        Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
            error_response(
                StatusCode::BAD_REQUEST,
                "invalid_header",
                format!("{} must be an integer, got '{}'", EMPLOYEE_ID_HEADER, raw),
            )
        })?),
    };
    let role = match header(ROLE_HEADER)?.filter(|v| !v.is_empty()) {
        None => Role::Employee,
        Some(raw) => raw.parse::<Role>().map_err(|e| {
            error_response(StatusCode::BAD_REQUEST, "invalid_header", e.to_string())
        })?,
    };
    Ok(CallerContext::new(employee_id, role, language))
}

async fn run_command(state: &AppState, request: CommandRequest, session: CallerContext) -> Response {
    match state.gateway.handle(request, &session).await {
        Ok(response) => (StatusCode::OK, Json(CommandEnvelope::from(response))).into_response(),
        Err(e) => gateway_failure(e),
    }
}

fn gateway_failure(err: GatewayError) -> Response {
    tracing::error!(error = %err, "Command gateway fault");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", err.to_string())
}

async fn handle_command(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CommandBody>,
) -> Response {
    let session = match caller_from_headers(&headers, &body.lang) {
        Ok(session) => session,
        Err(rejection) => return rejection,
    };
    let request = CommandRequest::text(body.text, body.lang).with_employee_id(body.employee_id);
    run_command(&state, request, session).await
}

async fn handle_audio_command(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AudioQuery>,
    audio: Bytes,
) -> Response {
    let session = match caller_from_headers(&headers, &query.lang) {
        Ok(session) => session,
        Err(rejection) => return rejection,
    };
    let request = CommandRequest::audio(audio.to_vec(), query.lang).with_employee_id(query.employee_id);
    run_command(&state, request, session).await
}

async fn handle_text_to_speech(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SpeechBody>,
) -> Response {
    if body.text.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "missing_text", "text is required");
    }
    let language = state.gateway.languages().resolve(&body.lang);

    let envelope = match state.synthesizer.synthesize(body.text.trim(), &language).await {
        Ok(SynthesizedSpeech::Url(url)) => SpeechEnvelope {
            success: true,
            audio_url: Some(url),
            audio_base64: None,
            content_type: None,
            language,
            error: None,
        },
        Ok(SynthesizedSpeech::Inline { content_type, audio }) => SpeechEnvelope {
            success: true,
            audio_url: None,
            audio_base64: Some(base64::engine::general_purpose::STANDARD.encode(audio)),
            content_type: Some(content_type),
            language,
            error: None,
        },
        Err(e) => {
            if !matches!(e, SpeechError::Disabled) {
                tracing::warn!(error = %e, "Speech synthesis failed");
            }
            SpeechEnvelope {
                success: false,
                audio_url: None,
                audio_base64: None,
                content_type: None,
                language,
                error: Some(e.to_string()),
            }
        }
    };
    (StatusCode::OK, Json(envelope)).into_response()
}

async fn handle_health(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HealthQuery>,
) -> Json<HealthEnvelope> {
    if query.refresh {
        state.gateway.refresh_health().await;
    }
    let health = state.gateway.health();
    Json(HealthEnvelope {
        backend_status: "healthy",
        ai_service_status: health.status(),
        checked_secs_ago: health.checked_ago().map(|d| d.as_secs()),
    })
}

async fn handle_capabilities(State(state): State<Arc<AppState>>) -> Json<CapabilitiesEnvelope> {
    Json(state.capabilities())
}

/// HTTP server for the command surface.
pub struct HttpServer {
    addr: String,
    state: Arc<AppState>,
}

impl HttpServer {
    pub fn new(addr: impl Into<String>, state: Arc<AppState>) -> Self {
        Self {
            addr: addr.into(),
            state,
        }
    }

    /// Serve until Ctrl-C.
    pub async fn run(self) -> Result<(), GatewayError> {
        let app = create_router(self.state);

        let listener = tokio::net::TcpListener::bind(&self.addr)
            .await
            .map_err(|e| GatewayError::StartupFailed(format!("Failed to bind to {}: {}", self.addr, e)))?;

        tracing::info!(addr = %self.addr, "Command server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!(error = %e, "Failed to listen for shutdown signal");
                }
                tracing::info!("Shutting down command server");
            })
            .await
            .map_err(|e| GatewayError::Internal(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::recognizer::PatternRecognizer;
    use crate::registry::ActionRegistry;
    use crate::speech::DisabledSpeech;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::NaiveDate;
    use robohr_core::RobohrConfig;
    use robohr_store::{InMemoryStore, Stores};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app() -> Router {
        let config = RobohrConfig::default();
        let clock = Arc::new(FixedClock::new(
            NaiveDate::from_ymd_opt(2026, 10, 19)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        ));
        let stores = Stores::shared(Arc::new(InMemoryStore::with_demo_data()));
        let registry = ActionRegistry::builtin(&stores, &config.actions, clock.clone()).unwrap();
        let recognizer = Arc::new(PatternRecognizer::new(clock.clone()).unwrap());
        let gateway = CommandGateway::new(Arc::new(registry), recognizer, Arc::new(DisabledSpeech), &config)
            .with_clock(clock);
        let state = AppState::new(Arc::new(gateway), Arc::new(DisabledSpeech), false, 1024);
        create_router(Arc::new(state))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn command(body: Value, headers: &[(&str, &str)]) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/command")
            .header("content-type", "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_clock_in_over_http() {
        let response = app()
            .oneshot(command(json!({"text": "clock in", "lang": "en"}), &[(EMPLOYEE_ID_HEADER, "7")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["action"], "clock_in");
        assert_eq!(body["parameters"]["employee_id"], 7);
        assert_eq!(body["original_text"], "clock in");
        assert!(body["execution_result"]["clock_in"].is_string());
    }

    #[tokio::test]
    async fn test_failures_are_200_envelopes() {
        let response = app()
            .oneshot(command(
                json!({"text": "show payroll for employee 3"}),
                &[(EMPLOYEE_ID_HEADER, "7"), (ROLE_HEADER, "employee")],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error_kind"], "forbidden");
    }

    #[tokio::test]
    async fn test_session_id_wins_over_body() {
        let response = app()
            .oneshot(command(
                json!({"text": "show my payroll", "employee_id": 3}),
                &[(EMPLOYEE_ID_HEADER, "7")],
            ))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["parameters"]["employee_id"], 7);
    }

    #[tokio::test]
    async fn test_bad_role_header_is_rejected() {
        let response = app()
            .oneshot(command(json!({"text": "clock in"}), &[(ROLE_HEADER, "superuser")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_capabilities_lists_registry() {
        let response = app()
            .oneshot(Request::builder().uri("/capabilities").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let names: Vec<&str> = body["commands"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|c| c["name"].as_str())
            .collect();
        assert!(names.contains(&"clock_in"));
        assert!(names.contains(&"get_employee_info"));
        assert!(body["supported_languages"].as_array().unwrap().iter().any(|l| l == "en"));
        assert!(body["speech_formats"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_health_refresh() {
        let response = app()
            .oneshot(Request::builder().uri("/health?refresh=true").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["backend_status"], "healthy");
        assert_eq!(body["ai_service_status"], "healthy");
    }

    #[tokio::test]
    async fn test_text_to_speech_disabled() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/text-to-speech")
                    .header("content-type", "application/json")
                    .body(Body::from(json!({"text": "hello", "lang": "fr"}).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["language"], "fr");
    }

    #[tokio::test]
    async fn test_audio_without_speech_provider() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/command/audio?lang=en")
                    .header(EMPLOYEE_ID_HEADER, "7")
                    .body(Body::from(vec![1u8, 2, 3]))
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error_kind"], "service_unavailable");
    }
}
