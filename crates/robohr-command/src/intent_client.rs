//! Intent recognition client.
//!
//! [`IntentRecognizer`] is the seam between the gateway and whatever turns
//! free text into an [`Intent`]. [`HttpIntentClient`] talks to the remote
//! recognition service; the offline pattern recognizer lives in
//! [`crate::recognizer`].

use crate::error::RecognitionFailure;
use async_trait::async_trait;
use reqwest::Client;
use robohr_core::{CallerContext, Intent, IntentServiceConfig};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Turns free text into a structured intent.
#[async_trait]
pub trait IntentRecognizer: Send + Sync {
    /// Short name used in logs and the capabilities document.
    fn name(&self) -> &str;

    /// Interpret one command. Never retries.
    async fn interpret(
        &self,
        text: &str,
        language: &str,
        caller: &CallerContext,
    ) -> Result<Intent, RecognitionFailure>;

    /// Cheap liveness check used by the health cache.
    async fn probe(&self) -> bool;
}

#[derive(Debug, Serialize)]
struct InterpretRequest<'a> {
    text: &'a str,
    lang: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    employee_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct InterpretResponse {
    #[serde(default)]
    action: String,
    #[serde(default)]
    parameters: Map<String, Value>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    alternatives: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeResponse {
    #[serde(default)]
    status: Option<String>,
}

/// Client for the remote intent recognition service.
#[derive(Debug, Clone)]
pub struct HttpIntentClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpIntentClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &IntentServiceConfig) -> Result<Self, reqwest::Error> {
        Self::new(
            config.base_url.clone(),
            Duration::from_secs(config.text_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl IntentRecognizer for HttpIntentClient {
    fn name(&self) -> &str {
        "http"
    }

    async fn interpret(
        &self,
        text: &str,
        language: &str,
        caller: &CallerContext,
    ) -> Result<Intent, RecognitionFailure> {
        let text = text.trim();
        if text.is_empty() {
            return Err(RecognitionFailure::EmptyInput);
        }

        let url = format!("{}/nlp/command", self.base_url);
        tracing::debug!(%url, language, "Requesting intent");
        let response = self
            .client
            .post(&url)
            .json(&InterpretRequest {
                text,
                lang: language,
                employee_id: caller.employee_id,
            })
            .send()
            .await
            .map_err(|e| RecognitionFailure::ServiceUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RecognitionFailure::ServiceUnavailable(format!(
                "service answered with status {}",
                status
            )));
        }

        let body: InterpretResponse = response
            .json()
            .await
            .map_err(|e| RecognitionFailure::MalformedResponse(e.to_string()))?;
        if body.action.trim().is_empty() {
            return Err(RecognitionFailure::MalformedResponse(
                "response carries no action".to_string(),
            ));
        }

        let intent = Intent::new(
            body.action.trim(),
            body.parameters,
            body.confidence.unwrap_or(0.0),
            body.language.unwrap_or_else(|| language.to_string()),
        )
        .with_alternatives(body.alternatives);
        tracing::debug!(action = %intent.action, confidence = intent.confidence, "Intent recognized");
        Ok(intent)
    }

    async fn probe(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(%url, error = %e, "Health probe failed");
                return false;
            }
        };
        if !response.status().is_success() {
            return false;
        }
        match response.json::<ProbeResponse>().await {
            Ok(body) => body.status.as_deref() != Some("unhealthy"),
            Err(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use robohr_core::Role;
    use serde_json::json;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn caller() -> CallerContext {
        CallerContext::new(Some(7), Role::Employee, "en")
    }

    #[tokio::test]
    async fn test_interpret_parses_intent() {
        let router = Router::new().route(
            "/nlp/command",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["employee_id"], 7);
                Json(json!({
                    "success": true,
                    "action": "view_payroll",
                    "parameters": {"employee_id": 7},
                    "confidence": 1.7,
                    "language": "en",
                    "original_text": body["text"],
                    "suggestions": ["ignored"]
                }))
            }),
        );
        let base = serve(router).await;
        let client = HttpIntentClient::new(base, Duration::from_secs(2)).unwrap();

        let intent = client.interpret("show my payroll", "en", &caller()).await.unwrap();
        assert_eq!(intent.action, "view_payroll");
        assert_eq!(intent.parameters["employee_id"], 7);
        assert_eq!(intent.confidence, 1.0);
    }

    #[tokio::test]
    async fn test_error_status_is_unavailable() {
        let router = Router::new().route(
            "/nlp/command",
            post(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let client = HttpIntentClient::new(serve(router).await, Duration::from_secs(2)).unwrap();
        let err = client.interpret("clock in", "en", &caller()).await.unwrap_err();
        assert!(matches!(err, RecognitionFailure::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_missing_action_is_malformed() {
        let router = Router::new().route(
            "/nlp/command",
            post(|| async { Json(json!({"parameters": {}})) }),
        );
        let client = HttpIntentClient::new(serve(router).await, Duration::from_secs(2)).unwrap();
        let err = client.interpret("clock in", "en", &caller()).await.unwrap_err();
        assert!(matches!(err, RecognitionFailure::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_slow_service_times_out() {
        let router = Router::new().route(
            "/nlp/command",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({"action": "clock_in"}))
            }),
        );
        let client = HttpIntentClient::new(serve(router).await, Duration::from_millis(200)).unwrap();
        let err = client.interpret("clock in", "en", &caller()).await.unwrap_err();
        assert!(matches!(err, RecognitionFailure::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected_locally() {
        let client = HttpIntentClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let err = client.interpret("   ", "en", &caller()).await.unwrap_err();
        assert_eq!(err, RecognitionFailure::EmptyInput);
    }

    #[tokio::test]
    async fn test_probe() {
        let router = Router::new().route("/health", get(|| async { Json(json!({"status": "degraded"})) }));
        let client = HttpIntentClient::new(serve(router).await, Duration::from_secs(2)).unwrap();
        assert!(client.probe().await);

        let router = Router::new().route("/health", get(|| async { Json(json!({"status": "unhealthy"})) }));
        let client = HttpIntentClient::new(serve(router).await, Duration::from_secs(2)).unwrap();
        assert!(!client.probe().await);

        let client = HttpIntentClient::new("http://127.0.0.1:9", Duration::from_millis(300)).unwrap();
        assert!(!client.probe().await);
    }
}
