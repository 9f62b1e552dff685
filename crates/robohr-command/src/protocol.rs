//! Wire types of the command HTTP surface.

use crate::gateway::GatewayResponse;
use crate::health::HealthStatus;
use robohr_core::ErrorKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn default_lang() -> String {
    "en".to_string()
}

/// `POST /command` body.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandBody {
    pub text: String,
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default)]
    pub employee_id: Option<i64>,
}

/// `POST /command/audio` query string.
#[derive(Debug, Clone, Deserialize)]
pub struct AudioQuery {
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default)]
    pub employee_id: Option<i64>,
}

/// Answer to a command, successful or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub success: bool,
    pub action: String,
    pub parameters: Map<String, Value>,
    /// Composed, localized message.
    pub message: String,
    pub confidence: f64,
    /// Handler payload, or null.
    pub execution_result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<ErrorKind>,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
    pub speakable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spoken_summary: Option<String>,
}

impl From<GatewayResponse> for CommandEnvelope {
    fn from(r: GatewayResponse) -> Self {
        Self {
            success: r.result.success,
            action: r.result.action,
            parameters: r.result.parameters,
            message: r.response.text,
            confidence: r.confidence.unwrap_or(0.0),
            execution_result: r.result.data,
            error_kind: r.result.error_kind,
            flags: r.response.flags,
            language: r.language,
            original_text: r.original_text,
            speakable: r.response.speakable,
            spoken_summary: r.response.spoken_summary,
        }
    }
}

/// `POST /text-to-speech` body.
#[derive(Debug, Clone, Deserialize)]
pub struct SpeechBody {
    pub text: String,
    #[serde(default = "default_lang")]
    pub lang: String,
}

/// Synthesized audio: a reference or the bytes themselves (base64).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct HealthQuery {
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthEnvelope {
    pub backend_status: &'static str,
    pub ai_service_status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_secs_ago: Option<u64>,
}

/// One registry entry as advertised to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandDescription {
    pub name: String,
    pub description: String,
    pub required_parameters: Vec<String>,
    pub optional_parameters: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilitiesEnvelope {
    pub supported_languages: Vec<String>,
    pub commands: Vec<CommandDescription>,
    pub features: Vec<String>,
    pub speech_formats: Vec<String>,
}

/// Body of 4xx/5xx answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: String,
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            message: message.into(),
        }
    }
}
