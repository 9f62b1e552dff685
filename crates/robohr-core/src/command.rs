//! Per-request command values and the pipeline's error taxonomy.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Exhaustive failure taxonomy shared by the dispatcher and the composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Interpreter or transcription provider unreachable or timed out.
    ServiceUnavailable,
    /// Valid intent whose confidence is below the configured threshold.
    RecognitionLowConfidence,
    /// No registry entry for the recognized action.
    UnknownAction,
    /// A required parameter is absent (or malformed) and has no fallback.
    MissingParameter,
    /// The caller is not allowed to run the action on the target.
    Forbidden,
    /// A name or id lookup came back empty.
    NotFound,
    /// The store refused the operation for a business reason.
    DomainRejected,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ServiceUnavailable => "service_unavailable",
            Self::RecognitionLowConfidence => "recognition_low_confidence",
            Self::UnknownAction => "unknown_action",
            Self::MissingParameter => "missing_parameter",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::DomainRejected => "domain_rejected",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stages a request moves through inside the dispatcher.
///
/// `Received -> Recognized -> Authorized -> Executed -> Completed`, with the
/// terminal exits `RecognitionFailed` (from `Received`) and `ExecutionFailed`
/// (from `Authorized`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStage {
    Received,
    Recognized,
    Authorized,
    Executed,
    Completed,
    RecognitionFailed,
    ExecutionFailed,
}

impl fmt::Display for DispatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Received => "received",
            Self::Recognized => "recognized",
            Self::Authorized => "authorized",
            Self::Executed => "executed",
            Self::Completed => "completed",
            Self::RecognitionFailed => "recognition_failed",
            Self::ExecutionFailed => "execution_failed",
        };
        f.write_str(s)
    }
}

/// The authoritative input of a command: typed text or recorded audio, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandInput {
    Text(String),
    Audio(Vec<u8>),
}

/// A raw command as received by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub input: CommandInput,
    /// Requested language code (resolved against the supported set by the gateway).
    pub language: String,
    /// Employee id hint from the request body. The session identity wins over it.
    pub caller_employee_id: Option<i64>,
}

impl CommandRequest {
    pub fn text(text: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            input: CommandInput::Text(text.into()),
            language: language.into(),
            caller_employee_id: None,
        }
    }

    pub fn audio(audio: Vec<u8>, language: impl Into<String>) -> Self {
        Self {
            input: CommandInput::Audio(audio),
            language: language.into(),
            caller_employee_id: None,
        }
    }

    pub fn with_employee_id(mut self, employee_id: Option<i64>) -> Self {
        self.caller_employee_id = employee_id;
        self
    }
}

/// Normalized outcome of one command. Created per request and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    /// The action the result belongs to (as recognized).
    pub action: String,
    pub success: bool,
    /// Handler payload, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Message for the end user (or the reason for the failure).
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Parameters after coercion and caller defaults were applied.
    #[serde(default)]
    pub parameters: serde_json::Map<String, Value>,
    /// Non-fatal conditions attached to the result (e.g. low recognition confidence).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<ErrorKind>,
    /// Last stage the request reached.
    pub stage: DispatchStage,
}

impl CommandResult {
    /// A successful execution.
    pub fn success(action: impl Into<String>, data: Option<Value>, message: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            success: true,
            data,
            message: message.into(),
            error_kind: None,
            parameters: serde_json::Map::new(),
            flags: Vec::new(),
            stage: DispatchStage::Completed,
        }
    }

    /// A failed command of the given kind.
    pub fn failure(action: impl Into<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        let stage = match kind {
            ErrorKind::ServiceUnavailable => DispatchStage::RecognitionFailed,
            ErrorKind::NotFound | ErrorKind::DomainRejected => DispatchStage::ExecutionFailed,
            _ => DispatchStage::Completed,
        };
        Self {
            action: action.into(),
            success: false,
            data: None,
            message: message.into(),
            error_kind: Some(kind),
            parameters: serde_json::Map::new(),
            flags: Vec::new(),
            stage,
        }
    }

    pub fn with_parameters(mut self, parameters: serde_json::Map<String, Value>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Attach a non-fatal flag (kept unique).
    pub fn with_flag(mut self, flag: ErrorKind) -> Self {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
        self
    }

    pub fn with_stage(mut self, stage: DispatchStage) -> Self {
        self.stage = stage;
        self
    }

    pub fn is_flagged(&self, flag: ErrorKind) -> bool {
        self.flags.contains(&flag)
    }

    /// Number of records carried in `data`, when it is a list.
    pub fn record_count(&self) -> Option<usize> {
        match &self.data {
            Some(Value::Array(items)) => Some(items.len()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failure_stage_follows_kind() {
        let r = CommandResult::failure("clock_in", ErrorKind::DomainRejected, "already in");
        assert_eq!(r.stage, DispatchStage::ExecutionFailed);

        let r = CommandResult::failure("x", ErrorKind::UnknownAction, "nope");
        assert_eq!(r.stage, DispatchStage::Completed);

        let r = CommandResult::failure("", ErrorKind::ServiceUnavailable, "down");
        assert_eq!(r.stage, DispatchStage::RecognitionFailed);
    }

    #[test]
    fn test_error_kind_serializes_snake_case() {
        let v = serde_json::to_value(ErrorKind::RecognitionLowConfidence).unwrap();
        assert_eq!(v, json!("recognition_low_confidence"));
        assert_eq!(ErrorKind::DomainRejected.to_string(), "domain_rejected");
    }

    #[test]
    fn test_record_count() {
        let r = CommandResult::success("view_payroll", Some(json!([1, 2, 3])), "ok");
        assert_eq!(r.record_count(), Some(3));
        let r = CommandResult::success("clock_in", Some(json!({"id": 1})), "ok");
        assert_eq!(r.record_count(), None);
    }

    #[test]
    fn test_flags_are_unique() {
        let r = CommandResult::success("clock_in", None, "ok")
            .with_flag(ErrorKind::RecognitionLowConfidence)
            .with_flag(ErrorKind::RecognitionLowConfidence);
        assert_eq!(r.flags, vec![ErrorKind::RecognitionLowConfidence]);
        assert!(r.success);
        assert!(r.is_flagged(ErrorKind::RecognitionLowConfidence));
    }
}
