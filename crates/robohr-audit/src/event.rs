//! Command history events.

use chrono::{DateTime, Utc};
use robohr_core::{ErrorKind, Role};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How the command reached the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Text,
    Audio,
}

/// One processed command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEvent {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,

    /// Caller's employee id, when the session is bound to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<i64>,
    pub role: Role,
    /// Resolved language of the request.
    pub language: String,
    pub input_kind: InputKind,

    /// Typed text, or the transcript for audio input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_text: Option<String>,

    /// Recognized action (absent when recognition failed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,

    /// Wall-clock time from request receipt to composed response.
    pub response_time_ms: u64,
}

impl CommandEvent {
    pub fn builder(role: Role, language: impl Into<String>, input_kind: InputKind) -> CommandEventBuilder {
        CommandEventBuilder::new(role, language, input_kind)
    }

    /// Human-readable single-line rendering.
    ///
    /// Format: `[timestamp] OK|FAIL role=... employee=... action=... [error=...] time_ms=...`
    pub fn to_log_line(&self) -> String {
        let mut line = format!(
            "[{}] {} role={} employee={} action={}",
            self.occurred_at.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            if self.success { "OK" } else { "FAIL" },
            self.role,
            self.employee_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
            self.action.as_deref().unwrap_or("-"),
        );

        if let Some(confidence) = self.confidence {
            line.push_str(&format!(" confidence={:.2}", confidence));
        }
        if let Some(kind) = self.error_kind {
            line.push_str(&format!(" error={}", kind));
        }
        if let Some(ref text) = self.command_text {
            let preview: String = text.chars().take(80).collect();
            line.push_str(&format!(" text=\"{}\"", preview.replace('"', "'")));
        }
        line.push_str(&format!(" time_ms={}", self.response_time_ms));
        line
    }
}

pub struct CommandEventBuilder {
    event: CommandEvent,
}

impl CommandEventBuilder {
    pub fn new(role: Role, language: impl Into<String>, input_kind: InputKind) -> Self {
        Self {
            event: CommandEvent {
                event_id: Uuid::new_v4(),
                occurred_at: Utc::now(),
                employee_id: None,
                role,
                language: language.into(),
                input_kind,
                command_text: None,
                action: None,
                confidence: None,
                success: false,
                error_kind: None,
                response_time_ms: 0,
            },
        }
    }

    pub fn employee_id(mut self, id: Option<i64>) -> Self {
        self.event.employee_id = id;
        self
    }

    pub fn command_text(mut self, text: impl Into<String>) -> Self {
        self.event.command_text = Some(text.into());
        self
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        let action = action.into();
        if !action.is_empty() {
            self.event.action = Some(action);
        }
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.event.confidence = Some(confidence);
        self
    }

    /// Record the outcome: success when `error_kind` is `None`.
    pub fn outcome(mut self, error_kind: Option<ErrorKind>) -> Self {
        self.event.success = error_kind.is_none();
        self.event.error_kind = error_kind;
        self
    }

    pub fn response_time_ms(mut self, ms: u64) -> Self {
        self.event.response_time_ms = ms;
        self
    }

    pub fn build(self) -> CommandEvent {
        self.event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builder() {
        let event = CommandEvent::builder(Role::Employee, "en", InputKind::Text)
            .employee_id(Some(7))
            .command_text("clock in")
            .action("clock_in")
            .confidence(0.92)
            .outcome(None)
            .response_time_ms(41)
            .build();

        assert!(event.success);
        assert_eq!(event.action.as_deref(), Some("clock_in"));
        assert_eq!(event.employee_id, Some(7));
    }

    #[test]
    fn test_empty_action_is_absent() {
        let event = CommandEvent::builder(Role::Admin, "en", InputKind::Audio)
            .action("")
            .outcome(Some(ErrorKind::ServiceUnavailable))
            .build();
        assert!(event.action.is_none());
        assert!(!event.success);
    }

    #[test]
    fn test_to_log_line() {
        let event = CommandEvent::builder(Role::Manager, "es", InputKind::Text)
            .action("view_payroll")
            .command_text("mostrar mi \"nómina\"")
            .outcome(Some(ErrorKind::Forbidden))
            .response_time_ms(12)
            .build();

        let line = event.to_log_line();
        assert!(line.contains("FAIL role=manager employee=- action=view_payroll"));
        assert!(line.contains("error=forbidden"));
        assert!(line.contains("text=\"mostrar mi 'nómina'\""));
        assert!(line.ends_with("time_ms=12"));
    }
}
