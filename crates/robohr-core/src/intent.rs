//! Structured interpretation of a natural-language command.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Intent produced once per request by the intent client. Immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    /// Canonical action name, e.g. `clock_in`.
    pub action: String,
    /// Raw parameters extracted by the interpreter.
    #[serde(default)]
    pub parameters: Map<String, Value>,
    /// Interpreter confidence in `[0, 1]`.
    pub confidence: f64,
    /// Language the interpreter detected or was told.
    pub language_detected: String,
    /// Suggested alternative actions, most likely first.
    #[serde(default)]
    pub alternatives: Vec<String>,
}

impl Intent {
    /// Build an intent, clamping the confidence into `[0, 1]`.
    pub fn new(
        action: impl Into<String>,
        parameters: Map<String, Value>,
        confidence: f64,
        language_detected: impl Into<String>,
    ) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            action: action.into(),
            parameters,
            confidence,
            language_detected: language_detected.into(),
            alternatives: Vec::new(),
        }
    }

    pub fn with_alternatives(mut self, alternatives: Vec<String>) -> Self {
        self.alternatives = alternatives;
        self
    }

    /// Whether the interpreter's confidence falls below `threshold`.
    pub fn is_low_confidence(&self, threshold: f64) -> bool {
        self.confidence < threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(Intent::new("clock_in", Map::new(), 1.7, "en").confidence, 1.0);
        assert_eq!(Intent::new("clock_in", Map::new(), -0.2, "en").confidence, 0.0);
        assert_eq!(Intent::new("clock_in", Map::new(), f64::NAN, "en").confidence, 0.0);
    }

    #[test]
    fn test_low_confidence() {
        let intent = Intent::new("clock_in", Map::new(), 0.0, "en");
        assert!(intent.is_low_confidence(0.5));
        let intent = Intent::new("clock_in", Map::new(), 0.5, "en");
        assert!(!intent.is_low_confidence(0.5));
    }
}
