//! Language code resolution.

use crate::config::LanguagesConfig;

/// Resolves requested language codes against the supported set.
///
/// Unsupported or empty codes never fail a request; they resolve to the
/// configured fallback.
#[derive(Debug, Clone)]
pub struct LanguagePolicy {
    supported: Vec<String>,
    fallback: String,
}

impl LanguagePolicy {
    pub fn new(config: &LanguagesConfig) -> Self {
        Self {
            supported: config
                .supported
                .iter()
                .map(|c| c.trim().to_ascii_lowercase())
                .collect(),
            fallback: config.fallback.trim().to_ascii_lowercase(),
        }
    }

    /// Resolve a requested code, e.g. `"ES-mx"` becomes `"es"` when `es` is supported.
    pub fn resolve(&self, requested: &str) -> String {
        let normalized = requested.trim().to_ascii_lowercase().replace('_', "-");
        if self.is_supported(&normalized) {
            return normalized;
        }
        if let Some((primary, _)) = normalized.split_once('-') {
            if self.is_supported(primary) {
                return primary.to_string();
            }
        }
        self.fallback.clone()
    }

    pub fn is_supported(&self, code: &str) -> bool {
        self.supported.iter().any(|c| c == code)
    }

    pub fn supported(&self) -> &[String] {
        &self.supported
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }
}

impl Default for LanguagePolicy {
    fn default() -> Self {
        Self::new(&LanguagesConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve() {
        let policy = LanguagePolicy::default();
        assert_eq!(policy.resolve("es"), "es");
        assert_eq!(policy.resolve("FR"), "fr");
        assert_eq!(policy.resolve("es-MX"), "es");
        assert_eq!(policy.resolve("pt_BR"), "pt");
        assert_eq!(policy.resolve("xx"), "en");
        assert_eq!(policy.resolve(""), "en");
    }
}
