//! Localized string lookup for user-facing error text.

use std::collections::HashMap;

/// Keys used by the gateway itself
pub mod keys {
    pub const UNSUPPORTED_SOURCE_LANG: &str = "UnsupportedSourceLang";
    pub const UNSUPPORTED_TARGET_LANG: &str = "UnsupportedTargetLang";
    pub const SERVICE_NOT_FOUND: &str = "ServiceNotFound";
    pub const SERVICE_DISABLED: &str = "ServiceDisabled";
    pub const CAPABILITY_NOT_SUPPORTED: &str = "CapabilityNotSupported";
    pub const TEXT_TOO_LONG: &str = "TextTooLong";
}

/// `GetTranslation(key) -> string`
pub trait Localizer: Send + Sync {
    /// Look up `key`. Unknown keys return the key itself so the user
    /// always sees something.
    fn get_translation(&self, key: &str) -> String;
}

/// Table-backed localizer
#[derive(Debug, Clone, Default)]
pub struct StaticLocalizer {
    strings: HashMap<String, String>,
}

impl StaticLocalizer {
    pub fn new(strings: HashMap<String, String>) -> Self {
        Self { strings }
    }

    /// Built-in English strings
    pub fn english() -> Self {
        let strings = [
            (keys::UNSUPPORTED_SOURCE_LANG, "Unsupported source language"),
            (keys::UNSUPPORTED_TARGET_LANG, "Unsupported target language"),
            (keys::SERVICE_NOT_FOUND, "Service not found"),
            (keys::SERVICE_DISABLED, "Service is disabled"),
            (
                keys::CAPABILITY_NOT_SUPPORTED,
                "This service does not support the requested operation",
            ),
            (keys::TEXT_TOO_LONG, "Text exceeds the maximum length"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self { strings }
    }

    /// Add or replace a string
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.strings.insert(key.into(), value.into());
        self
    }
}

impl Localizer for StaticLocalizer {
    fn get_translation(&self, key: &str) -> String {
        self.strings
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_table() {
        let l10n = StaticLocalizer::english();
        assert_eq!(
            l10n.get_translation(keys::UNSUPPORTED_SOURCE_LANG),
            "Unsupported source language"
        );
    }

    #[test]
    fn test_unknown_key_falls_back_to_key() {
        let l10n = StaticLocalizer::default();
        assert_eq!(l10n.get_translation("Missing"), "Missing");
    }

    #[test]
    fn test_override() {
        let l10n = StaticLocalizer::english().with(keys::SERVICE_NOT_FOUND, "Service introuvable");
        assert_eq!(
            l10n.get_translation(keys::SERVICE_NOT_FOUND),
            "Service introuvable"
        );
    }
}
