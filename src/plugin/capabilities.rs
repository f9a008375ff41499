//! Capability Traits
//!
//! A provider declares which of the three capabilities it implements through
//! its [`PluginManifest`](super::metadata::PluginManifest) and exposes each one
//! through an explicit accessor on [`Plugin`]. The dispatcher checks the
//! declared [`CapabilitySet`] first and then asks for the accessor; it never
//! inspects concrete provider types.
//!
//! # Implementing a provider
//!
//! ```ignore
//! use lingo_gateway::plugin::prelude::*;
//!
//! struct Echo { manifest: PluginManifest }
//!
//! impl LanguageMapping for Echo {
//!     fn map_source_language(&self, lang: LangEnum) -> Option<String> {
//!         Some(lang.as_str().to_string())
//!     }
//!     fn map_target_language(&self, lang: LangEnum) -> Option<String> {
//!         Some(lang.as_str().to_string())
//!     }
//! }
//!
//! #[async_trait]
//! impl TranslatePlugin for Echo {
//!     async fn translate(
//!         &self,
//!         request: &MappedRequest<'_>,
//!         _cancel: &CancellationToken,
//!     ) -> Result<String, ProviderError> {
//!         Ok(request.text.to_string())
//!     }
//! }
//!
//! #[async_trait]
//! impl Plugin for Echo {
//!     fn manifest(&self) -> PluginManifest { self.manifest.clone() }
//!     async fn init(&mut self, _ctx: PluginContext) -> Result<(), PluginError> { Ok(()) }
//!     fn as_translate(&self) -> Option<&dyn TranslatePlugin> { Some(self) }
//! }
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::isolation::PluginError;
use super::lifecycle::PluginContext;
use super::metadata::PluginManifest;
use crate::core::lang::LangEnum;
use crate::errors::{HttpError, StorageError};

// =============================================================================
// Capability tags
// =============================================================================

/// One of the operations a provider can offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Translate,
    Dictionary,
    TextToSpeech,
}

impl Capability {
    pub const ALL: [Capability; 3] = [
        Capability::Translate,
        Capability::Dictionary,
        Capability::TextToSpeech,
    ];

    const fn bit(self) -> u8 {
        match self {
            Capability::Translate => 0b001,
            Capability::Dictionary => 0b010,
            Capability::TextToSpeech => 0b100,
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::Translate => write!(f, "translate"),
            Capability::Dictionary => write!(f, "dictionary"),
            Capability::TextToSpeech => write!(f, "text_to_speech"),
        }
    }
}

/// Bitmask of declared capabilities
///
/// Serialized as a list of capability names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "Vec<Capability>", from = "Vec<Capability>")]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    pub const EMPTY: CapabilitySet = CapabilitySet(0);

    pub const fn of(capability: Capability) -> Self {
        CapabilitySet(capability.bit())
    }

    pub const fn with(self, capability: Capability) -> Self {
        CapabilitySet(self.0 | capability.bit())
    }

    pub const fn contains(&self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, capability: Capability) {
        self.0 |= capability.bit();
    }

    /// Capabilities in declaration order
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL.into_iter().filter(|c| self.contains(*c))
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter()
            .fold(CapabilitySet::EMPTY, |set, capability| set.with(capability))
    }
}

impl From<Vec<Capability>> for CapabilitySet {
    fn from(capabilities: Vec<Capability>) -> Self {
        capabilities.into_iter().collect()
    }
}

impl From<CapabilitySet> for Vec<Capability> {
    fn from(set: CapabilitySet) -> Self {
        set.iter().collect()
    }
}

impl std::fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.iter().map(|c| c.to_string()).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

// =============================================================================
// Requests and payloads
// =============================================================================

/// Capability invocation request as submitted by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityRequest {
    pub source_lang: LangEnum,
    pub target_lang: LangEnum,
    pub text: String,
}

impl CapabilityRequest {
    pub fn new(source_lang: LangEnum, target_lang: LangEnum, text: impl Into<String>) -> Self {
        Self {
            source_lang,
            target_lang,
            text: text.into(),
        }
    }

    /// Length in characters, the unit providers declare their limits in
    pub fn text_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Request after the provider has mapped both languages
///
/// Providers receive the codes they produced themselves, so a provider never
/// sees a request whose languages it rejected.
#[derive(Debug, Clone, Copy)]
pub struct MappedRequest<'a> {
    pub text: &'a str,
    pub source_lang: LangEnum,
    pub target_lang: LangEnum,
    /// Provider code for the source language; empty means "detect"
    pub source_code: &'a str,
    pub target_code: &'a str,
}

/// Result of a dictionary lookup
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub word: String,
    #[serde(default)]
    pub phonetics: Vec<String>,
    #[serde(default)]
    pub definitions: Vec<String>,
}

// =============================================================================
// Provider-boundary errors
// =============================================================================

/// Error returned by a capability method
///
/// Providers never panic or unwind on expected failures; they return one of
/// these and the dispatcher turns it into a failure result.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The upstream answered but the body had an unexpected shape
    #[error("{message}\nRaw: {raw}")]
    Protocol { message: String, raw: String },

    #[error("{0}")]
    Transport(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Provider used before init")]
    NotInitialized,

    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    pub fn protocol(message: impl Into<String>, raw: impl Into<String>) -> Self {
        ProviderError::Protocol {
            message: message.into(),
            raw: raw.into(),
        }
    }
}

impl From<HttpError> for ProviderError {
    fn from(err: HttpError) -> Self {
        if err.is_auth_rejection() {
            return ProviderError::Authentication(err.to_string());
        }
        match err {
            HttpError::Cancelled => ProviderError::Cancelled,
            HttpError::InvalidHeader { .. } => ProviderError::Other(err.to_string()),
            other => ProviderError::Transport(other.to_string()),
        }
    }
}

// =============================================================================
// Capability traits
// =============================================================================

/// Mapping from the closed language enumeration to provider codes
///
/// `None` means the provider cannot handle the language; the dispatcher fails
/// the request before any network access.
pub trait LanguageMapping: Send + Sync {
    fn map_source_language(&self, lang: LangEnum) -> Option<String>;

    fn map_target_language(&self, lang: LangEnum) -> Option<String>;
}

/// Text translation capability
#[async_trait]
pub trait TranslatePlugin: LanguageMapping {
    /// Maximum accepted input length in characters
    fn max_text_length(&self) -> Option<usize> {
        None
    }

    /// Translate `request.text`.
    ///
    /// Must return promptly with [`ProviderError::Cancelled`] (or simply stop
    /// being polled) once `cancel` fires.
    async fn translate(
        &self,
        request: &MappedRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<String, ProviderError>;
}

/// Dictionary lookup capability
#[async_trait]
pub trait DictionaryPlugin: LanguageMapping {
    async fn lookup(
        &self,
        request: &MappedRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<DictionaryEntry, ProviderError>;
}

/// Speech synthesis capability
#[async_trait]
pub trait TtsPlugin: Send + Sync {
    fn max_text_length(&self) -> Option<usize> {
        None
    }

    /// Synthesize `text` and return encoded audio
    async fn synthesize(
        &self,
        text: &str,
        lang: LangEnum,
        cancel: &CancellationToken,
    ) -> Result<Bytes, ProviderError>;
}

/// Base trait for every provider
///
/// Lifecycle: `init` is called exactly once before the service becomes visible
/// to dispatch, `dispose` exactly once when the service is unloaded. A
/// provider must not perform I/O outside that window. `dispose` may also be
/// called on a provider whose `init` failed or never ran.
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// Descriptor; must return the same value for the lifetime of the instance
    fn manifest(&self) -> PluginManifest;

    async fn init(&mut self, ctx: PluginContext) -> Result<(), PluginError>;

    async fn dispose(&self) {}

    fn as_translate(&self) -> Option<&dyn TranslatePlugin> {
        None
    }

    fn as_dictionary(&self) -> Option<&dyn DictionaryPlugin> {
        None
    }

    fn as_tts(&self) -> Option<&dyn TtsPlugin> {
        None
    }
}

/// Capabilities for which `plugin` actually provides an accessor
pub fn implemented_capabilities(plugin: &dyn Plugin) -> CapabilitySet {
    let mut set = CapabilitySet::EMPTY;
    if plugin.as_translate().is_some() {
        set.insert(Capability::Translate);
    }
    if plugin.as_dictionary().is_some() {
        set.insert(Capability::Dictionary);
    }
    if plugin.as_tts().is_some() {
        set.insert(Capability::TextToSpeech);
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_set_membership() {
        let set = CapabilitySet::of(Capability::Translate).with(Capability::Dictionary);
        assert!(set.contains(Capability::Translate));
        assert!(set.contains(Capability::Dictionary));
        assert!(!set.contains(Capability::TextToSpeech));
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![Capability::Translate, Capability::Dictionary]
        );
        assert!(CapabilitySet::EMPTY.is_empty());
    }

    #[test]
    fn test_capability_set_serializes_as_list() {
        let set = CapabilitySet::of(Capability::TextToSpeech).with(Capability::Translate);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["translate","text_to_speech"]"#);

        let back: CapabilitySet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn test_capability_display() {
        assert_eq!(Capability::TextToSpeech.to_string(), "text_to_speech");
        assert_eq!(
            CapabilitySet::of(Capability::Dictionary).to_string(),
            "[dictionary]"
        );
    }

    #[test]
    fn test_http_error_conversion() {
        let auth = ProviderError::from(HttpError::Status {
            status: 401,
            body: "denied".to_string(),
        });
        assert!(matches!(auth, ProviderError::Authentication(_)));

        let server = ProviderError::from(HttpError::Status {
            status: 502,
            body: "bad gateway".to_string(),
        });
        assert!(matches!(server, ProviderError::Transport(_)));

        assert!(matches!(
            ProviderError::from(HttpError::Cancelled),
            ProviderError::Cancelled
        ));
    }

    #[test]
    fn test_protocol_error_carries_raw() {
        let err = ProviderError::protocol("No result.", "[]");
        assert_eq!(err.to_string(), "No result.\nRaw: []");
    }

    #[test]
    fn test_request_length_counts_chars() {
        let request = CapabilityRequest::new(LangEnum::Auto, LangEnum::Japanese, "héllo");
        assert_eq!(request.text_len(), 5);
    }
}
