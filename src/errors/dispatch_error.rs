//! Dispatcher error taxonomy
//!
//! Every failure a caller can observe from [`Dispatcher::dispatch`] is one of
//! these variants. Registry and language failures are detected before any I/O;
//! provider and transport failures are caught at the dispatcher boundary.
//!
//! [`Dispatcher::dispatch`]: crate::plugin::dispatch::Dispatcher::dispatch

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::lang::LangEnum;
use crate::plugin::capabilities::Capability;

/// Which side of a language pair failed to map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LangSide {
    Source,
    Target,
}

impl std::fmt::Display for LangSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LangSide::Source => write!(f, "source"),
            LangSide::Target => write!(f, "target"),
        }
    }
}

/// Coarse classification of a dispatch failure, stored alongside history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsupportedLanguage,
    TextTooLong,
    ServiceNotFound,
    ServiceDisabled,
    CapabilityNotSupported,
    AuthenticationFailure,
    ProtocolFailure,
    TransportFailure,
    StorageFailure,
    ProviderFailure,
}

impl ErrorKind {
    /// Whether the failure was detected before any network access
    pub fn is_pre_flight(&self) -> bool {
        matches!(
            self,
            ErrorKind::UnsupportedLanguage
                | ErrorKind::TextTooLong
                | ErrorKind::ServiceNotFound
                | ErrorKind::ServiceDisabled
                | ErrorKind::CapabilityNotSupported
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::UnsupportedLanguage => "unsupported_language",
            ErrorKind::TextTooLong => "text_too_long",
            ErrorKind::ServiceNotFound => "service_not_found",
            ErrorKind::ServiceDisabled => "service_disabled",
            ErrorKind::CapabilityNotSupported => "capability_not_supported",
            ErrorKind::AuthenticationFailure => "authentication_failure",
            ErrorKind::ProtocolFailure => "protocol_failure",
            ErrorKind::TransportFailure => "transport_failure",
            ErrorKind::StorageFailure => "storage_failure",
            ErrorKind::ProviderFailure => "provider_failure",
        };
        write!(f, "{s}")
    }
}

/// Failure reported by the dispatcher
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    // ─────────────────────────────────────────────────────────────────────────
    // Pre-flight failures
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Unsupported {side} language: {lang}")]
    UnsupportedLanguage { side: LangSide, lang: LangEnum },

    #[error("Text too long: {len} characters (maximum {max})")]
    TextTooLong { len: usize, max: usize },

    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Service disabled: {0}")]
    ServiceDisabled(String),

    #[error("Service '{service_id}' does not support {capability}")]
    CapabilityNotSupported {
        service_id: String,
        capability: Capability,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Provider / transport failures
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Authentication failed: {0}")]
    AuthenticationFailure(String),

    #[error("Unexpected response: {message}\nRaw: {raw}")]
    ProtocolFailure { message: String, raw: String },

    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("Storage failure: {0}")]
    StorageFailure(String),

    #[error("{0}")]
    ProviderFailure(String),
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::UnsupportedLanguage { .. } => ErrorKind::UnsupportedLanguage,
            DispatchError::TextTooLong { .. } => ErrorKind::TextTooLong,
            DispatchError::ServiceNotFound(_) => ErrorKind::ServiceNotFound,
            DispatchError::ServiceDisabled(_) => ErrorKind::ServiceDisabled,
            DispatchError::CapabilityNotSupported { .. } => ErrorKind::CapabilityNotSupported,
            DispatchError::AuthenticationFailure(_) => ErrorKind::AuthenticationFailure,
            DispatchError::ProtocolFailure { .. } => ErrorKind::ProtocolFailure,
            DispatchError::TransportFailure(_) => ErrorKind::TransportFailure,
            DispatchError::StorageFailure(_) => ErrorKind::StorageFailure,
            DispatchError::ProviderFailure(_) => ErrorKind::ProviderFailure,
        }
    }
}
