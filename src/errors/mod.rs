//! Error types shared across the gateway
//!
//! Each layer owns a `thiserror` enum:
//! - [`HttpError`]: failures of the host HTTP capability
//! - [`StorageError`]: settings and history persistence failures
//! - [`DispatchError`]: the dispatcher taxonomy surfaced to callers
//!
//! Provider-boundary errors live next to the capability traits in
//! [`crate::plugin::capabilities::ProviderError`].

pub mod dispatch_error;

pub use dispatch_error::{DispatchError, ErrorKind, LangSide};

/// Errors raised by an [`HttpService`](crate::core::http::HttpService)
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The upstream answered with a non-success status code
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Connection, DNS, TLS or timeout failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// A header value could not be encoded
    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    /// The caller's cancellation token fired before the response arrived
    #[error("Request cancelled")]
    Cancelled,
}

impl HttpError {
    /// Whether the upstream rejected the caller's credentials
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, HttpError::Status { status: 401 | 403, .. })
    }
}

/// Result type for settings and history persistence
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by the settings store and history sinks
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode value for '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to decode value for '{key}': {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}
