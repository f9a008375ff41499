//! `X-MT-Signature` header codec.
//!
//! The endpoint only accepts requests carrying the header minted by the
//! official mobile client:
//!
//! ```text
//! message   = lowercase(APP_IDENTITY + percent_escape(url) + timestamp + nonce)
//! digest    = base64(HMAC-SHA256(SECRET_KEY, utf8(message)))
//! header    = APP_IDENTITY "::" digest "::" timestamp "::" nonce
//! timestamp = "Mon, 05 Feb 2024 09:03:07GMT"   (no space before GMT)
//! nonce     = 32 lowercase hex digits, fresh per call
//! ```
//!
//! `url` is the request URL without its scheme. Every part of the recipe is
//! checked upstream; any deviation is rejected as an authentication failure.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use time::OffsetDateTime;
use time::macros::format_description;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Application identity the endpoint expects
pub const APP_IDENTITY: &str = "MSTranslatorAndroidApp";

const SEPARATOR: &str = "::";

const SECRET_KEY: [u8; 64] = [
    0xa2, 0x29, 0x3a, 0x3d, 0xd0, 0xdd, 0x32, 0x73, 0x97, 0x7a, 0x64, 0xdb, 0xc2, 0xf3, 0x27,
    0xf5, 0xd7, 0xbf, 0x87, 0xd9, 0x45, 0x9d, 0xf0, 0x5a, 0x09, 0x66, 0xc6, 0x30, 0xc6, 0x6a,
    0xaa, 0x84, 0x9a, 0x41, 0xaa, 0x94, 0x3a, 0xa8, 0xd5, 0x1a, 0x6e, 0x4d, 0xaa, 0xc9, 0xa3,
    0x70, 0x12, 0x35, 0xc7, 0xeb, 0x12, 0xf6, 0xe8, 0x23, 0x07, 0x9e, 0x47, 0x10, 0x95, 0x91,
    0x88, 0x55, 0xd8, 0x17,
];

/// Parsed parts of a signature header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    pub app_identity: String,
    pub digest: String,
    pub timestamp: String,
    pub nonce: String,
}

impl SignedEnvelope {
    /// Split a header value into its four parts
    pub fn parse(header: &str) -> Option<Self> {
        let mut parts = header.split(SEPARATOR);
        let envelope = SignedEnvelope {
            app_identity: parts.next()?.to_string(),
            digest: parts.next()?.to_string(),
            timestamp: parts.next()?.to_string(),
            nonce: parts.next()?.to_string(),
        };
        if parts.next().is_some() {
            return None;
        }
        Some(envelope)
    }
}

/// Mints and checks signature headers
///
/// Stateless apart from the key; cheap to clone and safe to share.
#[derive(Clone)]
pub struct SignatureCodec {
    app_identity: String,
    key: Vec<u8>,
}

impl SignatureCodec {
    /// Codec with the mobile client's identity and key
    pub fn new() -> Self {
        Self::with_key(APP_IDENTITY, SECRET_KEY.to_vec())
    }

    pub fn with_key(app_identity: impl Into<String>, key: Vec<u8>) -> Self {
        Self {
            app_identity: app_identity.into(),
            key,
        }
    }

    /// Header value for `url` with the current time and a fresh nonce
    pub fn sign(&self, url: &str) -> String {
        self.sign_at(url, OffsetDateTime::now_utc(), Uuid::new_v4())
    }

    /// Header value for `url` at a fixed instant and nonce
    pub fn sign_at(&self, url: &str, at: OffsetDateTime, nonce: Uuid) -> String {
        let timestamp = format_timestamp(at);
        let nonce = nonce.simple().to_string();
        let digest = self.digest(url, &timestamp, &nonce);
        [self.app_identity.as_str(), &digest, &timestamp, &nonce].join(SEPARATOR)
    }

    /// Check that `header` is a valid signature for `url`
    ///
    /// Recomputes the digest from the header's own timestamp and nonce; does
    /// not judge freshness.
    pub fn verify(&self, header: &str, url: &str) -> bool {
        let Some(envelope) = SignedEnvelope::parse(header) else {
            return false;
        };
        if envelope.app_identity != self.app_identity {
            return false;
        }

        let expected = self.digest(url, &envelope.timestamp, &envelope.nonce);
        expected
            .as_bytes()
            .ct_eq(envelope.digest.as_bytes())
            .into()
    }

    fn digest(&self, url: &str, timestamp: &str, nonce: &str) -> String {
        let message = format!(
            "{}{}{}{}",
            self.app_identity,
            urlencoding::encode(url),
            timestamp,
            nonce
        )
        .to_lowercase();

        // HMAC accepts keys of any length
        let mut mac = match HmacSha256::new_from_slice(&self.key) {
            Ok(mac) => mac,
            Err(_) => return String::new(),
        };
        mac.update(message.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }
}

impl Default for SignatureCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SignatureCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureCodec")
            .field("app_identity", &self.app_identity)
            .finish_non_exhaustive()
    }
}

/// `ddd, dd MMM yyyy HH:mm:ssGMT` in UTC
pub fn format_timestamp(at: OffsetDateTime) -> String {
    let at = at.to_offset(time::UtcOffset::UTC);
    at.format(format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second]GMT"
    ))
    .unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to format signature timestamp");
        String::new()
    })
}
