//! Microsoft built-in translator.
//!
//! Talks to the Microsoft translator API through the endpoint used by the
//! official mobile client. No API key is needed; instead every request carries
//! an `X-MT-Signature` header minted by [`SignatureCodec`].
//!
//! # Languages
//!
//! `Auto` as source lets the API detect the language (no `from` parameter).
//! Cantonese and Hindi are not offered. Both Norwegian variants map to `nb`.
//!
//! # Limits
//!
//! Input is capped at [`MAX_TEXT_LENGTH`] characters; longer text is rejected
//! before any network access.

mod config;
mod provider;
mod signature;

pub use config::{
    API_ENDPOINT, API_VERSION, MAX_TEXT_LENGTH, MicrosoftBuiltinSettings, SIGNATURE_HEADER,
    USER_AGENT, source_code, target_code,
};
pub use provider::{
    MICROSOFT_BUILTIN_PLUGIN_ID, MicrosoftBuiltinTranslator, microsoft_builtin_manifest,
    parse_translation,
};
pub use signature::{APP_IDENTITY, SignatureCodec, SignedEnvelope, format_timestamp};
