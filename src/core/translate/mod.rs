//! Translate-capable providers.

pub mod microsoft_builtin;

pub use microsoft_builtin::{MicrosoftBuiltinTranslator, SignatureCodec};
