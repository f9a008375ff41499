//! Speech-capable providers.
//!
//! # Supported Providers
//!
//! - `"microsoft-edge-tts"` or `"edge-tts"` or `"edge"` - Edge neural voices
//!   behind a user-configured endpoint
//!
//! Providers are created through the plugin catalog, never directly by the
//! host.

pub mod edge;

pub use edge::{EdgeTts, EdgeTtsSettings, EdgeTtsSettingsEditor};
