//! Microsoft Edge TTS provider.
//!
//! Synthesizes speech through a user-configured endpoint that fronts the Edge
//! read-aloud voices. The endpoint, voice, rate, pitch and style live in the
//! service's settings blob and are edited through [`EdgeTtsSettingsEditor`].
//!
//! # Example
//!
//! ```rust,ignore
//! let scoped = registry.settings_for(service_id).ok_or("unknown service")?;
//! let editor = EdgeTtsSettingsEditor::open(&scoped)?;
//! editor.set_url("http://localhost:5000/tts")?;
//! editor.set_voice("en-US-AriaNeural")?;
//!
//! let request = CapabilityRequest::new(LangEnum::English, LangEnum::Auto, "Hello");
//! dispatcher.dispatch(service_id, Capability::TextToSpeech, request, &cancel).await;
//! ```

mod config;
mod provider;

pub use config::{
    DEFAULT_STYLE, DEFAULT_VOICE, EdgeSettingsError, EdgeTtsSettings, EdgeTtsSettingsEditor,
    round_speed,
};
pub use provider::{EDGE_TTS_PLUGIN_ID, EdgeTts, edge_tts_manifest, synthesis_body};
