//! Edge TTS provider.
//!
//! # API Reference
//!
//! - Endpoint: user-configured, `POST <url>`
//! - Body: `{"text", "voice", "rate", "pitch", "style"}`
//! - Response: encoded audio bytes

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderMap;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::config::EdgeTtsSettings;
use crate::core::http::HttpService;
use crate::core::lang::LangEnum;
use crate::plugin::capabilities::{Capability, Plugin, ProviderError, TtsPlugin};
use crate::plugin::isolation::PluginError;
use crate::plugin::lifecycle::PluginContext;
use crate::plugin::metadata::PluginManifest;
use crate::settings::ScopedSettings;
use crate::utils::url_validation::validate_endpoint_url;

pub const EDGE_TTS_PLUGIN_ID: &str = "microsoft-edge-tts";

pub fn edge_tts_manifest() -> PluginManifest {
    PluginManifest::new(EDGE_TTS_PLUGIN_ID, "Microsoft Edge TTS", "1.0.0")
        .with_author("Lingo")
        .with_description("Edge neural voices through a configurable endpoint")
        .with_capability(Capability::TextToSpeech)
        .with_alias("edge-tts")
        .with_alias("edge")
}

struct Bound {
    http: Arc<dyn HttpService>,
    settings: ScopedSettings,
}

/// Speech provider posting to a user-configured Edge TTS endpoint
///
/// Settings are re-read from the store on every call, so edits made through
/// [`EdgeTtsSettingsEditor`](super::EdgeTtsSettingsEditor) apply to the next
/// synthesis.
pub struct EdgeTts {
    bound: Option<Bound>,
}

impl EdgeTts {
    pub fn new() -> Self {
        Self { bound: None }
    }
}

impl Default for EdgeTts {
    fn default() -> Self {
        Self::new()
    }
}

/// JSON body for one synthesis call
pub fn synthesis_body(settings: &EdgeTtsSettings, text: &str) -> serde_json::Value {
    json!({
        "text": text,
        "voice": settings.voice,
        "rate": settings.speed,
        "pitch": settings.pitch,
        "style": settings.style,
    })
}

#[async_trait]
impl TtsPlugin for EdgeTts {
    async fn synthesize(
        &self,
        text: &str,
        lang: LangEnum,
        cancel: &CancellationToken,
    ) -> Result<Bytes, ProviderError> {
        let bound = self.bound.as_ref().ok_or(ProviderError::NotInitialized)?;
        let settings: EdgeTtsSettings = bound.settings.load()?;

        if settings.url.trim().is_empty() {
            return Err(ProviderError::Other(
                "Edge TTS endpoint is not configured".to_string(),
            ));
        }
        let url = validate_endpoint_url(&settings.url)
            .map_err(|e| ProviderError::Other(format!("Edge TTS endpoint: {e}")))?;

        tracing::debug!(
            voice = %settings.voice,
            lang = %lang,
            chars = text.chars().count(),
            "Synthesizing speech"
        );

        let audio = bound
            .http
            .post(
                url.as_str(),
                &synthesis_body(&settings, text),
                &HeaderMap::new(),
                cancel,
            )
            .await?;

        if audio.is_empty() {
            return Err(ProviderError::protocol("Empty audio response", ""));
        }
        Ok(audio)
    }
}

#[async_trait]
impl Plugin for EdgeTts {
    fn manifest(&self) -> PluginManifest {
        edge_tts_manifest()
    }

    async fn init(&mut self, ctx: PluginContext) -> Result<(), PluginError> {
        // Surface a corrupt blob at registration rather than on first call
        let settings: EdgeTtsSettings = ctx.settings.load()?;
        if settings.url.is_empty() {
            tracing::info!(
                service_id = %ctx.service_id,
                "Edge TTS endpoint not configured yet"
            );
        }
        self.bound = Some(Bound {
            http: ctx.http,
            settings: ctx.settings,
        });
        Ok(())
    }

    async fn dispose(&self) {
        tracing::debug!("Edge TTS disposed");
    }

    fn as_tts(&self) -> Option<&dyn TtsPlugin> {
        Some(self)
    }
}
