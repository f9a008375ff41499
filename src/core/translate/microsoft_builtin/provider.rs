//! Microsoft built-in translator.
//!
//! # API Reference
//!
//! - Endpoint: `POST https://api.cognitive.microsofttranslator.com/translate?api-version=3.0&to=<target>[&from=<source>]`
//! - Body: `[{"Text": "<input>"}]`
//! - Auth: `X-MT-Signature` header, see [`SignatureCodec`]
//! - Response: `[{"translations": [{"text": "<output>", ...}], ...}]`

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use super::config::{
    MAX_TEXT_LENGTH, MicrosoftBuiltinSettings, SIGNATURE_HEADER, USER_AGENT, source_code,
    target_code,
};
use super::signature::SignatureCodec;
use crate::core::http::{HttpService, header_map};
use crate::core::lang::LangEnum;
use crate::plugin::capabilities::{
    Capability, LanguageMapping, MappedRequest, Plugin, ProviderError, TranslatePlugin,
};
use crate::plugin::isolation::PluginError;
use crate::plugin::lifecycle::PluginContext;
use crate::plugin::metadata::PluginManifest;

pub const MICROSOFT_BUILTIN_PLUGIN_ID: &str = "microsoft-builtin";

/// Descriptor for the catalog
pub fn microsoft_builtin_manifest() -> PluginManifest {
    PluginManifest::new(MICROSOFT_BUILTIN_PLUGIN_ID, "Microsoft Translator", "1.0.0")
        .with_author("Lingo")
        .with_description("Microsoft translator through the signed mobile-client endpoint")
        .with_capability(Capability::Translate)
        .with_alias("microsoft")
        .with_alias("bing")
}

/// Translate provider backed by the signed endpoint
pub struct MicrosoftBuiltinTranslator {
    codec: SignatureCodec,
    settings: MicrosoftBuiltinSettings,
    http: Option<Arc<dyn HttpService>>,
}

impl MicrosoftBuiltinTranslator {
    pub fn new() -> Self {
        Self {
            codec: SignatureCodec::new(),
            settings: MicrosoftBuiltinSettings::default(),
            http: None,
        }
    }

    pub fn settings(&self) -> &MicrosoftBuiltinSettings {
        &self.settings
    }
}

impl Default for MicrosoftBuiltinTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageMapping for MicrosoftBuiltinTranslator {
    fn map_source_language(&self, lang: LangEnum) -> Option<String> {
        source_code(lang).map(String::from)
    }

    fn map_target_language(&self, lang: LangEnum) -> Option<String> {
        target_code(lang).map(String::from)
    }
}

#[async_trait]
impl TranslatePlugin for MicrosoftBuiltinTranslator {
    fn max_text_length(&self) -> Option<usize> {
        Some(MAX_TEXT_LENGTH)
    }

    async fn translate(
        &self,
        request: &MappedRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<String, ProviderError> {
        let http = self.http.as_ref().ok_or(ProviderError::NotInitialized)?;

        let url = self
            .settings
            .translate_path(request.source_code, request.target_code);
        let headers = header_map([
            ("User-Agent", USER_AGENT.to_string()),
            (SIGNATURE_HEADER, self.codec.sign(&url)),
        ])?;
        let body = json!([{ "Text": request.text }]);

        tracing::debug!(
            url = %url,
            chars = request.text.chars().count(),
            "Sending signed translate request"
        );

        let response = http
            .post(&format!("https://{url}"), &body, &headers, cancel)
            .await?;
        parse_translation(&response)
    }
}

#[async_trait]
impl Plugin for MicrosoftBuiltinTranslator {
    fn manifest(&self) -> PluginManifest {
        microsoft_builtin_manifest()
    }

    async fn init(&mut self, ctx: PluginContext) -> Result<(), PluginError> {
        self.settings = ctx.settings.load()?;
        self.http = Some(ctx.http);
        tracing::debug!(
            service_id = %ctx.service_id,
            endpoint = %self.settings.endpoint,
            "Microsoft translator initialized"
        );
        Ok(())
    }

    async fn dispose(&self) {
        tracing::debug!("Microsoft translator disposed");
    }

    fn as_translate(&self) -> Option<&dyn TranslatePlugin> {
        Some(self)
    }
}

/// Extract `[0].translations[0].text`
///
/// Any other shape, including invalid JSON, is a protocol failure carrying the
/// raw body.
pub fn parse_translation(raw: &[u8]) -> Result<String, ProviderError> {
    let body = String::from_utf8_lossy(raw);
    let no_result = || ProviderError::protocol("No result.", body.as_ref());

    let root: Value = serde_json::from_slice(raw).map_err(|_| no_result())?;
    root.as_array()
        .and_then(|items| items.first())
        .and_then(|item| item.get("translations"))
        .and_then(Value::as_array)
        .and_then(|translations| translations.first())
        .and_then(|translation| translation.get("text"))
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(no_result)
}
