//! Constants, language table and settings for the Microsoft built-in translator.

use serde::{Deserialize, Serialize};

use crate::core::lang::LangEnum;

/// Host of the Microsoft translator API
pub const API_ENDPOINT: &str = "api.cognitive.microsofttranslator.com";

pub const API_VERSION: &str = "3.0";

/// Longest accepted input, in characters
pub const MAX_TEXT_LENGTH: usize = 1000;

/// Browser user agent sent alongside the signature
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/127.0.0.0 Safari/537.36";

pub const SIGNATURE_HEADER: &str = "X-MT-Signature";

/// Per-service settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MicrosoftBuiltinSettings {
    /// Host (and optional port) the request is sent to, without scheme
    pub endpoint: String,
}

impl Default for MicrosoftBuiltinSettings {
    fn default() -> Self {
        Self {
            endpoint: API_ENDPOINT.to_string(),
        }
    }
}

impl MicrosoftBuiltinSettings {
    /// Signed part of the request URL (no scheme)
    ///
    /// `from` is only present when the source code is non-empty.
    pub fn translate_path(&self, source_code: &str, target_code: &str) -> String {
        let endpoint = self.endpoint.trim().trim_end_matches('/');
        let mut url = format!("{endpoint}/translate?api-version={API_VERSION}&to={target_code}");
        if !source_code.is_empty() {
            url.push_str("&from=");
            url.push_str(source_code);
        }
        url
    }
}

/// Microsoft code shared by both directions; `None` for unsupported tags
fn language_code(lang: LangEnum) -> Option<&'static str> {
    let code = match lang {
        LangEnum::Auto => "",
        LangEnum::ChineseSimplified => "zh-Hans",
        LangEnum::ChineseTraditional => "zh-Hant",
        LangEnum::Cantonese => return None,
        LangEnum::English => "en",
        LangEnum::Japanese => "ja",
        LangEnum::Korean => "ko",
        LangEnum::French => "fr",
        LangEnum::Spanish => "es",
        LangEnum::Russian => "ru",
        LangEnum::German => "de",
        LangEnum::Italian => "it",
        LangEnum::Turkish => "tr",
        LangEnum::PortuguesePortugal => "pt-pt",
        LangEnum::PortugueseBrazil => "pt",
        LangEnum::Vietnamese => "vi",
        LangEnum::Indonesian => "id",
        LangEnum::Thai => "th",
        LangEnum::Malay => "ms",
        LangEnum::Arabic => "ar",
        LangEnum::Hindi => return None,
        LangEnum::MongolianCyrillic => "mn-Cyrl",
        LangEnum::MongolianTraditional => "mn-Mong",
        LangEnum::Khmer => "km",
        // The API has a single Norwegian code
        LangEnum::NorwegianBokmal | LangEnum::NorwegianNynorsk => "nb",
        LangEnum::Persian => "fa",
        LangEnum::Swedish => "sv",
        LangEnum::Polish => "pl",
        LangEnum::Dutch => "nl",
        LangEnum::Ukrainian => "uk",
    };
    Some(code)
}

/// Source code; `Auto` maps to the empty code (let the API detect)
pub fn source_code(lang: LangEnum) -> Option<&'static str> {
    language_code(lang)
}

/// Target code; the API needs a concrete `to`, so `Auto` is unsupported
pub fn target_code(lang: LangEnum) -> Option<&'static str> {
    if lang.is_auto() {
        return None;
    }
    language_code(lang)
}
