//! Closed enumeration of language tags understood by the gateway.
//!
//! Providers never see these tags directly on the wire; each translate-capable
//! provider maps a [`LangEnum`] to its own code (or to "unsupported") through
//! [`LanguageMapping`](crate::plugin::capabilities::LanguageMapping).

use serde::{Deserialize, Serialize};

/// Language tags selectable by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LangEnum {
    /// Let the provider detect the source language
    #[default]
    Auto,
    ChineseSimplified,
    ChineseTraditional,
    Cantonese,
    English,
    Japanese,
    Korean,
    French,
    Spanish,
    Russian,
    German,
    Italian,
    Turkish,
    PortuguesePortugal,
    PortugueseBrazil,
    Vietnamese,
    Indonesian,
    Thai,
    Malay,
    Arabic,
    Hindi,
    MongolianCyrillic,
    MongolianTraditional,
    Khmer,
    NorwegianBokmal,
    NorwegianNynorsk,
    Persian,
    Swedish,
    Polish,
    Dutch,
    Ukrainian,
}

impl LangEnum {
    /// Every language tag, in declaration order
    pub const ALL: [LangEnum; 31] = [
        LangEnum::Auto,
        LangEnum::ChineseSimplified,
        LangEnum::ChineseTraditional,
        LangEnum::Cantonese,
        LangEnum::English,
        LangEnum::Japanese,
        LangEnum::Korean,
        LangEnum::French,
        LangEnum::Spanish,
        LangEnum::Russian,
        LangEnum::German,
        LangEnum::Italian,
        LangEnum::Turkish,
        LangEnum::PortuguesePortugal,
        LangEnum::PortugueseBrazil,
        LangEnum::Vietnamese,
        LangEnum::Indonesian,
        LangEnum::Thai,
        LangEnum::Malay,
        LangEnum::Arabic,
        LangEnum::Hindi,
        LangEnum::MongolianCyrillic,
        LangEnum::MongolianTraditional,
        LangEnum::Khmer,
        LangEnum::NorwegianBokmal,
        LangEnum::NorwegianNynorsk,
        LangEnum::Persian,
        LangEnum::Swedish,
        LangEnum::Polish,
        LangEnum::Dutch,
        LangEnum::Ukrainian,
    ];

    /// Stable identifier, identical to the serde representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            LangEnum::Auto => "auto",
            LangEnum::ChineseSimplified => "chinese_simplified",
            LangEnum::ChineseTraditional => "chinese_traditional",
            LangEnum::Cantonese => "cantonese",
            LangEnum::English => "english",
            LangEnum::Japanese => "japanese",
            LangEnum::Korean => "korean",
            LangEnum::French => "french",
            LangEnum::Spanish => "spanish",
            LangEnum::Russian => "russian",
            LangEnum::German => "german",
            LangEnum::Italian => "italian",
            LangEnum::Turkish => "turkish",
            LangEnum::PortuguesePortugal => "portuguese_portugal",
            LangEnum::PortugueseBrazil => "portuguese_brazil",
            LangEnum::Vietnamese => "vietnamese",
            LangEnum::Indonesian => "indonesian",
            LangEnum::Thai => "thai",
            LangEnum::Malay => "malay",
            LangEnum::Arabic => "arabic",
            LangEnum::Hindi => "hindi",
            LangEnum::MongolianCyrillic => "mongolian_cyrillic",
            LangEnum::MongolianTraditional => "mongolian_traditional",
            LangEnum::Khmer => "khmer",
            LangEnum::NorwegianBokmal => "norwegian_bokmal",
            LangEnum::NorwegianNynorsk => "norwegian_nynorsk",
            LangEnum::Persian => "persian",
            LangEnum::Swedish => "swedish",
            LangEnum::Polish => "polish",
            LangEnum::Dutch => "dutch",
            LangEnum::Ukrainian => "ukrainian",
        }
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, LangEnum::Auto)
    }
}

impl std::fmt::Display for LangEnum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LangEnum {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        LangEnum::ALL
            .iter()
            .copied()
            .find(|lang| lang.as_str() == normalized)
            .ok_or_else(|| format!("Unknown language: '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_exhaustive_and_unique() {
        let mut seen = std::collections::HashSet::new();
        for lang in LangEnum::ALL {
            assert!(seen.insert(lang.as_str()), "duplicate tag {lang}");
        }
        assert_eq!(seen.len(), LangEnum::ALL.len());
    }

    #[test]
    fn test_from_str_accepts_loose_spelling() {
        assert_eq!(
            "Chinese-Simplified".parse::<LangEnum>().unwrap(),
            LangEnum::ChineseSimplified
        );
        assert_eq!("FRENCH".parse::<LangEnum>().unwrap(), LangEnum::French);
        assert!("klingon".parse::<LangEnum>().is_err());
    }

    #[test]
    fn test_serde_matches_as_str() {
        for lang in LangEnum::ALL {
            let json = serde_json::to_string(&lang).unwrap();
            assert_eq!(json, format!("\"{}\"", lang.as_str()));
        }
    }
}
