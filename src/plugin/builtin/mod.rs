//! Built-in Plugin Registrations
//!
//! Registers the plugins shipped with the gateway through `inventory`.
//!
//! # Plugins
//!
//! - `microsoft-builtin`: Microsoft translator via the signed mobile-client
//!   endpoint (Translate)
//! - `microsoft-edge-tts`: Edge voices behind a user-configured endpoint
//!   (TextToSpeech)

use crate::core::translate::microsoft_builtin::{
    MICROSOFT_BUILTIN_PLUGIN_ID, MicrosoftBuiltinTranslator, microsoft_builtin_manifest,
};
use crate::core::tts::edge::{EDGE_TTS_PLUGIN_ID, EdgeTts, edge_tts_manifest};
use crate::plugin::capabilities::Plugin;

fn create_microsoft_builtin() -> Box<dyn Plugin> {
    Box::new(MicrosoftBuiltinTranslator::new())
}

fn create_edge_tts() -> Box<dyn Plugin> {
    Box::new(EdgeTts::new())
}

crate::register_plugin!(
    MICROSOFT_BUILTIN_PLUGIN_ID,
    microsoft_builtin_manifest,
    create_microsoft_builtin
);

crate::register_plugin!(EDGE_TTS_PLUGIN_ID, edge_tts_manifest, create_edge_tts);

#[cfg(test)]
mod tests {
    use crate::plugin::capabilities::Capability;
    use crate::plugin::catalog::PluginCatalog;

    #[test]
    fn test_builtins_are_discoverable() {
        let catalog = PluginCatalog::discover();

        let translator = catalog.manifest("microsoft-builtin").unwrap();
        assert!(translator.supports(Capability::Translate));
        assert!(!translator.supports(Capability::TextToSpeech));

        let tts = catalog.manifest("edge").unwrap();
        assert_eq!(tts.id, "microsoft-edge-tts");
        assert!(tts.supports(Capability::TextToSpeech));
    }

    #[test]
    fn test_builtin_instances_report_their_manifest() {
        let catalog = PluginCatalog::discover();
        for id in ["microsoft-builtin", "microsoft-edge-tts"] {
            let plugin = catalog.instantiate(id).unwrap();
            assert_eq!(plugin.manifest().id, id);
        }
    }
}
