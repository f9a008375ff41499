//! Plugin Registration Macros
//!
//! Wraps the `inventory::submit!` boilerplate so a plugin registers with one
//! line next to its implementation.
//!
//! # Example
//!
//! ```ignore
//! use lingo_gateway::plugin::prelude::*;
//! use lingo_gateway::register_plugin;
//!
//! fn my_manifest() -> PluginManifest {
//!     PluginManifest::new("my-translator", "My Translator", "1.0.0")
//!         .with_capability(Capability::Translate)
//! }
//!
//! fn create_my_translator() -> Box<dyn Plugin> {
//!     Box::new(MyTranslator::default())
//! }
//!
//! register_plugin!("my-translator", my_manifest, create_my_translator);
//! ```

/// Register a plugin implementation with the catalog.
///
/// # Arguments
///
/// * `$id` - The plugin identifier string (e.g., "my-translator")
/// * `$manifest_fn` - Function that returns the `PluginManifest`
/// * `$factory_fn` - Factory function with signature `fn() -> Box<dyn Plugin>`
///
/// # Optional Arguments
///
/// * `aliases: [$alias1, $alias2, ...]` - Alternative names for the plugin
///
/// # Example
///
/// ```ignore
/// register_plugin!("my-translator", my_manifest, create_my_translator);
///
/// // With aliases
/// register_plugin!("my-translator", my_manifest, create_my_translator, aliases: ["mine"]);
/// ```
#[macro_export]
macro_rules! register_plugin {
    ($id:expr, $manifest_fn:expr, $factory_fn:expr) => {
        ::inventory::submit! {
            $crate::plugin::catalog::PluginConstructor::new($id, $manifest_fn, $factory_fn)
        }
    };
    ($id:expr, $manifest_fn:expr, $factory_fn:expr, aliases: [$($alias:expr),* $(,)?]) => {
        ::inventory::submit! {
            $crate::plugin::catalog::PluginConstructor::new($id, $manifest_fn, $factory_fn)
                .with_aliases(&[$($alias),*])
        }
    };
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use crate::plugin::capabilities::{Capability, Plugin};
    use crate::plugin::catalog::PluginCatalog;
    use crate::plugin::isolation::PluginError;
    use crate::plugin::lifecycle::PluginContext;
    use crate::plugin::metadata::PluginManifest;

    struct MacroPlugin;

    #[async_trait]
    impl Plugin for MacroPlugin {
        fn manifest(&self) -> PluginManifest {
            macro_manifest()
        }

        async fn init(&mut self, _ctx: PluginContext) -> Result<(), PluginError> {
            Ok(())
        }
    }

    fn macro_manifest() -> PluginManifest {
        PluginManifest::new("test-macro-plugin", "Test Macro Plugin", "1.0.0")
            .with_capability(Capability::Dictionary)
    }

    fn create_macro_plugin() -> Box<dyn Plugin> {
        Box::new(MacroPlugin)
    }

    // Verify macro expansion compiles
    register_plugin!(
        "test-macro-plugin",
        macro_manifest,
        create_macro_plugin,
        aliases: ["macro-alias"]
    );

    #[test]
    fn test_macro_registered_plugin() {
        let catalog = PluginCatalog::discover();
        assert!(
            catalog.contains("test-macro-plugin"),
            "Macro-registered plugin should be in catalog"
        );
        assert_eq!(
            catalog.canonical_id("MACRO-ALIAS").as_deref(),
            Some("test-macro-plugin")
        );
    }
}
