//! Plugin Catalog
//!
//! The catalog knows which plugin implementations exist and how to build a
//! fresh instance of each. Built-in plugins are collected at link time via
//! `inventory`; additional plugins can be added at runtime with
//! [`PluginCatalog::register`].
//!
//! ```text
//! name → lowercase → PHF alias map → canonical id → DashMap → factory → Box<dyn Plugin>
//! ```
//!
//! The catalog is an explicit value handed to whoever needs it; there is no
//! process-wide instance.

use dashmap::DashMap;
use phf::phf_map;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use super::capabilities::Plugin;
use super::isolation::{PluginError, call_plugin_safely_value};
use super::metadata::PluginManifest;

/// Factory producing a new, uninitialized plugin instance
pub type PluginFactoryFn = Arc<dyn Fn() -> Box<dyn Plugin> + Send + Sync>;

/// Deferred manifest creation (non-const work is not allowed in `inventory::submit!`)
pub type ManifestFn = fn() -> PluginManifest;

/// Factory function pointer (non-Arc version for [`PluginConstructor`])
pub type PluginFactoryPtr = fn() -> Box<dyn Plugin>;

/// Plugin constructor for inventory-based registration
///
/// Use the [`register_plugin!`](crate::register_plugin) macro rather than
/// building this directly.
pub struct PluginConstructor {
    pub plugin_id: &'static str,
    pub manifest_fn: ManifestFn,
    pub factory: PluginFactoryPtr,
    pub aliases: &'static [&'static str],
}

impl PluginConstructor {
    pub const fn new(
        plugin_id: &'static str,
        manifest_fn: ManifestFn,
        factory: PluginFactoryPtr,
    ) -> Self {
        Self {
            plugin_id,
            manifest_fn,
            factory,
            aliases: &[],
        }
    }

    /// Add aliases for this plugin
    pub const fn with_aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn manifest(&self) -> PluginManifest {
        (self.manifest_fn)()
    }
}

inventory::collect!(PluginConstructor);

/// Built-in plugin ids and their aliases
static BUILTIN_PLUGIN_MAP: phf::Map<&'static str, &'static str> = phf_map! {
    // Primary names
    "microsoft-builtin" => "microsoft-builtin",
    "microsoft-edge-tts" => "microsoft-edge-tts",
    // Aliases
    "microsoft" => "microsoft-builtin",
    "bing" => "microsoft-builtin",
    "edge-tts" => "microsoft-edge-tts",
    "edge" => "microsoft-edge-tts",
};

/// Resolve a built-in plugin name or alias to its canonical id
#[inline]
pub fn resolve_builtin_plugin(name: &str) -> Option<&'static str> {
    BUILTIN_PLUGIN_MAP
        .get(name.to_ascii_lowercase().as_str())
        .copied()
}

struct CatalogEntry {
    manifest: PluginManifest,
    factory: PluginFactoryFn,
}

/// Set of known plugin implementations
pub struct PluginCatalog {
    entries: DashMap<String, CatalogEntry>,
    aliases: DashMap<String, String>,
}

impl PluginCatalog {
    /// Empty catalog
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            aliases: DashMap::new(),
        }
    }

    /// Catalog populated from every `register_plugin!` in the binary
    pub fn discover() -> Self {
        let catalog = Self::new();
        let mut count = 0usize;

        for constructor in inventory::iter::<PluginConstructor> {
            let mut manifest = constructor.manifest();
            if !manifest.id.eq_ignore_ascii_case(constructor.plugin_id) {
                tracing::warn!(
                    plugin_id = %constructor.plugin_id,
                    manifest_id = %manifest.id,
                    "Manifest id differs from registered id, using registered id"
                );
                manifest.id = constructor.plugin_id.to_string();
            }
            for alias in constructor.aliases {
                if !manifest.matches(alias) {
                    manifest.aliases.push((*alias).to_string());
                }
            }

            let factory = constructor.factory;
            catalog.register(manifest, Arc::new(move || factory()));
            count += 1;
        }

        tracing::debug!(count, "Discovered plugins");
        catalog
    }

    /// Add or replace a plugin implementation
    pub fn register(&self, manifest: PluginManifest, factory: PluginFactoryFn) {
        let id = manifest.id.to_ascii_lowercase();
        for alias in &manifest.aliases {
            self.aliases.insert(alias.to_ascii_lowercase(), id.clone());
        }
        if self
            .entries
            .insert(id.clone(), CatalogEntry { manifest, factory })
            .is_some()
        {
            tracing::warn!(plugin_id = %id, "Replacing previously registered plugin");
        }
    }

    /// Drop plugins for which `keep` returns false
    pub fn retain(&self, keep: impl Fn(&str) -> bool) {
        self.entries.retain(|id, _| keep(id));
        self.aliases.retain(|_, id| self.entries.contains_key(id.as_str()));
    }

    /// Canonical id for `name`, which may be an id or alias in any case
    pub fn canonical_id(&self, name: &str) -> Option<String> {
        let lowercase = name.to_ascii_lowercase();

        if let Some(builtin) = BUILTIN_PLUGIN_MAP.get(lowercase.as_str()) {
            if self.entries.contains_key(*builtin) {
                return Some((*builtin).to_string());
            }
        }
        if self.entries.contains_key(&lowercase) {
            return Some(lowercase);
        }
        self.aliases.get(&lowercase).map(|id| id.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.canonical_id(name).is_some()
    }

    pub fn manifest(&self, name: &str) -> Option<PluginManifest> {
        let id = self.canonical_id(name)?;
        self.entries.get(&id).map(|entry| entry.manifest.clone())
    }

    /// All manifests, ordered by id
    pub fn manifests(&self) -> Vec<PluginManifest> {
        let mut manifests: Vec<PluginManifest> = self
            .entries
            .iter()
            .map(|entry| entry.manifest.clone())
            .collect();
        manifests.sort_by(|a, b| a.id.cmp(&b.id));
        manifests
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build a new, uninitialized instance of plugin `name`
    pub fn instantiate(&self, name: &str) -> Result<Box<dyn Plugin>, PluginError> {
        let id = self
            .canonical_id(name)
            .ok_or_else(|| PluginError::NotFound(name.to_string()))?;
        // Clone the factory out so no map guard is held while plugin code runs
        let factory = self
            .entries
            .get(&id)
            .map(|entry| Arc::clone(&entry.factory))
            .ok_or_else(|| PluginError::NotFound(name.to_string()))?;

        call_plugin_safely_value(AssertUnwindSafe(|| factory()))
    }
}

impl Default for PluginCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PluginCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        f.debug_struct("PluginCatalog").field("plugins", &ids).finish()
    }
}
