//! Plugin Descriptor
//!
//! The manifest is the immutable identity of a provider implementation:
//! plugin id, display metadata and declared capability set. A configured
//! instance of a plugin (a *service*) carries its own id on top of this.

use serde::{Deserialize, Serialize};

use super::capabilities::{Capability, CapabilitySet};

/// Plugin manifest containing metadata about a plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Stable plugin identifier (e.g., "microsoft-builtin")
    pub id: String,

    /// Human-readable plugin name
    pub name: String,

    /// Semantic version of the plugin
    pub version: semver::Version,

    /// Plugin author or organization
    #[serde(default)]
    pub author: String,

    /// Brief description of the plugin
    #[serde(default)]
    pub description: String,

    /// Capabilities the plugin implements
    pub capabilities: CapabilitySet,

    /// Alternative ids accepted by the catalog
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl PluginManifest {
    /// Create a new plugin manifest with minimal required fields
    ///
    /// # Arguments
    /// * `id` - Stable plugin identifier
    /// * `name` - Human-readable plugin name
    /// * `version` - Semantic version string (e.g., "1.0.0"). Falls back to 1.0.0 if invalid.
    pub fn new(id: impl Into<String>, name: impl Into<String>, version: &str) -> Self {
        let parsed_version = match semver::Version::parse(version) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(
                    version = %version,
                    error = %e,
                    "Invalid plugin version, falling back to 1.0.0"
                );
                semver::Version::new(1, 0, 0)
            }
        };

        Self {
            id: id.into(),
            name: name.into(),
            version: parsed_version,
            author: String::new(),
            description: String::new(),
            capabilities: CapabilitySet::EMPTY,
            aliases: Vec::new(),
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declare a capability
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }

    /// Check whether `name` matches the id or an alias (case-insensitive)
    pub fn matches(&self, name: &str) -> bool {
        self.id.eq_ignore_ascii_case(name) || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}
