//! Built-in defaults (layer 1)

use serde::{Deserialize, Serialize};

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Concrete distributions, in routing order
    pub distributions: Vec<String>,

    /// Recognized components
    pub components: Vec<String>,

    /// Distro assumed for filenames without a routing suffix
    pub default_distro: String,

    /// Component assumed for filenames without a routing suffix
    pub default_component: String,

    /// Whether the legacy pool copy is produced
    pub legacy_enabled: bool,

    /// Component that triggers the legacy copy (with distro `any`)
    pub legacy_source_component: String,

    /// Component the legacy copy is filed under
    pub legacy_target_component: String,

    /// Appended to the artifact path to locate its metadata record
    pub metadata_suffix: String,

    /// Extension of routable artifacts
    pub artifact_extension: String,

    /// Validation policy: off, warn or strict
    pub validation: String,

    /// Parallel routing workers (0 = one per CPU)
    pub jobs: usize,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            distributions: vec!["bookworm".to_string(), "trixie".to_string()],
            components: vec!["main".to_string(), "hatlabs".to_string()],
            default_distro: "any".to_string(),
            default_component: "main".to_string(),
            legacy_enabled: true,
            legacy_source_component: "hatlabs".to_string(),
            legacy_target_component: "main".to_string(),
            metadata_suffix: ".meta.json".to_string(),
            artifact_extension: "deb".to_string(),
            validation: "warn".to_string(),
            jobs: 0,
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "distributions": self.distributions,
            "components": self.components,
            "default_tag": {
                "distro": self.default_distro,
                "component": self.default_component
            },
            "legacy": {
                "enabled": self.legacy_enabled,
                "source_component": self.legacy_source_component,
                "target_component": self.legacy_target_component
            },
            "metadata_suffix": self.metadata_suffix,
            "artifact_extension": self.artifact_extension,
            "validation": self.validation,
            "jobs": self.jobs
        })
    }
}
