//! Typed router configuration, threaded explicitly through parsing,
//! validation, expansion and routing.

use pool_tag::{is_well_formed_token, RoutingTag, TagSets, ANY_DISTRO};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::defaults::BuiltinDefaults;
use super::effective::ConfigError;

/// How the batch driver treats validation warnings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationPolicy {
    /// Skip validation entirely
    Off,
    /// Log warnings and route anyway
    #[default]
    Warn,
    /// Refuse to route artifacts with unrecognized tags
    Strict,
}

impl FromStr for ValidationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(ValidationPolicy::Off),
            "warn" => Ok(ValidationPolicy::Warn),
            "strict" => Ok(ValidationPolicy::Strict),
            other => Err(format!(
                "invalid validation policy '{}': expected off, warn or strict",
                other
            )),
        }
    }
}

impl fmt::Display for ValidationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationPolicy::Off => write!(f, "off"),
            ValidationPolicy::Warn => write!(f, "warn"),
            ValidationPolicy::Strict => write!(f, "strict"),
        }
    }
}

/// Backward-compatibility copy into the pre-multi-distribution pool.
///
/// Applies only to `distro = any` with `component = source_component`,
/// and produces exactly one extra location `{channel}/{target_component}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LegacyRule {
    pub enabled: bool,
    pub source_component: String,
    pub target_component: String,
}

impl LegacyRule {
    pub fn applies(&self, distro: &str, component: &str) -> bool {
        self.enabled && distro == ANY_DISTRO && component == self.source_component
    }
}

/// Effective router configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    /// Concrete distributions, in routing order
    pub distributions: Vec<String>,

    /// Recognized components
    pub components: Vec<String>,

    /// Tag assumed when a filename carries no routing suffix
    pub default_tag: RoutingTag,

    pub legacy: LegacyRule,

    /// Appended to an artifact path to locate its metadata record
    pub metadata_suffix: String,

    /// Extension of routable artifacts (without the dot)
    pub artifact_extension: String,

    #[serde(default)]
    pub validation: ValidationPolicy,

    /// Parallel routing workers (0 = one per CPU)
    #[serde(default)]
    pub jobs: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        let d = BuiltinDefaults::default();
        Self {
            distributions: d.distributions,
            components: d.components,
            default_tag: RoutingTag::new(d.default_distro, d.default_component),
            legacy: LegacyRule {
                enabled: d.legacy_enabled,
                source_component: d.legacy_source_component,
                target_component: d.legacy_target_component,
            },
            metadata_suffix: d.metadata_suffix,
            artifact_extension: d.artifact_extension,
            validation: ValidationPolicy::Warn,
            jobs: d.jobs,
        }
    }
}

impl RouterConfig {
    /// Deserialize and validate a merged configuration value
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        let config: RouterConfig = serde_json::from_value(value)
            .map_err(|e| ConfigError::ParseError(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Valid sets and fallback tag for the parser and validator
    pub fn tag_sets(&self) -> TagSets {
        TagSets {
            distributions: self.distributions.clone(),
            components: self.components.clone(),
            default_tag: self.default_tag.clone(),
        }
    }

    /// Check the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tag_sets()
            .check()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        for (key, value) in [
            ("legacy.source_component", &self.legacy.source_component),
            ("legacy.target_component", &self.legacy.target_component),
        ] {
            if !is_well_formed_token(value) {
                return Err(ConfigError::ValidationError(format!(
                    "{} '{}' must be lowercase letters only",
                    key, value
                )));
            }
        }

        if self.metadata_suffix.len() < 2 || !self.metadata_suffix.starts_with('.') {
            return Err(ConfigError::ValidationError(format!(
                "metadata_suffix '{}' must start with '.'",
                self.metadata_suffix
            )));
        }

        if self.artifact_extension.is_empty()
            || !self
                .artifact_extension
                .bytes()
                .all(|b| b.is_ascii_alphanumeric())
        {
            return Err(ConfigError::ValidationError(format!(
                "artifact_extension '{}' must be alphanumeric",
                self.artifact_extension
            )));
        }

        Ok(())
    }
}
