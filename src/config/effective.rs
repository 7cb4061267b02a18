//! Effective configuration with provenance
//!
//! Captures the merged configuration plus where each layer came from, so a
//! rebuild's routing decisions can be traced back to the files that shaped
//! them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;
use super::router::RouterConfig;

/// Schema version for effective config output
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "pool-router/effective_config@1";

/// Repo config file looked up in the working directory
pub const DEFAULT_REPO_CONFIG: &str = "pool-router.toml";

/// Origin of a configuration source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    Host,
    Repo,
    Cli,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Effective configuration with full provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub schema_version: u32,

    pub schema_id: String,

    /// When this config was computed
    pub created_at: DateTime<Utc>,

    /// The merged, validated configuration
    pub config: RouterConfig,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,
}

/// `~/.config/pool-router/config.toml`, when HOME is set
pub fn default_host_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("pool-router")
            .join("config.toml")
    })
}

impl EffectiveConfig {
    /// Build effective config from layers.
    ///
    /// Missing host/repo files are skipped; a present but unreadable or
    /// malformed file is an error.
    pub fn build(
        host_config_path: Option<&Path>,
        repo_config_path: Option<&Path>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = Vec::new();
        let mut sources = Vec::new();

        layers.push(BuiltinDefaults::default().to_value());
        sources.push(ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        });

        for (origin, path) in [
            (ConfigOrigin::Host, host_config_path),
            (ConfigOrigin::Repo, repo_config_path),
        ] {
            let Some(path) = path else { continue };
            if !path.exists() {
                continue;
            }
            let (value, digest) = Self::load_toml_file(path)?;
            tracing::debug!(path = %path.display(), ?origin, "loaded config layer");
            layers.push(value);
            sources.push(ConfigSource {
                origin,
                path: Some(path.to_string_lossy().to_string()),
                digest: Some(digest),
            });
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let config = RouterConfig::from_value(merge_layers(layers))?;

        Ok(Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            config,
            sources,
        })
    }

    /// Load and parse a TOML file, returning the value and digest
    fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
        let bytes = fs::read(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let contents = String::from_utf8(bytes).map_err(|e| {
            ConfigError::ParseError(format!("{}: invalid UTF-8: {}", path.display(), e))
        })?;

        let toml_value: toml::Value = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;

        Ok((Self::toml_to_json(toml_value), digest))
    }

    /// Convert TOML Value to JSON Value
    fn toml_to_json(toml: toml::Value) -> Value {
        match toml {
            toml::Value::String(s) => Value::String(s),
            toml::Value::Integer(i) => Value::Number(i.into()),
            toml::Value::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(dt) => Value::String(dt.to_string()),
            toml::Value::Array(arr) => {
                Value::Array(arr.into_iter().map(Self::toml_to_json).collect())
            }
            toml::Value::Table(table) => Value::Object(
                table
                    .into_iter()
                    .map(|(k, v)| (k, Self::toml_to_json(v)))
                    .collect(),
            ),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_build_with_defaults_only() {
        let effective = EffectiveConfig::build(None, None, None).unwrap();

        assert_eq!(effective.schema_version, SCHEMA_VERSION);
        assert_eq!(effective.config, RouterConfig::default());
        assert_eq!(effective.sources.len(), 1);
        assert_eq!(effective.sources[0].origin, ConfigOrigin::Builtin);
    }

    #[test]
    fn test_repo_file_extends_distributions() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "distributions = [\"bookworm\", \"trixie\", \"forky\"]").unwrap();
        writeln!(temp, "[default_tag]").unwrap();
        writeln!(temp, "component = \"hatlabs\"").unwrap();

        let effective = EffectiveConfig::build(None, Some(temp.path()), None).unwrap();

        assert_eq!(
            effective.config.distributions,
            vec!["bookworm", "trixie", "forky"]
        );
        assert_eq!(effective.config.default_tag.distro, "any");
        assert_eq!(effective.config.default_tag.component, "hatlabs");

        let repo = &effective.sources[1];
        assert_eq!(repo.origin, ConfigOrigin::Repo);
        assert_eq!(repo.digest.as_ref().map(|d| d.len()), Some(64));
    }

    #[test]
    fn test_cli_overrides_files() {
        let mut host = NamedTempFile::new().unwrap();
        writeln!(host, "validation = \"off\"").unwrap();
        let mut repo = NamedTempFile::new().unwrap();
        writeln!(repo, "validation = \"warn\"").unwrap();

        let cli = serde_json::json!({"validation": "strict"});
        let effective =
            EffectiveConfig::build(Some(host.path()), Some(repo.path()), Some(cli)).unwrap();

        assert_eq!(effective.config.validation, super::super::ValidationPolicy::Strict);
        let origins: Vec<_> = effective.sources.iter().map(|s| s.origin.clone()).collect();
        assert_eq!(
            origins,
            vec![
                ConfigOrigin::Builtin,
                ConfigOrigin::Host,
                ConfigOrigin::Repo,
                ConfigOrigin::Cli
            ]
        );
    }

    #[test]
    fn test_missing_files_are_skipped() {
        let effective = EffectiveConfig::build(
            Some(Path::new("/nonexistent/host.toml")),
            Some(Path::new("/nonexistent/repo.toml")),
            None,
        )
        .unwrap();
        assert_eq!(effective.sources.len(), 1);
    }

    #[test]
    fn test_malformed_toml_is_error() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "distributions = [").unwrap();

        let result = EffectiveConfig::build(None, Some(temp.path()), None);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_invalid_distribution_name_rejected() {
        let cli = serde_json::json!({"distributions": ["Trixie"]});
        let result = EffectiveConfig::build(None, None, Some(cli));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_json_output() {
        let json = EffectiveConfig::build(None, None, None)
            .unwrap()
            .to_json()
            .unwrap();
        assert!(json.contains("\"schema_id\": \"pool-router/effective_config@1\""));
        assert!(json.contains("\"bookworm\""));
    }
}
