//! Routing-metadata sidecar records
//!
//! Each ingested artifact is accompanied by a flat JSON record stored next to
//! it (`<artifact path><metadata_suffix>`). The record is parsed strictly:
//! every field is required, unknown fields are rejected, and nothing in it is
//! ever evaluated.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::artifact::{ArtifactIdentity, IdentityError, PackageArtifact, RoutingMetadata};
use crate::config::RouterConfig;

/// Errors reading or writing a metadata record
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("metadata record not found: {0}")]
    Missing(PathBuf),

    #[error("failed to access metadata record {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed metadata record {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("metadata record {path}: field '{field}' is empty")]
    EmptyField { path: PathBuf, field: &'static str },

    #[error("metadata record {path}: {field} '{value}' must be lowercase letters only")]
    MalformedTag {
        path: PathBuf,
        field: &'static str,
        value: String,
    },

    #[error("metadata record {path}: {source}")]
    Identity {
        path: PathBuf,
        #[source]
        source: IdentityError,
    },
}

/// Flat routing-metadata record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetadataRecord {
    pub package: String,
    pub version: String,
    pub architecture: String,
    pub distro: String,
    pub component: String,

    /// Filename as downloaded, routing suffix included
    pub original_filename: String,
}

/// Path of the record that accompanies `artifact_path`
pub fn sidecar_path(artifact_path: &Path, suffix: &str) -> PathBuf {
    let mut os = artifact_path.as_os_str().to_os_string();
    os.push(suffix);
    PathBuf::from(os)
}

impl MetadataRecord {
    /// Derive the record for a downloaded release asset.
    ///
    /// The routing tag comes from the filename suffix, or the configured
    /// default when the filename has none.
    pub fn ingest(downloaded_filename: &str, config: &RouterConfig) -> Result<Self, IdentityError> {
        let identity = ArtifactIdentity::from_filename(downloaded_filename)?;
        let parsed = pool_tag::parse_suffix(downloaded_filename, &config.default_tag);
        if !parsed.matched {
            tracing::debug!(
                file = downloaded_filename,
                tag = %parsed.tag,
                "no routing suffix, applying default tag"
            );
        }

        let original_filename = Path::new(downloaded_filename)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| downloaded_filename.to_string());

        Ok(Self {
            package: identity.name,
            version: identity.version,
            architecture: identity.architecture,
            distro: parsed.tag.distro,
            component: parsed.tag.component,
            original_filename,
        })
    }

    /// Parse and check a record from JSON text
    pub fn from_json(json: &str, path: &Path) -> Result<Self, MetadataError> {
        let record: MetadataRecord =
            serde_json::from_str(json).map_err(|source| MetadataError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;
        record.check(path)?;
        Ok(record)
    }

    /// Load the record stored at `path`
    pub fn from_file(path: &Path) -> Result<Self, MetadataError> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(MetadataError::Missing(path.to_path_buf()))
            }
            Err(source) => {
                return Err(MetadataError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::from_json(&json, path)
    }

    /// Load the sidecar accompanying an artifact
    pub fn for_artifact(artifact_path: &Path, config: &RouterConfig) -> Result<Self, MetadataError> {
        Self::from_file(&sidecar_path(artifact_path, &config.metadata_suffix))
    }

    /// Write as pretty JSON next to the artifact, returning the record path
    pub fn write_sidecar(
        &self,
        artifact_path: &Path,
        config: &RouterConfig,
    ) -> Result<PathBuf, MetadataError> {
        let path = sidecar_path(artifact_path, &config.metadata_suffix);
        let json = serde_json::to_string_pretty(self).map_err(|source| MetadataError::Malformed {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(|source| MetadataError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    fn check(&self, path: &Path) -> Result<(), MetadataError> {
        for (field, value) in [
            ("package", &self.package),
            ("version", &self.version),
            ("architecture", &self.architecture),
            ("distro", &self.distro),
            ("component", &self.component),
            ("original_filename", &self.original_filename),
        ] {
            if value.trim().is_empty() {
                return Err(MetadataError::EmptyField {
                    path: path.to_path_buf(),
                    field,
                });
            }
        }
        for (field, value) in [("distro", &self.distro), ("component", &self.component)] {
            if !pool_tag::is_well_formed_token(value) {
                return Err(MetadataError::MalformedTag {
                    path: path.to_path_buf(),
                    field,
                    value: value.clone(),
                });
            }
        }
        self.identity().map_err(|source| MetadataError::Identity {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    pub fn identity(&self) -> Result<ArtifactIdentity, IdentityError> {
        ArtifactIdentity::new(&self.package, &self.version, &self.architecture)
    }

    pub fn routing(&self) -> RoutingMetadata {
        RoutingMetadata::new(&self.distro, &self.component)
    }

    /// The artifact this record describes, located at `path`
    pub fn artifact(&self, path: impl Into<PathBuf>) -> Result<PackageArtifact, IdentityError> {
        Ok(PackageArtifact::new(self.identity()?, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RECORD: &str = r#"{
        "package": "signalk",
        "version": "2.17.2-1",
        "architecture": "all",
        "distro": "trixie",
        "component": "main",
        "original_filename": "signalk_2.17.2-1_all+trixie+main.deb"
    }"#;

    #[test]
    fn test_parse_record() {
        let record = MetadataRecord::from_json(RECORD, Path::new("x.meta.json")).unwrap();
        assert_eq!(record.routing(), RoutingMetadata::new("trixie", "main"));
        assert_eq!(
            record.identity().unwrap().canonical_filename("deb"),
            "signalk_2.17.2-1_all.deb"
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        let json = RECORD.replace("\"component\"", "\"channel\": \"stable\", \"component\"");
        let err = MetadataRecord::from_json(&json, Path::new("x")).unwrap_err();
        assert!(matches!(err, MetadataError::Malformed { .. }));
    }

    #[test]
    fn test_missing_field_rejected() {
        let json = r#"{"package": "a", "version": "1", "architecture": "all", "distro": "any"}"#;
        assert!(matches!(
            MetadataRecord::from_json(json, Path::new("x")),
            Err(MetadataError::Malformed { .. })
        ));
    }

    #[test]
    fn test_empty_field_rejected() {
        let json = RECORD.replace("\"trixie\"", "\"\"");
        assert!(matches!(
            MetadataRecord::from_json(&json, Path::new("x")),
            Err(MetadataError::EmptyField { field: "distro", .. })
        ));
    }

    #[test]
    fn test_shell_style_record_is_not_accepted() {
        let text = "PACKAGE=signalk\nDISTRO=$(rm -rf /)\n";
        assert!(matches!(
            MetadataRecord::from_json(text, Path::new("x")),
            Err(MetadataError::Malformed { .. })
        ));
    }

    #[test]
    fn test_tag_fields_must_be_tokens() {
        let json = RECORD.replace("\"main\"", "\"../main\"");
        assert!(matches!(
            MetadataRecord::from_json(&json, Path::new("x")),
            Err(MetadataError::MalformedTag { field: "component", .. })
        ));
    }

    #[test]
    fn test_path_separator_in_identity_rejected() {
        let json = RECORD.replace("\"all\"", "\"../../etc\"");
        assert!(matches!(
            MetadataRecord::from_json(&json, Path::new("x")),
            Err(MetadataError::Identity { .. })
        ));
    }

    #[test]
    fn test_ingest_with_suffix() {
        let config = RouterConfig::default();
        let record =
            MetadataRecord::ingest("dl/halpi2-daemon_1.0.0-1_all+any+hatlabs.deb", &config)
                .unwrap();
        assert_eq!(record.package, "halpi2-daemon");
        assert_eq!(record.distro, "any");
        assert_eq!(record.component, "hatlabs");
        assert_eq!(record.original_filename, "halpi2-daemon_1.0.0-1_all+any+hatlabs.deb");
    }

    #[test]
    fn test_ingest_without_suffix_uses_configured_default() {
        let mut config = RouterConfig::default();
        config.default_tag = pool_tag::RoutingTag::new("bookworm", "hatlabs");
        let record = MetadataRecord::ingest("runtipi_1.0-1_all.deb", &config).unwrap();
        assert_eq!(record.distro, "bookworm");
        assert_eq!(record.component, "hatlabs");
    }

    #[test]
    fn test_sidecar_round_trip() {
        let dir = TempDir::new().unwrap();
        let config = RouterConfig::default();
        let artifact = dir.path().join("signalk_2.17.2-1_all.deb");

        let record = MetadataRecord::from_json(RECORD, Path::new("x")).unwrap();
        let written = record.write_sidecar(&artifact, &config).unwrap();
        assert_eq!(written, dir.path().join("signalk_2.17.2-1_all.deb.meta.json"));

        let loaded = MetadataRecord::for_artifact(&artifact, &config).unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_missing_sidecar() {
        let dir = TempDir::new().unwrap();
        let err = MetadataRecord::for_artifact(&dir.path().join("a_1_all.deb"), &RouterConfig::default())
            .unwrap_err();
        assert!(matches!(err, MetadataError::Missing(_)));
    }
}
