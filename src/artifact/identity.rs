//! Artifact identity and canonical naming

use serde::{Deserialize, Serialize};
use std::fmt;

/// (name, version, architecture)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactIdentity {
    pub name: String,
    pub version: String,
    pub architecture: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("'{0}' is not of the form name_version_arch.ext")]
    Malformed(String),

    #[error("'{field}' must not contain '{ch}'")]
    InvalidField { field: &'static str, ch: char },
}

impl ArtifactIdentity {
    /// Build an identity, rejecting fields that would break the
    /// `name_version_arch` naming or escape the pool directory.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        architecture: impl Into<String>,
    ) -> Result<Self, IdentityError> {
        let identity = Self {
            name: name.into(),
            version: version.into(),
            architecture: architecture.into(),
        };
        for (field, value) in [
            ("name", &identity.name),
            ("version", &identity.version),
            ("architecture", &identity.architecture),
        ] {
            if value.is_empty() {
                return Err(IdentityError::Malformed(identity.stem()));
            }
            if let Some(ch) = value.chars().find(|c| matches!(c, '_' | '/' | '\\')) {
                return Err(IdentityError::InvalidField { field, ch });
            }
        }
        Ok(identity)
    }

    /// Parse `name_version_arch[+distro+component].ext`
    pub fn from_filename(filename: &str) -> Result<Self, IdentityError> {
        let stripped = pool_tag::strip_suffix(filename);
        let stem = match stripped.rsplit_once('.') {
            Some((stem, ext)) if !ext.is_empty() => stem,
            _ => return Err(IdentityError::Malformed(filename.to_string())),
        };

        let mut parts = stem.split('_');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(name), Some(version), Some(arch), None) => Self::new(name, version, arch)
                .map_err(|_| IdentityError::Malformed(filename.to_string())),
            _ => Err(IdentityError::Malformed(filename.to_string())),
        }
    }

    /// `{name}_{version}_{arch}`
    pub fn stem(&self) -> String {
        format!("{}_{}_{}", self.name, self.version, self.architecture)
    }

    /// `{name}_{version}_{arch}.{ext}`; never carries a routing tag
    pub fn canonical_filename(&self, extension: &str) -> String {
        format!("{}.{}", self.stem(), extension)
    }
}

impl fmt::Display for ArtifactIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stem())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_filename() {
        let id = ArtifactIdentity::from_filename("signalk_2.17.2-1_all.deb").unwrap();
        assert_eq!(id.name, "signalk");
        assert_eq!(id.version, "2.17.2-1");
        assert_eq!(id.architecture, "all");
    }

    #[test]
    fn test_tagged_filename() {
        let id = ArtifactIdentity::from_filename("runtipi_1.0-1_arm64+any+main.deb").unwrap();
        assert_eq!(id.canonical_filename("deb"), "runtipi_1.0-1_arm64.deb");
    }

    #[test]
    fn test_epoch_and_plus_in_version() {
        let id = ArtifactIdentity::from_filename("foo_1.0+git5-1_armhf.deb").unwrap();
        assert_eq!(id.version, "1.0+git5-1");
    }

    #[test]
    fn test_malformed_filenames() {
        for name in ["foo.deb", "foo_1.0.deb", "a_b_c_d.deb", "foo_1.0_all", "_1.0_all.deb"] {
            assert!(
                ArtifactIdentity::from_filename(name).is_err(),
                "expected error for {}",
                name
            );
        }
    }

    #[test]
    fn test_new_rejects_separators() {
        assert_eq!(
            ArtifactIdentity::new("foo", "1.0", "../all"),
            Err(IdentityError::InvalidField {
                field: "architecture",
                ch: '/'
            })
        );
        assert!(ArtifactIdentity::new("foo_bar", "1.0", "all").is_err());
    }

    #[test]
    fn test_display() {
        let id = ArtifactIdentity::new("signalk", "2.17.2-1", "all").unwrap();
        assert_eq!(id.to_string(), "signalk_2.17.2-1_all");
    }
}
