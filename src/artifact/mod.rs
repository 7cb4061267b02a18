//! Package artifacts and their routing inputs
//!
//! An artifact is identified by (name, version, architecture) and lives in
//! the pool under its canonical filename `{name}_{version}_{arch}.{ext}`.

mod channel;
mod identity;

pub use channel::{Channel, InvalidChannel};
pub use identity::{ArtifactIdentity, IdentityError};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// A package file on disk plus its identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageArtifact {
    pub identity: ArtifactIdentity,

    /// Where the ingested file currently lives
    pub path: PathBuf,
}

impl PackageArtifact {
    pub fn new(identity: ArtifactIdentity, path: impl Into<PathBuf>) -> Self {
        Self {
            identity,
            path: path.into(),
        }
    }

    /// Build an artifact whose identity is read from its filename
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, IdentityError> {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let identity = ArtifactIdentity::from_filename(&name)?;
        Ok(Self { identity, path })
    }
}

/// Routing metadata attached to one artifact for one rebuild
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingMetadata {
    pub distro: String,
    pub component: String,
}

impl RoutingMetadata {
    pub fn new(distro: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            distro: distro.into(),
            component: component.into(),
        }
    }

    /// Both fields carry a value
    pub fn is_populated(&self) -> bool {
        !self.distro.trim().is_empty() && !self.component.trim().is_empty()
    }

    pub fn as_tag(&self) -> pool_tag::RoutingTag {
        pool_tag::RoutingTag::new(&self.distro, &self.component)
    }
}

impl From<pool_tag::RoutingTag> for RoutingMetadata {
    fn from(tag: pool_tag::RoutingTag) -> Self {
        Self {
            distro: tag.distro,
            component: tag.component,
        }
    }
}

/// SHA-256 of a file's contents, hex encoded
pub fn file_sha256(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_from_path_strips_tag() {
        let artifact =
            PackageArtifact::from_path("/tmp/dl/halpi2-daemon_1.0.0-1_all+any+hatlabs.deb")
                .unwrap();
        assert_eq!(artifact.identity.name, "halpi2-daemon");
        assert_eq!(
            artifact.identity.canonical_filename("deb"),
            "halpi2-daemon_1.0.0-1_all.deb"
        );
    }

    #[test]
    fn test_metadata_populated() {
        assert!(RoutingMetadata::new("any", "main").is_populated());
        assert!(!RoutingMetadata::new("", "main").is_populated());
        assert!(!RoutingMetadata::new("trixie", "  ").is_populated());
    }

    #[test]
    fn test_file_sha256() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"abc").unwrap();
        assert_eq!(
            file_sha256(temp.path()).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
