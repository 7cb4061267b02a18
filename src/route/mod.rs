//! Artifact routing
//!
//! Given an artifact, its routing metadata and a channel, the router
//! computes every pool location the artifact must occupy and copies it
//! there under its canonical filename.

mod materialize;
mod plan;

pub use materialize::{is_temp_name, place_file, PlaceError, TEMP_PREFIX, TEMP_SUFFIX};
pub use plan::{plan_destinations, PoolLocation};

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

use crate::artifact::{file_sha256, ArtifactIdentity, Channel, PackageArtifact, RoutingMetadata};
use crate::config::RouterConfig;

/// Per-artifact routing failures
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("invalid channel '{0}': expected stable or unstable")]
    InvalidChannel(String),

    #[error("missing routing metadata for {0}")]
    MissingMetadata(ArtifactIdentity),

    #[error("unusable {field} '{value}' for {artifact}: not a single path segment")]
    UnsafeSegment {
        artifact: ArtifactIdentity,
        field: &'static str,
        value: String,
    },

    #[error("rejected {artifact}: {reasons}")]
    ValidationRejected {
        artifact: ArtifactIdentity,
        reasons: String,
    },

    #[error("artifact file {path} is not readable: {source}")]
    SourceMissing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("filesystem error at {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
        /// Destinations written before the failure
        placed: Vec<PathBuf>,
    },
}

impl RouteError {
    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            RouteError::InvalidChannel(_) => "INVALID_CHANNEL",
            RouteError::MissingMetadata(_) => "MISSING_METADATA",
            RouteError::UnsafeSegment { .. } => "UNSAFE_SEGMENT",
            RouteError::ValidationRejected { .. } => "VALIDATION_REJECTED",
            RouteError::SourceMissing { .. } => "SOURCE_MISSING",
            RouteError::Filesystem { .. } => "FILESYSTEM",
        }
    }

    /// Path involved in the failure, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            RouteError::SourceMissing { path, .. } | RouteError::Filesystem { path, .. } => {
                Some(path)
            }
            _ => None,
        }
    }
}

/// One artifact to route
#[derive(Debug, Clone)]
pub struct RouteRequest {
    pub artifact: PackageArtifact,

    /// None when no metadata record accompanied the artifact
    pub metadata: Option<RoutingMetadata>,

    /// Raw channel value, checked before any side effect
    pub channel: String,
}

/// A file written into the pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedFile {
    pub location: PoolLocation,
    pub path: PathBuf,
}

/// Successful routing of one artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteOutcome {
    pub artifact: ArtifactIdentity,
    pub canonical_filename: String,
    pub sha256: String,
    pub destinations: Vec<PlacedFile>,
}

/// Routes artifacts into a pool tree
#[derive(Debug, Clone)]
pub struct Router {
    config: RouterConfig,
    pool_root: PathBuf,
}

impl Router {
    pub fn new(config: RouterConfig, pool_root: impl Into<PathBuf>) -> Self {
        Self {
            config,
            pool_root: pool_root.into(),
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn pool_root(&self) -> &Path {
        &self.pool_root
    }

    /// Locations the request would be copied to, with no side effects.
    ///
    /// Applies the same up-front checks as [`Router::route`].
    pub fn plan(&self, request: &RouteRequest) -> Result<Vec<PoolLocation>, RouteError> {
        let (channel, metadata) = self.check(request)?;
        Ok(plan_destinations(metadata, channel, &self.config))
    }

    /// Route one artifact.
    ///
    /// Channel and metadata are checked before anything is written. A
    /// filesystem failure stops the remaining fan-out for this artifact;
    /// rerouting the whole artifact is the recovery.
    pub fn route(&self, request: &RouteRequest) -> Result<RouteOutcome, RouteError> {
        let (channel, metadata) = self.check(request)?;
        let artifact = &request.artifact;

        let sha256 = file_sha256(&artifact.path).map_err(|source| RouteError::SourceMissing {
            path: artifact.path.clone(),
            source,
        })?;

        let canonical = artifact
            .identity
            .canonical_filename(&self.config.artifact_extension);
        let locations = plan_destinations(metadata, channel, &self.config);

        let mut destinations = Vec::with_capacity(locations.len());
        for location in locations {
            let dir = location.dir_in(&self.pool_root);
            match place_file(&artifact.path, &dir, &canonical) {
                Ok(path) => {
                    tracing::debug!(
                        artifact = %artifact.identity,
                        location = %location,
                        legacy = location.is_legacy(),
                        "placed"
                    );
                    destinations.push(PlacedFile { location, path });
                }
                Err(PlaceError { path, source }) => {
                    return Err(RouteError::Filesystem {
                        path,
                        source,
                        placed: destinations.into_iter().map(|d| d.path).collect(),
                    });
                }
            }
        }

        tracing::info!(
            artifact = %artifact.identity,
            channel = %channel,
            count = destinations.len(),
            "routed"
        );

        Ok(RouteOutcome {
            artifact: artifact.identity.clone(),
            canonical_filename: canonical,
            sha256,
            destinations,
        })
    }

    fn check<'a>(&self, request: &'a RouteRequest) -> Result<(Channel, &'a RoutingMetadata), RouteError> {
        let channel: Channel = request
            .channel
            .parse()
            .map_err(|_| RouteError::InvalidChannel(request.channel.clone()))?;

        let identity = &request.artifact.identity;
        let metadata = match &request.metadata {
            Some(m) if m.is_populated() => m,
            _ => return Err(RouteError::MissingMetadata(identity.clone())),
        };

        for (field, value) in [("distro", &metadata.distro), ("component", &metadata.component)] {
            if !is_safe_segment(value) {
                return Err(RouteError::UnsafeSegment {
                    artifact: identity.clone(),
                    field,
                    value: value.clone(),
                });
            }
        }

        Ok((channel, metadata))
    }
}

/// A value usable as exactly one directory name
fn is_safe_segment(value: &str) -> bool {
    !value.is_empty()
        && value != "."
        && value != ".."
        && !value.contains(['/', '\\', '\0'])
        && !value.chars().any(char::is_whitespace)
}
