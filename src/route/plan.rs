//! Pure fan-out planning
//!
//! `(metadata, channel, config) -> ordered pool locations`, with no
//! filesystem access.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::artifact::{Channel, RoutingMetadata};
use crate::config::RouterConfig;
use crate::expand::expand_distro;

/// A pool directory keyed by (distribution, channel, component).
///
/// Legacy locations have the distribution dimension collapsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolLocation {
    /// None for the legacy location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution: Option<String>,
    pub channel: Channel,
    pub component: String,
}

impl PoolLocation {
    pub fn new(distribution: impl Into<String>, channel: Channel, component: impl Into<String>) -> Self {
        Self {
            distribution: Some(distribution.into()),
            channel,
            component: component.into(),
        }
    }

    pub fn legacy(channel: Channel, component: impl Into<String>) -> Self {
        Self {
            distribution: None,
            channel,
            component: component.into(),
        }
    }

    pub fn is_legacy(&self) -> bool {
        self.distribution.is_none()
    }

    /// Top-level pool directory: `{distribution}-{channel}` or `{channel}`
    pub fn location_dir(&self) -> String {
        match &self.distribution {
            Some(d) => format!("{}-{}", d, self.channel),
            None => self.channel.to_string(),
        }
    }

    /// Path relative to the pool root
    pub fn relative_dir(&self) -> PathBuf {
        Path::new(&self.location_dir()).join(&self.component)
    }

    /// Absolute directory under `pool_root`
    pub fn dir_in(&self, pool_root: &Path) -> PathBuf {
        pool_root.join(self.relative_dir())
    }
}

impl fmt::Display for PoolLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.location_dir(), self.component)
    }
}

/// Compute every location an artifact must occupy.
///
/// Distributions come first in configuration order; the legacy location,
/// when the legacy rule applies, comes last. Identical inputs always give
/// an identical list.
pub fn plan_destinations(
    metadata: &RoutingMetadata,
    channel: Channel,
    config: &RouterConfig,
) -> Vec<PoolLocation> {
    let mut locations: Vec<PoolLocation> = expand_distro(&metadata.distro, &config.distributions)
        .into_iter()
        .map(|d| PoolLocation::new(d, channel, &metadata.component))
        .collect();

    if config.legacy.applies(&metadata.distro, &metadata.component) {
        locations.push(PoolLocation::legacy(
            channel,
            &config.legacy.target_component,
        ));
    }

    locations
}
