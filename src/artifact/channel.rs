//! Release channel

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stability track, derived from the upstream release type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Stable,
    Unstable,
}

/// A channel value other than `stable` or `unstable`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid channel '{0}': expected stable or unstable")]
pub struct InvalidChannel(pub String);

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Stable => "stable",
            Channel::Unstable => "unstable",
        }
    }

    pub fn all() -> [Channel; 2] {
        [Channel::Stable, Channel::Unstable]
    }
}

impl FromStr for Channel {
    type Err = InvalidChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stable" => Ok(Channel::Stable),
            "unstable" => Ok(Channel::Unstable),
            other => Err(InvalidChannel(other.to_string())),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
