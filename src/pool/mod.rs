//! Pool inventory and structure check
//!
//! The index-build step scans the pool as a static snapshot and expects
//! `pool/<location>/<component>/<canonical file>`. This module lists what
//! the pool holds and reports anything that would confuse that scan.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::artifact::{ArtifactIdentity, Channel};
use crate::config::RouterConfig;
use crate::route::{is_temp_name, PoolLocation};

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("pool root {0} does not exist")]
    MissingRoot(PathBuf),

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("path is not within pool root: {0}")]
    PathNotInRoot(String),

    #[error("failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One file found in the pool
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PoolEntry {
    /// Relative path from the pool root
    pub path: String,
    pub size: u64,
}

/// A problem found in the pool tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail")]
pub enum PoolIssue {
    /// File not at `<location>/<component>/<file>`
    #[serde(rename = "UNEXPECTED_DEPTH")]
    UnexpectedDepth(String),

    /// Top-level directory is neither `<distro>-<channel>` nor `<channel>`
    #[serde(rename = "UNKNOWN_LOCATION")]
    UnknownLocation(String),

    /// File name still carries a routing-tag suffix
    #[serde(rename = "ROUTING_SUFFIX")]
    RoutingSuffix(String),

    /// File name is not `name_version_arch.ext`
    #[serde(rename = "NON_CANONICAL_NAME")]
    NonCanonicalName(String),

    /// Leftover temporary file from an interrupted copy
    #[serde(rename = "TEMP_FILE")]
    TempFile(String),

    /// A file this run wrote is not present
    #[serde(rename = "MISSING_EXPECTED")]
    MissingExpected(String),
}

impl fmt::Display for PoolIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolIssue::UnexpectedDepth(p) => write!(f, "{}: not at <location>/<component>/<file>", p),
            PoolIssue::UnknownLocation(p) => write!(f, "{}: unrecognized pool location", p),
            PoolIssue::RoutingSuffix(p) => write!(f, "{}: routing-tag suffix in pool file name", p),
            PoolIssue::NonCanonicalName(p) => write!(f, "{}: not a canonical package file name", p),
            PoolIssue::TempFile(p) => write!(f, "{}: leftover temporary file", p),
            PoolIssue::MissingExpected(p) => write!(f, "{}: expected file is missing", p),
        }
    }
}

/// Snapshot of every file under a pool root
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolInventory {
    pub root: PathBuf,
    pub entries: Vec<PoolEntry>,
}

impl PoolInventory {
    /// Walk the pool, collecting files sorted by path
    pub fn scan(root: &Path) -> Result<Self, PoolError> {
        if !root.is_dir() {
            return Err(PoolError::MissingRoot(root.to_path_buf()));
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(root)
                .map_err(|_| PoolError::PathNotInRoot(entry.path().display().to_string()))?;
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            entries.push(PoolEntry {
                path: rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/"),
                size,
            });
        }
        entries.sort();

        Ok(Self {
            root: root.to_path_buf(),
            entries,
        })
    }

    /// File counts per `<location>/<component>`
    pub fn summary(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            let parts: Vec<&str> = entry.path.split('/').collect();
            if parts.len() == 3 {
                *counts.entry(format!("{}/{}", parts[0], parts[1])).or_insert(0) += 1;
            }
        }
        counts
    }

    pub fn contains(&self, rel_path: &str) -> bool {
        self.entries
            .binary_search_by(|e| e.path.as_str().cmp(rel_path))
            .is_ok()
    }

    /// Check the tree against the layout the index build expects.
    ///
    /// `expected` lists files a just-finished run wrote; each must be present.
    pub fn verify(&self, config: &RouterConfig, expected: &[(PoolLocation, String)]) -> Vec<PoolIssue> {
        let mut issues = Vec::new();

        for entry in &self.entries {
            let parts: Vec<&str> = entry.path.split('/').collect();
            let file = parts.last().copied().unwrap_or_default();

            if is_temp_name(file) {
                issues.push(PoolIssue::TempFile(entry.path.clone()));
                continue;
            }
            if parts.len() != 3 {
                issues.push(PoolIssue::UnexpectedDepth(entry.path.clone()));
                continue;
            }
            if !is_location_dir(parts[0]) {
                issues.push(PoolIssue::UnknownLocation(entry.path.clone()));
            }
            if pool_tag::parse_suffix(file, &config.default_tag).matched {
                issues.push(PoolIssue::RoutingSuffix(entry.path.clone()));
            } else if !is_canonical_name(file, &config.artifact_extension) {
                issues.push(PoolIssue::NonCanonicalName(entry.path.clone()));
            }
        }

        let mut seen = BTreeSet::new();
        for (location, file) in expected {
            let rel = format!("{}/{}", location, file);
            if seen.insert(rel.clone()) && !self.contains(&rel) {
                issues.push(PoolIssue::MissingExpected(rel));
            }
        }

        issues
    }
}

/// Remove temporary files left behind by interrupted copies.
///
/// Must only run while nothing is routing into `root`; an in-flight copy's
/// temp file is indistinguishable from a stale one. A missing root is not
/// an error. Returns the removed paths.
pub fn sweep_temp_files(root: &Path) -> Result<Vec<PathBuf>, PoolError> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut removed = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_temp_name(&entry.file_name().to_string_lossy()) {
            continue;
        }
        let path = entry.into_path();
        std::fs::remove_file(&path).map_err(|source| PoolError::Remove {
            path: path.clone(),
            source,
        })?;
        tracing::warn!(path = %path.display(), "removed leftover temporary file");
        removed.push(path);
    }
    Ok(removed)
}

/// `<distro>-<channel>` or a bare channel
fn is_location_dir(name: &str) -> bool {
    if name.parse::<Channel>().is_ok() {
        return true;
    }
    Channel::all().iter().any(|c| {
        name.strip_suffix(c.as_str())
            .and_then(|rest| rest.strip_suffix('-'))
            .map(|distro| !distro.is_empty() && !distro.contains('/'))
            .unwrap_or(false)
    })
}

fn is_canonical_name(file: &str, extension: &str) -> bool {
    let Some(stem) = file.strip_suffix(&format!(".{}", extension)) else {
        return false;
    };
    match ArtifactIdentity::from_filename(file) {
        Ok(identity) => identity.stem() == stem,
        Err(_) => false,
    }
}
