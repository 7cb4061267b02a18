//! Per-artifact routing report
//!
//! Aggregates the outcome of every artifact in a batch into one JSON
//! document, plus a human summary and a stable exit code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::artifact::{ArtifactIdentity, Channel};
use crate::route::{PlacedFile, PoolLocation, RouteError, RouteOutcome};

/// Schema version for route reports
pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for route reports
pub const REPORT_SCHEMA_ID: &str = "pool-router/route_report@1";

/// Exit code when every artifact was routed
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code when any artifact failed to route
pub const EXIT_FAILED: i32 = 1;

/// Exit code when the pool did not pass the structure check
pub const EXIT_POOL_INVALID: i32 = 2;

/// Exit code when the run was interrupted
pub const EXIT_CANCELLED: i32 = 80;

/// Status of one artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactStatus {
    Routed,
    Failed,
    /// Not started because the run was interrupted
    Skipped,
}

/// Aggregate status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failed,
    Cancelled,
}

/// Error details for a failed artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactError {
    /// Machine-readable kind, e.g. `MISSING_METADATA`
    pub kind: String,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl From<&RouteError> for ArtifactError {
    fn from(err: &RouteError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
            path: err.path().map(Path::to_path_buf),
        }
    }
}

/// Report entry for one artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactReport {
    /// Identity when known, otherwise the file name
    pub artifact: String,

    /// Path of the ingested file
    pub source: PathBuf,

    pub status: ArtifactStatus,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub destinations: Vec<PlacedFile>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,

    /// Validation warnings (codes), when validation ran
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ArtifactError>,
}

impl ArtifactReport {
    pub fn routed(source: PathBuf, outcome: RouteOutcome, warnings: Vec<String>) -> Self {
        Self {
            artifact: outcome.artifact.to_string(),
            source,
            status: ArtifactStatus::Routed,
            destinations: outcome.destinations,
            sha256: Some(outcome.sha256),
            warnings,
            error: None,
        }
    }

    pub fn failed(
        identity: &ArtifactIdentity,
        source: PathBuf,
        err: &RouteError,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            artifact: identity.to_string(),
            source,
            status: ArtifactStatus::Failed,
            destinations: Vec::new(),
            sha256: None,
            warnings,
            error: Some(ArtifactError::from(err)),
        }
    }

    /// An artifact that could not even be identified
    pub fn unidentified(source: PathBuf, kind: &str, message: String) -> Self {
        let artifact = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| source.display().to_string());
        Self {
            artifact,
            source,
            status: ArtifactStatus::Failed,
            destinations: Vec::new(),
            sha256: None,
            warnings: Vec::new(),
            error: Some(ArtifactError {
                kind: kind.to_string(),
                message,
                path: None,
            }),
        }
    }

    pub fn skipped(identity: &ArtifactIdentity, source: PathBuf) -> Self {
        Self {
            artifact: identity.to_string(),
            source,
            status: ArtifactStatus::Skipped,
            destinations: Vec::new(),
            sha256: None,
            warnings: Vec::new(),
            error: None,
        }
    }
}

/// Report for one routing run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteReport {
    pub schema_version: u32,
    pub schema_id: String,
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub channel: String,
    pub status: RunStatus,
    pub artifact_count: usize,
    pub routed: usize,
    pub failed: usize,
    pub skipped: usize,

    /// Total files written into the pool
    pub files_written: usize,

    pub artifacts: Vec<ArtifactReport>,
    pub human_summary: String,
}

impl RouteReport {
    /// Aggregate per-artifact reports, preserving their order
    pub fn from_artifacts(run_id: String, channel: &str, artifacts: Vec<ArtifactReport>) -> Self {
        let count = |s: ArtifactStatus| artifacts.iter().filter(|a| a.status == s).count();
        let routed = count(ArtifactStatus::Routed);
        let failed = count(ArtifactStatus::Failed);
        let skipped = count(ArtifactStatus::Skipped);
        let files_written = artifacts.iter().map(|a| a.destinations.len()).sum();

        let status = if skipped > 0 {
            RunStatus::Cancelled
        } else if failed > 0 {
            RunStatus::Failed
        } else {
            RunStatus::Success
        };

        let human_summary = match status {
            RunStatus::Success => format!(
                "Routed {} artifact(s) into {} pool location(s)",
                routed, files_written
            ),
            RunStatus::Failed => format!(
                "Routing failed: {} routed, {} failed",
                routed, failed
            ),
            RunStatus::Cancelled => format!(
                "Routing interrupted: {} routed, {} failed, {} not started",
                routed, failed, skipped
            ),
        };

        Self {
            schema_version: REPORT_SCHEMA_VERSION,
            schema_id: REPORT_SCHEMA_ID.to_string(),
            run_id,
            created_at: Utc::now(),
            channel: channel.to_string(),
            status,
            artifact_count: artifacts.len(),
            routed,
            failed,
            skipped,
            files_written,
            artifacts,
            human_summary,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.status {
            RunStatus::Success => EXIT_SUCCESS,
            RunStatus::Failed => EXIT_FAILED,
            RunStatus::Cancelled => EXIT_CANCELLED,
        }
    }

    /// Every (location, file name) this run wrote
    pub fn expected_files(&self) -> Vec<(PoolLocation, String)> {
        self.artifacts
            .iter()
            .flat_map(|a| a.destinations.iter())
            .filter_map(|d| {
                d.path
                    .file_name()
                    .map(|n| (d.location.clone(), n.to_string_lossy().to_string()))
            })
            .collect()
    }

    /// Channel of this run, when it was a recognized value
    pub fn channel(&self) -> Option<Channel> {
        self.channel.parse().ok()
    }

    /// Multi-line human-readable rendering
    pub fn to_human(&self) -> String {
        let mut out = String::new();
        for a in &self.artifacts {
            match a.status {
                ArtifactStatus::Routed => {
                    out.push_str(&format!("ok      {}\n", a.artifact));
                    for d in &a.destinations {
                        out.push_str(&format!("          -> {}\n", d.path.display()));
                    }
                }
                ArtifactStatus::Failed => {
                    let (kind, message) = a
                        .error
                        .as_ref()
                        .map(|e| (e.kind.as_str(), e.message.as_str()))
                        .unwrap_or(("UNKNOWN", ""));
                    out.push_str(&format!("FAILED  {} [{}] {}\n", a.artifact, kind, message));
                }
                ArtifactStatus::Skipped => {
                    out.push_str(&format!("skipped {}\n", a.artifact));
                }
            }
            for w in &a.warnings {
                out.push_str(&format!("          warning: {}\n", w));
            }
        }
        out.push_str(&self.human_summary);
        out
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e))
        })?;
        fs::write(path, json)
    }
}
