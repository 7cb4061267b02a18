//! Batch routing
//!
//! Discovers ingested artifacts in a directory, routes each one as an
//! independent unit, and aggregates the outcomes. One artifact's failure
//! never stops the others. [`run_batch`] returns only once every started
//! artifact has finished, so the pool is quiescent when the report is
//! handed to the index-build step.

use globset::{Glob, GlobMatcher};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::artifact::PackageArtifact;
use crate::config::{RouterConfig, ValidationPolicy};
use crate::metadata::{MetadataError, MetadataRecord};
use crate::pool::{sweep_temp_files, PoolError};
use crate::report::{ArtifactReport, RouteReport};
use crate::route::{RouteError, RouteRequest, Router};
use crate::signal::SignalState;

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("input directory {0} does not exist")]
    MissingInput(PathBuf),

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("glob pattern error: {0}")]
    Glob(#[from] globset::Error),

    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to clean pool: {0}")]
    Pool(#[from] PoolError),
}

/// One discovered artifact
#[derive(Debug, Clone)]
pub enum BatchEntry {
    /// Ready to hand to the router (metadata may still be absent)
    Ready { request: RouteRequest },

    /// Could not be turned into a request
    Invalid {
        source: PathBuf,
        kind: &'static str,
        message: String,
    },
}

fn artifact_matcher(config: &RouterConfig) -> Result<GlobMatcher, BatchError> {
    Ok(Glob::new(&format!("*.{}", config.artifact_extension))?.compile_matcher())
}

/// Find artifacts directly inside `input_dir`, in file-name order, and pair
/// each with its metadata record.
///
/// A missing record yields a request without metadata, which the router
/// rejects; a malformed record makes the entry invalid.
pub fn discover(
    input_dir: &Path,
    config: &RouterConfig,
    channel: &str,
) -> Result<Vec<BatchEntry>, BatchError> {
    if !input_dir.is_dir() {
        return Err(BatchError::MissingInput(input_dir.to_path_buf()));
    }

    let matcher = artifact_matcher(config)?;
    let mut entries = Vec::new();

    for entry in WalkDir::new(input_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() || !matcher.is_match(entry.file_name()) {
            continue;
        }
        let path = entry.into_path();
        entries.push(entry_for(path, config, channel));
    }

    tracing::debug!(dir = %input_dir.display(), count = entries.len(), "discovered artifacts");
    Ok(entries)
}

fn entry_for(path: PathBuf, config: &RouterConfig, channel: &str) -> BatchEntry {
    match MetadataRecord::for_artifact(&path, config) {
        Ok(record) => match record.artifact(&path) {
            Ok(artifact) => BatchEntry::Ready {
                request: RouteRequest {
                    artifact,
                    metadata: Some(record.routing()),
                    channel: channel.to_string(),
                },
            },
            Err(e) => BatchEntry::Invalid {
                source: path,
                kind: "INVALID_METADATA",
                message: e.to_string(),
            },
        },
        Err(MetadataError::Missing(_)) => match PackageArtifact::from_path(&path) {
            Ok(artifact) => BatchEntry::Ready {
                request: RouteRequest {
                    artifact,
                    metadata: None,
                    channel: channel.to_string(),
                },
            },
            Err(e) => BatchEntry::Invalid {
                source: path,
                kind: "MISSING_METADATA",
                message: format!("no metadata record and {}", e),
            },
        },
        Err(e) => BatchEntry::Invalid {
            source: path,
            kind: "INVALID_METADATA",
            message: e.to_string(),
        },
    }
}

/// Route every entry and aggregate the outcomes.
///
/// Entries run in parallel on a pool of `config.jobs` workers (0 = one per
/// CPU). Cancellation is checked before each artifact starts; an artifact
/// that has started always completes its fan-out or fails as a unit.
///
/// Temporary files left in the pool by an interrupted earlier run are
/// removed first, so a rerun leaves a clean pool.
pub fn run_batch(
    entries: &[BatchEntry],
    router: &Router,
    channel: &str,
    cancel: &SignalState,
) -> Result<RouteReport, BatchError> {
    let run_id = ulid::Ulid::new().to_string().to_lowercase();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(router.config().jobs)
        .build()?;

    sweep_temp_files(router.pool_root())?;

    tracing::info!(%run_id, count = entries.len(), channel, "routing batch");

    let reports: Vec<ArtifactReport> =
        pool.install(|| entries.par_iter().map(|e| route_entry(e, router, cancel)).collect());

    Ok(RouteReport::from_artifacts(run_id, channel, reports))
}

fn route_entry(entry: &BatchEntry, router: &Router, cancel: &SignalState) -> ArtifactReport {
    let request = match entry {
        BatchEntry::Ready { request } => request,
        BatchEntry::Invalid {
            source,
            kind,
            message,
        } => {
            tracing::error!(source = %source.display(), kind, "{}", message);
            return ArtifactReport::unidentified(source.clone(), kind, message.clone());
        }
    };

    let identity = &request.artifact.identity;
    let source = request.artifact.path.clone();

    if cancel.is_cancel_requested() {
        return ArtifactReport::skipped(identity, source);
    }

    let warnings = match check_tags(request, router.config()) {
        Ok(warnings) => warnings,
        Err(err) => {
            tracing::error!(artifact = %identity, "{}", err);
            return ArtifactReport::failed(identity, source, &err, Vec::new());
        }
    };

    let key = identity.to_string();
    cancel.begin(&key);
    let result = router.route(request);
    cancel.finish(&key);

    match result {
        Ok(outcome) => ArtifactReport::routed(source, outcome, warnings),
        Err(err) => {
            tracing::error!(artifact = %identity, kind = err.kind(), "{}", err);
            ArtifactReport::failed(identity, source, &err, warnings)
        }
    }
}

/// Apply the configured validation policy, returning warning codes
fn check_tags(request: &RouteRequest, config: &RouterConfig) -> Result<Vec<String>, RouteError> {
    let Some(metadata) = &request.metadata else {
        return Ok(Vec::new());
    };
    if config.validation == ValidationPolicy::Off {
        return Ok(Vec::new());
    }

    let validation = pool_tag::validate(&metadata.as_tag(), &config.tag_sets());
    if validation.valid {
        return Ok(Vec::new());
    }

    if config.validation == ValidationPolicy::Strict {
        let reasons = validation
            .warnings
            .iter()
            .map(|w| w.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(RouteError::ValidationRejected {
            artifact: request.artifact.identity.clone(),
            reasons,
        });
    }

    for warning in &validation.warnings {
        tracing::warn!(artifact = %request.artifact.identity, "{}", warning);
    }
    Ok(validation.warning_codes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_artifact(dir: &Path, file: &str, record: Option<(&str, &str)>, config: &RouterConfig) {
        let path = dir.join(file);
        fs::write(&path, file.as_bytes()).unwrap();
        if let Some((distro, component)) = record {
            let mut rec = MetadataRecord::ingest(file, config).unwrap();
            rec.distro = distro.to_string();
            rec.component = component.to_string();
            rec.write_sidecar(&path, config).unwrap();
        }
    }

    #[test]
    fn test_discover_pairs_sidecars() {
        let dir = TempDir::new().unwrap();
        let config = RouterConfig::default();
        write_artifact(dir.path(), "b_1.0_all.deb", Some(("trixie", "main")), &config);
        write_artifact(dir.path(), "a_1.0_all.deb", None, &config);
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let entries = discover(dir.path(), &config, "stable").unwrap();
        assert_eq!(entries.len(), 2);

        match &entries[0] {
            BatchEntry::Ready { request } => {
                assert_eq!(request.artifact.identity.name, "a");
                assert!(request.metadata.is_none());
            }
            other => panic!("unexpected entry {:?}", other),
        }
        match &entries[1] {
            BatchEntry::Ready { request } => {
                assert_eq!(request.metadata.as_ref().unwrap().distro, "trixie");
            }
            other => panic!("unexpected entry {:?}", other),
        }
    }

    #[test]
    fn test_discover_malformed_sidecar() {
        let dir = TempDir::new().unwrap();
        let config = RouterConfig::default();
        write_artifact(dir.path(), "a_1.0_all.deb", None, &config);
        fs::write(dir.path().join("a_1.0_all.deb.meta.json"), b"DISTRO=any").unwrap();

        let entries = discover(dir.path(), &config, "stable").unwrap();
        assert!(matches!(entries[0], BatchEntry::Invalid { kind: "INVALID_METADATA", .. }));
    }

    #[test]
    fn test_discover_missing_dir() {
        let result = discover(Path::new("/nonexistent/in"), &RouterConfig::default(), "stable");
        assert!(matches!(result, Err(BatchError::MissingInput(_))));
    }

    #[test]
    fn test_strict_policy_rejects_unknown_tags() {
        let dir = TempDir::new().unwrap();
        let mut config = RouterConfig::default();
        config.validation = ValidationPolicy::Strict;
        write_artifact(dir.path(), "a_1.0_all.deb", Some(("forky", "main")), &config);

        let router = Router::new(config.clone(), dir.path().join("pool"));
        let entries = discover(dir.path(), &config, "stable").unwrap();
        let report = run_batch(&entries, &router, "stable", &SignalState::new()).unwrap();

        assert_eq!(report.failed, 1);
        let error = report.artifacts[0].error.as_ref().unwrap();
        assert_eq!(error.kind, "VALIDATION_REJECTED");
        assert!(!dir.path().join("pool").exists());
    }

    #[test]
    fn test_warn_policy_routes_and_records_warnings() {
        let dir = TempDir::new().unwrap();
        let config = RouterConfig::default();
        write_artifact(dir.path(), "a_1.0_all.deb", Some(("forky", "main")), &config);

        let router = Router::new(config.clone(), dir.path().join("pool"));
        let entries = discover(dir.path(), &config, "stable").unwrap();
        let report = run_batch(&entries, &router, "stable", &SignalState::new()).unwrap();

        assert_eq!(report.routed, 1);
        assert_eq!(report.artifacts[0].warnings, vec!["UNKNOWN_DISTRO:forky"]);
        assert!(dir.path().join("pool/forky-stable/main/a_1.0_all.deb").exists());
    }

    #[test]
    fn test_rerun_clears_interrupted_copy() {
        let dir = TempDir::new().unwrap();
        let config = RouterConfig::default();
        write_artifact(dir.path(), "a_1.0_all.deb", Some(("trixie", "main")), &config);
        let stale = dir.path().join("pool/trixie-stable/main/.pool-router-01abc.tmp");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, b"half").unwrap();

        let router = Router::new(config.clone(), dir.path().join("pool"));
        let entries = discover(dir.path(), &config, "stable").unwrap();
        let report = run_batch(&entries, &router, "stable", &SignalState::new()).unwrap();

        assert_eq!(report.routed, 1);
        assert!(!stale.exists());
        assert!(dir.path().join("pool/trixie-stable/main/a_1.0_all.deb").exists());
    }

    #[test]
    fn test_cancelled_before_start_skips_everything() {
        let dir = TempDir::new().unwrap();
        let config = RouterConfig::default();
        write_artifact(dir.path(), "a_1.0_all.deb", Some(("trixie", "main")), &config);

        let cancel = SignalState::new();
        cancel.cancel();
        let router = Router::new(config.clone(), dir.path().join("pool"));
        let entries = discover(dir.path(), &config, "stable").unwrap();
        let report = run_batch(&entries, &router, "stable", &cancel).unwrap();

        assert_eq!(report.skipped, 1);
        assert!(!dir.path().join("pool").exists());
    }
}
