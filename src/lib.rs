//! APT pool router
//!
//! Places release artifacts into a multi-distribution APT pool tree.
//! Each artifact carries a routing tag (distribution, component); the
//! router expands the `any` wildcard to the configured distributions,
//! applies the legacy compatibility rule, and copies the artifact under
//! its canonical filename into every resulting pool location.

pub mod artifact;
pub mod batch;
pub mod config;
pub mod expand;
pub mod logging;
pub mod metadata;
pub mod pool;
pub mod report;
pub mod route;
pub mod signal;

pub use artifact::{ArtifactIdentity, Channel, PackageArtifact, RoutingMetadata};
pub use batch::{discover, run_batch, BatchEntry, BatchError};
pub use config::{ConfigError, EffectiveConfig, RouterConfig, ValidationPolicy};
pub use expand::expand_distro;
pub use metadata::{MetadataError, MetadataRecord};
pub use pool::{PoolInventory, PoolIssue};
pub use report::{ArtifactReport, RouteReport};
pub use route::{plan_destinations, PoolLocation, RouteError, RouteOutcome, RouteRequest, Router};
pub use signal::{SignalHandler, SignalState};
