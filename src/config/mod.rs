//! Router configuration
//!
//! Layered loading, lowest precedence first:
//! 1. Built-in defaults
//! 2. Host config (~/.config/pool-router/config.toml)
//! 3. Repo config (pool-router.toml, or --config)
//! 4. CLI flags

mod defaults;
mod effective;
mod merge;
mod router;

pub use defaults::BuiltinDefaults;
pub use effective::{
    default_host_config_path, ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig,
    DEFAULT_REPO_CONFIG,
};
pub use merge::{deep_merge, merge_layers};
pub use router::{LegacyRule, RouterConfig, ValidationPolicy};
