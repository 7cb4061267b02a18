//! APT pool router CLI
//!
//! Entry point for the `pool-router` command-line tool.

use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use apt_pool_router::config::{default_host_config_path, DEFAULT_REPO_CONFIG};
use apt_pool_router::logging::init_logging;
use apt_pool_router::pool::PoolInventory;
use apt_pool_router::report::{EXIT_FAILED, EXIT_POOL_INVALID, EXIT_SUCCESS};
use apt_pool_router::{
    discover, plan_destinations, run_batch, ArtifactIdentity, Channel, EffectiveConfig,
    MetadataRecord, RouteReport, Router, RouterConfig, RoutingMetadata, SignalHandler,
};

#[derive(Parser)]
#[command(name = "pool-router")]
#[command(about = "Route release artifacts into a multi-distribution APT pool", version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Path to repo config file (default: pool-router.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Override the distribution list (comma-separated, in expansion order)
    #[arg(long, value_delimiter = ',', global = true)]
    distributions: Option<Vec<String>>,

    /// Override the fallback component for untagged filenames
    #[arg(long, global = true)]
    default_component: Option<String>,

    /// Validation policy: off, warn, strict
    #[arg(long, global = true)]
    validation: Option<String>,

    /// Worker threads for batch routing (0 = one per CPU)
    #[arg(long, short = 'j', global = true)]
    jobs: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the routing tag from a filename
    Parse {
        filename: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Check a tag against the configured distributions and components
    Validate {
        distro: String,
        component: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show the pool locations a tag fans out to, without copying
    Plan {
        /// stable or unstable
        #[arg(long)]
        channel: String,

        #[arg(long)]
        distro: String,

        #[arg(long)]
        component: String,

        /// Artifact filename, to show full destination paths
        file: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Write metadata records for downloaded assets and rename them canonically
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Directory to move ingested artifacts into (default: alongside)
        #[arg(long)]
        dest: Option<PathBuf>,
    },

    /// Route every ingested artifact in a directory into the pool
    Route {
        /// Directory holding artifacts and their metadata records
        #[arg(long)]
        input: PathBuf,

        /// Pool root directory
        #[arg(long)]
        pool: PathBuf,

        /// stable or unstable
        #[arg(long)]
        channel: String,

        /// Write the JSON report to this file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Skip the pool structure check after routing
        #[arg(long)]
        no_verify: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Check a pool tree for layout problems
    Verify {
        /// Pool root directory
        #[arg(long)]
        pool: PathBuf,

        /// Route report whose files must be present
        #[arg(long)]
        report: Option<PathBuf>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration with its sources
    Config,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.global.verbose) {
        eprintln!("{}", e);
    }

    match cli.command {
        Commands::Parse { filename, json } => {
            let config = load_config(&cli.global);
            run_parse(&filename, &config.config, json);
        }
        Commands::Validate {
            distro,
            component,
            json,
        } => {
            let config = load_config(&cli.global);
            run_validate(&distro, &component, &config.config, json);
        }
        Commands::Plan {
            channel,
            distro,
            component,
            file,
            json,
        } => {
            let config = load_config(&cli.global);
            run_plan(&channel, &distro, &component, file.as_deref(), &config.config, json);
        }
        Commands::Ingest { files, dest } => {
            let config = load_config(&cli.global);
            run_ingest(&files, dest.as_deref(), &config.config);
        }
        Commands::Route {
            input,
            pool,
            channel,
            report,
            no_verify,
            json,
        } => {
            let config = load_config(&cli.global);
            run_route(
                &input,
                &pool,
                &channel,
                report.as_deref(),
                !no_verify,
                config.config,
                json,
            );
        }
        Commands::Verify { pool, report, json } => {
            let config = load_config(&cli.global);
            run_verify(&pool, report.as_deref(), &config.config, json);
        }
        Commands::Config => {
            let config = load_config(&cli.global);
            print_json(&config.to_json());
        }
    }
}

fn load_config(global: &GlobalArgs) -> EffectiveConfig {
    let repo_path = global
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_REPO_CONFIG));
    let host_path = default_host_config_path();

    match EffectiveConfig::build(host_path.as_deref(), Some(&repo_path), cli_overrides(global)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(EXIT_FAILED);
        }
    }
}

/// Flags as a config layer, or None when no override flag was given
fn cli_overrides(global: &GlobalArgs) -> Option<serde_json::Value> {
    let mut overrides = serde_json::Map::new();
    if let Some(ref distributions) = global.distributions {
        overrides.insert("distributions".to_string(), serde_json::json!(distributions));
    }
    if let Some(ref component) = global.default_component {
        overrides.insert(
            "default_tag".to_string(),
            serde_json::json!({ "component": component }),
        );
    }
    if let Some(ref validation) = global.validation {
        overrides.insert("validation".to_string(), serde_json::json!(validation));
    }
    if let Some(jobs) = global.jobs {
        overrides.insert("jobs".to_string(), serde_json::json!(jobs));
    }

    if overrides.is_empty() {
        None
    } else {
        Some(serde_json::Value::Object(overrides))
    }
}

fn parse_channel(raw: &str) -> Channel {
    match raw.parse() {
        Ok(channel) => channel,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(EXIT_FAILED);
        }
    }
}

fn print_json<E: std::fmt::Display>(result: &Result<String, E>) {
    match result {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(EXIT_FAILED);
        }
    }
}

fn run_parse(filename: &str, config: &RouterConfig, json: bool) {
    let parsed = pool_tag::parse_suffix(filename, &config.default_tag);
    let canonical = ArtifactIdentity::from_filename(filename)
        .ok()
        .map(|id| id.canonical_filename(&config.artifact_extension));

    if json {
        let out = serde_json::json!({
            "filename": filename,
            "distro": parsed.tag.distro,
            "component": parsed.tag.component,
            "matched": parsed.matched,
            "canonical_filename": canonical,
        });
        print_json(&serde_json::to_string_pretty(&out));
        return;
    }

    println!("distro:    {}", parsed.tag.distro);
    println!("component: {}", parsed.tag.component);
    if !parsed.matched {
        println!("(no routing suffix, default tag applied)");
    }
    match canonical {
        Some(name) => println!("canonical: {}", name),
        None => println!("canonical: (not a name_version_arch filename)"),
    }
}

fn run_validate(distro: &str, component: &str, config: &RouterConfig, json: bool) {
    let tag = pool_tag::RoutingTag::new(distro, component);
    let validation = pool_tag::validate(&tag, &config.tag_sets());

    if json {
        print_json(&serde_json::to_string_pretty(&validation));
    } else if validation.valid {
        println!("{} is valid", tag);
    } else {
        for warning in &validation.warnings {
            println!("warning: {}", warning);
        }
    }

    process::exit(if validation.valid { EXIT_SUCCESS } else { EXIT_FAILED });
}

fn run_plan(
    channel: &str,
    distro: &str,
    component: &str,
    file: Option<&str>,
    config: &RouterConfig,
    json: bool,
) {
    let channel = parse_channel(channel);
    let metadata = RoutingMetadata::new(distro, component);
    let locations = plan_destinations(&metadata, channel, config);

    let canonical = match file.map(ArtifactIdentity::from_filename) {
        Some(Ok(identity)) => Some(identity.canonical_filename(&config.artifact_extension)),
        Some(Err(e)) => {
            eprintln!("Error: {}", e);
            process::exit(EXIT_FAILED);
        }
        None => None,
    };

    if json {
        let out: Vec<_> = locations
            .iter()
            .map(|l| {
                let path = match &canonical {
                    Some(name) => format!("{}/{}", l, name),
                    None => l.to_string(),
                };
                serde_json::json!({ "location": l, "path": path })
            })
            .collect();
        print_json(&serde_json::to_string_pretty(&out));
        return;
    }

    for location in &locations {
        match &canonical {
            Some(name) => println!("{}/{}", location, name),
            None => println!("{}", location),
        }
    }
}

fn run_ingest(files: &[PathBuf], dest: Option<&Path>, config: &RouterConfig) {
    let mut failures = 0;

    for file in files {
        match ingest_one(file, dest, config) {
            Ok((target, record)) => {
                println!(
                    "{} -> {} (+{}+{})",
                    file.display(),
                    target.display(),
                    record.distro,
                    record.component
                );
            }
            Err(e) => {
                eprintln!("Error ingesting {}: {}", file.display(), e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        process::exit(EXIT_FAILED);
    }
}

fn ingest_one(
    file: &Path,
    dest: Option<&Path>,
    config: &RouterConfig,
) -> Result<(PathBuf, MetadataRecord), String> {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| "not a file path".to_string())?;
    let record = MetadataRecord::ingest(&name, config).map_err(|e| e.to_string())?;
    let identity = record.identity().map_err(|e| e.to_string())?;

    let dir = match dest {
        Some(dir) => dir.to_path_buf(),
        None => file.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    fs::create_dir_all(&dir).map_err(|e| format!("{}: {}", dir.display(), e))?;
    let target = dir.join(identity.canonical_filename(&config.artifact_extension));

    if target != file {
        move_file(file, &target).map_err(|e| format!("{}: {}", target.display(), e))?;
    }
    record
        .write_sidecar(&target, config)
        .map_err(|e| e.to_string())?;

    tracing::info!(artifact = %identity, distro = %record.distro, component = %record.component, "ingested");
    Ok((target, record))
}

/// Rename, falling back to copy and remove across filesystems
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    fs::remove_file(from)
}

fn run_route(
    input: &Path,
    pool: &Path,
    channel: &str,
    report_path: Option<&Path>,
    verify: bool,
    config: RouterConfig,
    json: bool,
) {
    // Reject before discovering or touching the pool
    let channel = parse_channel(channel).to_string();

    let handler = SignalHandler::new();
    if let Err(e) = handler.install() {
        tracing::warn!("could not install signal handler: {}", e);
    }
    let cancel = handler.state();

    let entries = match discover(input, &config, &channel) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(EXIT_FAILED);
        }
    };

    let router = Router::new(config, pool);
    let report = match run_batch(&entries, &router, &channel, &cancel) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(EXIT_FAILED);
        }
    };

    if let Some(path) = report_path {
        if let Err(e) = report.write_to_file(path) {
            eprintln!("Error writing report {}: {}", path.display(), e);
        }
    }

    if json {
        print_json(&report.to_json());
    } else {
        println!("{}", report.to_human());
    }

    let mut code = report.exit_code();
    if verify && code == EXIT_SUCCESS && pool.exists() {
        let issues = check_pool(pool, router.config(), &report.expected_files());
        if !issues.is_empty() {
            for issue in &issues {
                eprintln!("pool: {}", issue);
            }
            code = EXIT_POOL_INVALID;
        }
    }

    process::exit(code);
}

fn check_pool(
    pool: &Path,
    config: &RouterConfig,
    expected: &[(apt_pool_router::PoolLocation, String)],
) -> Vec<apt_pool_router::PoolIssue> {
    match PoolInventory::scan(pool) {
        Ok(inventory) => inventory.verify(config, expected),
        Err(e) => {
            eprintln!("Error scanning pool: {}", e);
            process::exit(EXIT_POOL_INVALID);
        }
    }
}

fn run_verify(pool: &Path, report_path: Option<&Path>, config: &RouterConfig, json: bool) {
    let expected = match report_path {
        Some(path) => {
            let report = fs::read_to_string(path)
                .map_err(|e| e.to_string())
                .and_then(|s| RouteReport::from_json(&s).map_err(|e| e.to_string()));
            match report {
                Ok(report) => report.expected_files(),
                Err(e) => {
                    eprintln!("Error reading report {}: {}", path.display(), e);
                    process::exit(EXIT_FAILED);
                }
            }
        }
        None => Vec::new(),
    };

    let inventory = match PoolInventory::scan(pool) {
        Ok(inventory) => inventory,
        Err(e) => {
            eprintln!("Error scanning pool: {}", e);
            process::exit(EXIT_POOL_INVALID);
        }
    };
    let issues = inventory.verify(config, &expected);

    if json {
        let out = serde_json::json!({
            "pool": pool,
            "files": inventory.entries.len(),
            "locations": inventory.summary(),
            "issues": issues,
        });
        print_json(&serde_json::to_string_pretty(&out));
    } else {
        for (location, count) in inventory.summary() {
            println!("{:<32} {}", location, count);
        }
        for issue in &issues {
            println!("issue: {}", issue);
        }
        if issues.is_empty() {
            println!("Pool OK: {} file(s)", inventory.entries.len());
        }
    }

    process::exit(if issues.is_empty() {
        EXIT_SUCCESS
    } else {
        EXIT_POOL_INVALID
    });
}
