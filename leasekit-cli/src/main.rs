//! leasekit command-line client
//!
//! Runs a single lease operation against the configured licensing authority
//! and prints the result as JSON. The held lease is kept in a lease file
//! between invocations.
//!
//! Usage:
//!   leasekit --config leasekit.json check
//!   leasekit --key ABCD-1234 obtain --secs 600

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use leasekit::{LeaseConfig, LeaseManager, LeaseStore};
use leasekit_cli::{Command, restore_lease, run_command};
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "leasekit")]
#[command(about = "Obtain, check and release license leases")]
struct Args {
    /// Path to a JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// License key (overrides the configuration file)
    #[arg(short, long, env = "LEASEKIT_KEY")]
    key: Option<String>,

    /// Licensing endpoint base URL (overrides the configuration file)
    #[arg(long)]
    endpoint: Option<String>,

    /// File the current lease is kept in between runs
    #[arg(long)]
    lease_file: Option<PathBuf>,

    /// Enable verbose debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

fn load_config(args: &Args) -> Result<LeaseConfig> {
    let mut config = match &args.config {
        Some(path) => LeaseConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => LeaseConfig::default(),
    };

    if let Some(key) = &args.key {
        config.license_key = key.clone();
    }
    if let Some(endpoint) = &args.endpoint {
        config.endpoint = endpoint.clone();
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn lease_store(args: &Args) -> Result<LeaseStore> {
    match &args.lease_file {
        Some(path) => Ok(LeaseStore::new(path)),
        None => LeaseStore::default_location().context("no default lease file location"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = load_config(&args)?;
    let store = lease_store(&args)?;
    debug!(endpoint = %config.endpoint, lease_file = %store.path().display(), "starting");

    let mut manager = LeaseManager::connect(config).context("failed to set up lease manager")?;
    restore_lease(&mut manager, &store)?;

    let output = run_command(&mut manager, &store, args.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
