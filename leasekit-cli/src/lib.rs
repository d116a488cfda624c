//! Command dispatch for the leasekit binary.
//!
//! The lease file is read before a command runs and written after it,
//! including when the command fails, so a lease granted partway through a
//! failed `check` is not lost.

use anyhow::{Context, Result};
use clap::Subcommand;
use leasekit::{LeaseManager, LeaseStore, LicenseAuthority};
use serde_json::Value;
use tracing::{debug, info, warn};

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Check whether the license key is valid
    ValidateKey,
    /// Obtain a new lease
    Obtain {
        /// Requested lease duration in seconds
        #[arg(long)]
        secs: Option<u64>,
    },
    /// Validate the held lease online
    Validate,
    /// Validate the held lease offline using the configured public key
    ValidateOffline,
    /// Renew the held lease
    Renew {
        /// Requested lease duration in seconds
        #[arg(long)]
        secs: Option<u64>,
    },
    /// Release the held lease
    Release,
    /// Make sure a usable lease is held, renewing or obtaining as needed
    Check,
}

/// Loads the lease kept in `store` into `manager`, if there is one.
///
/// # Errors
///
/// Returns an error if the lease file exists but cannot be read.
pub fn restore_lease<A: LicenseAuthority>(
    manager: &mut LeaseManager<A>,
    store: &LeaseStore,
) -> Result<()> {
    if let Some(stored) = store.load().context("failed to read lease file")? {
        debug!(saved_at = %stored.saved_at, "restored lease");
        manager.set_current_lease(Some(stored.lease));
    }
    Ok(())
}

/// Runs one command and writes the resulting lease back to `store`.
///
/// The lease file is written whether or not the command succeeded. A
/// release clears the file before the authority is called.
///
/// # Errors
///
/// Returns the command's error if it failed, otherwise any error writing
/// the lease file.
pub async fn run_command<A: LicenseAuthority>(
    manager: &mut LeaseManager<A>,
    store: &LeaseStore,
    command: Command,
) -> Result<Value> {
    let result = dispatch(manager, store, command).await;

    let saved = store
        .save(manager.current_lease())
        .context("failed to write lease file");

    match (result, saved) {
        (Ok(output), Ok(())) => {
            info!(holding_lease = manager.current_lease().is_some(), "lease file updated");
            Ok(output)
        }
        (Ok(_), Err(e)) => Err(e),
        (Err(e), saved) => {
            if let Err(save_err) = saved {
                warn!(error = %save_err, "lease file not updated");
            }
            Err(e)
        }
    }
}

async fn dispatch<A: LicenseAuthority>(
    manager: &mut LeaseManager<A>,
    store: &LeaseStore,
    command: Command,
) -> Result<Value> {
    let output = match command {
        Command::ValidateKey => serde_json::to_value(manager.validate_key().await?)?,
        Command::Obtain { secs } => serde_json::to_value(manager.obtain_lease(secs).await?)?,
        Command::Validate => serde_json::to_value(manager.validate_lease().await?)?,
        Command::ValidateOffline => serde_json::to_value(manager.validate_lease_offline()?)?,
        Command::Renew { secs } => serde_json::to_value(manager.renew_lease(secs).await?)?,
        Command::Release => {
            store.clear().context("failed to clear lease file")?;
            serde_json::to_value(manager.release_lease().await?)?
        }
        Command::Check => serde_json::to_value(manager.check().await?)?,
    };
    Ok(output)
}
