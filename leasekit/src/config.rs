//! Lease session configuration.

use crate::error::{LeaseError, LeaseResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a [`LeaseManager`](crate::LeaseManager).
///
/// Fixed once the manager is built; only the license key can be replaced
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaseConfig {
    /// Base URL of the licensing authority (e.g. `https://licensing.example.com/api/v1`).
    pub endpoint: String,
    /// The purchased license key.
    pub license_key: String,
    /// Identifier sent when obtaining leases. Derived from the device when unset.
    pub client_id: Option<String>,
    /// Lease duration requested when the caller does not specify one.
    pub default_lease_secs: u64,
    /// Leases expiring within this window are renewed by `check()`.
    pub renewal_threshold_secs: u64,
    /// Ed25519 public key of the authority (base64 of 32 bytes, or SPKI PEM).
    pub public_key: Option<String>,
    /// Allow `check()` to fall back to offline token verification.
    ///
    /// Takes effect only while the manager holds a verifier, built from
    /// `public_key` or supplied with `LeaseManager::with_verifier`.
    pub offline_check: bool,
    /// Per-request timeout for the HTTP authority.
    pub request_timeout_secs: u64,
    /// Bearer token sent to the authority.
    pub api_token: Option<String>,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://licensing.example.com/api/v1".to_string(),
            license_key: String::new(),
            client_id: None,
            default_lease_secs: 60 * 60,
            renewal_threshold_secs: 5 * 60,
            public_key: None,
            offline_check: false,
            request_timeout_secs: 30,
            api_token: None,
        }
    }
}

impl LeaseConfig {
    /// Creates a configuration for the given endpoint and key.
    pub fn new(endpoint: impl Into<String>, license_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            license_key: license_key.into(),
            ..Self::default()
        }
    }

    /// Loads a JSON configuration file. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or fails validation.
    pub fn from_file(path: impl AsRef<Path>) -> LeaseResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| LeaseError::Config(format!("failed to read {}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration for contradictions.
    ///
    /// # Errors
    ///
    /// Returns [`LeaseError::Config`] describing the first problem found.
    pub fn validate(&self) -> LeaseResult<()> {
        if self.endpoint.trim().is_empty() {
            return Err(LeaseError::Config("endpoint must not be empty".to_string()));
        }
        if self.default_lease_secs == 0 {
            return Err(LeaseError::Config(
                "default_lease_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the renewal lookahead as a chrono duration.
    #[must_use]
    pub fn renewal_threshold(&self) -> chrono::Duration {
        i64::try_from(self.renewal_threshold_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }
}
