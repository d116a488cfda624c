//! Lease persistence.
//!
//! Keeps the current lease token on disk so an application can pick up where
//! it left off after a restart instead of obtaining a fresh lease.

use crate::error::{LeaseError, LeaseResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A lease as written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredLease {
    /// The lease token.
    pub lease: String,
    /// When the lease was saved.
    pub saved_at: DateTime<Utc>,
}

/// File-backed store for a single lease.
#[derive(Debug, Clone)]
pub struct LeaseStore {
    path: PathBuf,
}

impl LeaseStore {
    /// Creates a store at the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store in the platform data directory
    /// (e.g. `~/.local/share/leasekit/lease.json`).
    ///
    /// # Errors
    ///
    /// Returns an error if no data directory exists for this platform.
    pub fn default_location() -> LeaseResult<Self> {
        let dir = dirs::data_dir()
            .ok_or_else(|| LeaseError::Storage("no data directory available".to_string()))?;
        Ok(Self::new(dir.join("leasekit").join("lease.json")))
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored lease, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> LeaseResult<Option<StoredLease>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| LeaseError::Storage(format!("failed to read lease file: {e}")))?;
        let stored: StoredLease = serde_json::from_str(&content)?;
        Ok(Some(stored))
    }

    /// Writes `lease`, or removes the file when `lease` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or removed.
    pub fn save(&self, lease: Option<&str>) -> LeaseResult<()> {
        let Some(lease) = lease else {
            return self.clear();
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| LeaseError::Storage(format!("failed to create directory: {e}")))?;
        }

        let stored = StoredLease {
            lease: lease.to_string(),
            saved_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&stored)?;

        // Written beside the lease file, then renamed over it.
        let tmp = self.temp_path();
        fs::write(&tmp, json)
            .map_err(|e| LeaseError::Storage(format!("failed to write lease file: {e}")))?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(LeaseError::Storage(format!("failed to replace lease file: {e}")));
        }

        debug!(path = %self.path.display(), "saved lease");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "lease.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Removes the stored lease.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn clear(&self) -> LeaseResult<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .map_err(|e| LeaseError::Storage(format!("failed to remove lease file: {e}")))?;
        }
        Ok(())
    }
}
