//! Wire types exchanged with the licensing authority.
//!
//! All payloads are JSON with camelCase field names. Response fields that the
//! authority may omit default to empty so partial answers still decode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error code returned when an operation needs a lease and none is held.
pub const NO_LEASE: &str = "no-lease";

/// Error code returned when offline token verification fails for any reason.
pub const OFFLINE_VALIDATION_FAILED: &str = "offline-validation-failed";

/// A single product or feature grant carried in `validFor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    /// Product or feature identifier.
    pub id: String,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Grant {
    /// Creates a grant without a description.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: None,
        }
    }
}

// ── Requests ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateKeyRequest {
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObtainLeaseRequest {
    pub key: String,
    /// Requested lease duration in seconds.
    pub expiry: u64,
    pub client_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateLeaseRequest {
    pub lease: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewLeaseRequest {
    pub lease: String,
    /// Requested lease duration in seconds.
    pub expiry: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseLeaseRequest {
    pub lease: String,
}

// ── Responses / results ─────────────────────────────────────────

/// Result of validating a license key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyValidation {
    pub is_valid: bool,
    pub expiry: Option<DateTime<Utc>>,
    /// Maximum concurrent leases the key allows.
    pub lease_limit: Option<u32>,
    /// Leases currently in use against the key.
    pub leases_use: Option<u32>,
    pub valid_for: Vec<Grant>,
}

impl KeyValidation {
    /// A negative result for a key the authority declined.
    #[must_use]
    pub fn rejected() -> Self {
        Self::default()
    }
}

/// Result of obtaining or renewing a lease.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeaseGrant {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    pub valid_for: Vec<Grant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl LeaseGrant {
    /// A failed grant carrying the authority's reason.
    #[must_use]
    pub fn rejected(error_code: Option<String>) -> Self {
        Self {
            error_code,
            ..Self::default()
        }
    }
}

/// Result of validating a lease, online or offline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeaseValidation {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    pub valid_for: Vec<Grant>,
}

impl LeaseValidation {
    /// An invalid result carrying the given reason.
    ///
    /// `None` means the validation could not complete, as opposed to a
    /// definitive rejection.
    #[must_use]
    pub fn invalid(error_code: Option<String>) -> Self {
        Self {
            error_code,
            ..Self::default()
        }
    }

    /// True when the lease is invalid but nobody said why.
    #[must_use]
    pub fn is_inconclusive(&self) -> bool {
        !self.is_valid && self.error_code.is_none()
    }
}

/// Result of releasing a lease.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReleaseOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl ReleaseOutcome {
    #[must_use]
    pub fn rejected(error_code: Option<String>) -> Self {
        Self {
            success: false,
            error_code,
        }
    }
}

/// Result of [`LeaseManager::check`](crate::LeaseManager::check).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckOutcome {
    pub success: bool,
    pub valid_for: Vec<Grant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CheckOutcome {
    #[must_use]
    pub fn granted(valid_for: Vec<Grant>) -> Self {
        Self {
            success: true,
            valid_for,
            error_code: None,
        }
    }

    #[must_use]
    pub fn failed(error_code: Option<String>) -> Self {
        Self {
            success: false,
            valid_for: Vec::new(),
            error_code,
        }
    }
}

/// Body of a rejection response.
#[cfg_attr(not(feature = "online"), allow(dead_code))]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct ErrorBody {
    #[serde(alias = "code")]
    pub error_code: Option<String>,
}
