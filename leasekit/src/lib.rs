//! Client-side license leases.
//!
//! This crate handles:
//! - License key validation against a remote licensing authority
//! - Obtaining, validating, renewing and releasing time-bounded leases
//! - Offline lease verification via Ed25519-signed lease tokens
//! - Persisting the current lease between runs
//!
//! # Lease lifecycle
//!
//! A [`LeaseManager`] holds at most one lease. [`LeaseManager::check`] is the
//! entry point most applications need: it validates the lease, falls back to
//! offline verification when the authority cannot answer, obtains a lease
//! when none is usable and renews ahead of expiry.
//!
//! # Error model
//!
//! - **Rejection**: the authority declined (HTTP 400-409). Returned as a
//!   negative result with an `error_code`, never as `Err`.
//! - **Fault**: anything else. Returned as [`LeaseError`].
//! - **Offline failure**: always a negative result with error code
//!   [`OFFLINE_VALIDATION_FAILED`].

mod authority;
mod client_id;
mod config;
mod error;
#[cfg(feature = "online")]
mod http;
mod manager;
mod protocol;
mod store;
mod token;

pub use authority::LicenseAuthority;
pub use client_id::device_client_id;
pub use config::LeaseConfig;
pub use error::{AuthorityError, AuthorityResult, LeaseError, LeaseResult, VerifyError};
pub use manager::{LeaseManager, needs_renewal};
pub use protocol::{
    CheckOutcome, Grant, KeyValidation, LeaseGrant, LeaseValidation, NO_LEASE,
    OFFLINE_VALIDATION_FAILED, ObtainLeaseRequest, ReleaseLeaseRequest, ReleaseOutcome,
    RenewLeaseRequest, ValidateKeyRequest, ValidateLeaseRequest,
};
pub use store::{LeaseStore, StoredLease};
pub use token::{Ed25519Verifier, LEASE_TOKEN_ALGORITHM, LeaseClaims, SignatureVerifier};

#[cfg(feature = "online")]
pub use http::HttpAuthority;
