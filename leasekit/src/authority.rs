//! Licensing authority abstraction.
//!
//! The lease manager talks to the authority only through this trait, so the
//! transport can be HTTP ([`HttpAuthority`](crate::HttpAuthority)) or a test
//! double.

use crate::error::AuthorityResult;
use crate::protocol::{
    KeyValidation, LeaseGrant, LeaseValidation, ObtainLeaseRequest, ReleaseLeaseRequest,
    ReleaseOutcome, RenewLeaseRequest, ValidateKeyRequest, ValidateLeaseRequest,
};
use async_trait::async_trait;

/// A remote licensing authority.
///
/// Implementations report a declined request as
/// [`AuthorityError::Rejected`](crate::AuthorityError::Rejected) and anything
/// else that went wrong as one of the fault variants. They must not retry.
#[async_trait]
pub trait LicenseAuthority: Send + Sync {
    /// Checks a license key.
    async fn validate_key(&self, request: &ValidateKeyRequest) -> AuthorityResult<KeyValidation>;

    /// Requests a new lease for a key.
    async fn obtain_lease(&self, request: &ObtainLeaseRequest) -> AuthorityResult<LeaseGrant>;

    /// Checks a lease token.
    async fn validate_lease(
        &self,
        request: &ValidateLeaseRequest,
    ) -> AuthorityResult<LeaseValidation>;

    /// Exchanges a lease for a fresh one.
    async fn renew_lease(&self, request: &RenewLeaseRequest) -> AuthorityResult<LeaseGrant>;

    /// Gives a lease back.
    async fn release_lease(&self, request: &ReleaseLeaseRequest)
    -> AuthorityResult<ReleaseOutcome>;
}
