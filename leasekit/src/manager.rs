//! The lease manager.
//!
//! A [`LeaseManager`] is a client session bound to one license key and at
//! most one lease. The lifecycle operations talk to the licensing authority
//! directly; [`LeaseManager::check`] strings them together into the policy an
//! application usually wants: hold a usable lease, refresh it before it runs
//! out, and fall back to offline verification only when the authority could
//! not give a definitive answer.
//!
//! Mutating operations take `&mut self`. Sharing a manager between tasks
//! needs an outer lock held across each whole operation, since `check`,
//! `renew_lease` and `release_lease` all read and replace the current lease.

use crate::authority::LicenseAuthority;
use crate::client_id::device_client_id;
use crate::config::LeaseConfig;
use crate::error::{AuthorityError, LeaseError, LeaseResult};
use crate::protocol::{
    CheckOutcome, KeyValidation, LeaseGrant, LeaseValidation, NO_LEASE,
    OFFLINE_VALIDATION_FAILED, ObtainLeaseRequest, ReleaseLeaseRequest, ReleaseOutcome,
    RenewLeaseRequest, ValidateKeyRequest, ValidateLeaseRequest,
};
use crate::token::{Ed25519Verifier, SignatureVerifier};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

/// Returns true if a lease expiring at `expiry` should be renewed at `now`.
///
/// The boundary is inclusive: a lease expiring exactly at `now + threshold`
/// is renewed.
#[must_use]
pub fn needs_renewal(expiry: DateTime<Utc>, now: DateTime<Utc>, threshold: Duration) -> bool {
    match now.checked_add_signed(threshold) {
        Some(deadline) => expiry <= deadline,
        None => true,
    }
}

/// Shortened token for log output.
fn redact(token: &str) -> &str {
    token.get(..8).unwrap_or(token)
}

/// Client session holding at most one lease.
pub struct LeaseManager<A> {
    authority: A,
    verifier: Option<Box<dyn SignatureVerifier>>,
    license_key: String,
    client_id: String,
    default_lease_secs: u64,
    renewal_threshold: Duration,
    offline_check: bool,
    current_lease: Option<String>,
}

#[cfg(feature = "online")]
impl LeaseManager<crate::http::HttpAuthority> {
    /// Builds a manager talking HTTP to the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn connect(config: LeaseConfig) -> LeaseResult<Self> {
        let authority = crate::http::HttpAuthority::from_config(&config)?;
        Self::new(config, authority)
    }
}

impl<A: LicenseAuthority> LeaseManager<A> {
    /// Creates a manager with no lease held.
    ///
    /// A signature verifier is set up only if the configuration carries a
    /// public key.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or its public key
    /// cannot be decoded.
    pub fn new(config: LeaseConfig, authority: A) -> LeaseResult<Self> {
        config.validate()?;

        let verifier = match config.public_key.as_deref() {
            Some(key) => {
                Some(Box::new(Ed25519Verifier::from_public_key(key)?) as Box<dyn SignatureVerifier>)
            }
            None => None,
        };

        let renewal_threshold = config.renewal_threshold();
        let client_id = config.client_id.unwrap_or_else(device_client_id);

        Ok(Self {
            authority,
            verifier,
            license_key: config.license_key,
            client_id,
            default_lease_secs: config.default_lease_secs,
            renewal_threshold,
            offline_check: config.offline_check,
            current_lease: None,
        })
    }

    /// Replaces the signature verifier used for offline validation.
    ///
    /// With `offline_check` set, this also turns on the offline fallback in
    /// [`check`](Self::check) when no `public_key` was configured.
    #[must_use]
    pub fn with_verifier(mut self, verifier: impl SignatureVerifier + 'static) -> Self {
        self.verifier = Some(Box::new(verifier));
        self
    }

    /// Returns the licensing authority.
    pub fn authority(&self) -> &A {
        &self.authority
    }

    /// Returns the license key.
    pub fn license_key(&self) -> &str {
        &self.license_key
    }

    /// Replaces the license key. The current lease is kept.
    pub fn set_license_key(&mut self, key: impl Into<String>) {
        self.license_key = key.into();
    }

    /// Returns the client identifier sent when obtaining leases.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the lease currently held.
    pub fn current_lease(&self) -> Option<&str> {
        self.current_lease.as_deref()
    }

    /// Restores a lease held from an earlier session (e.g. from a
    /// [`LeaseStore`](crate::LeaseStore)).
    pub fn set_current_lease(&mut self, lease: Option<String>) {
        self.current_lease = lease;
    }

    /// Returns true if offline validation can be attempted at all.
    pub fn can_validate_offline(&self) -> bool {
        self.verifier.is_some()
    }

    fn offline_fallback_enabled(&self) -> bool {
        self.offline_check && self.verifier.is_some()
    }

    /// Asks the authority whether the license key is valid.
    ///
    /// A rejected key yields `is_valid: false` rather than an error.
    ///
    /// # Errors
    ///
    /// Returns an error on any fault other than a rejection.
    pub async fn validate_key(&self) -> LeaseResult<KeyValidation> {
        let request = ValidateKeyRequest {
            key: self.license_key.clone(),
        };

        match self.authority.validate_key(&request).await {
            Ok(result) => Ok(result),
            Err(AuthorityError::Rejected { status, .. }) => {
                warn!(status, "license key rejected");
                Ok(KeyValidation::rejected())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Obtains a new lease, keeping it as the current lease on success.
    ///
    /// `expiry` is the requested duration in seconds; the configured default
    /// is used when `None`.
    ///
    /// # Errors
    ///
    /// Returns an error on any fault other than a rejection, including a
    /// success response without a lease token.
    pub async fn obtain_lease(&mut self, expiry: Option<u64>) -> LeaseResult<LeaseGrant> {
        let request = ObtainLeaseRequest {
            key: self.license_key.clone(),
            expiry: expiry.unwrap_or(self.default_lease_secs),
            client_id: self.client_id.clone(),
        };

        let grant = match self.authority.obtain_lease(&request).await {
            Ok(grant) => grant,
            Err(AuthorityError::Rejected { error_code, .. }) => {
                warn!(?error_code, "lease request rejected");
                return Ok(LeaseGrant::rejected(error_code));
            }
            Err(e) => return Err(e.into()),
        };

        if grant.success {
            let lease = grant.lease.clone().ok_or_else(|| {
                AuthorityError::MalformedResponse("lease granted without a token".to_string())
            })?;
            info!(lease = redact(&lease), expiry = ?grant.expiry, "obtained lease");
            self.current_lease = Some(lease);
        }

        Ok(grant)
    }

    /// Validates the current lease with the authority.
    ///
    /// Does not change the current lease. With no lease held the result is
    /// invalid with error code [`NO_LEASE`] and the authority is not called.
    ///
    /// # Errors
    ///
    /// Returns an error on any fault other than a rejection.
    pub async fn validate_lease(&self) -> LeaseResult<LeaseValidation> {
        let Some(lease) = self.current_lease.clone() else {
            return Ok(LeaseValidation::invalid(Some(NO_LEASE.to_string())));
        };

        match self
            .authority
            .validate_lease(&ValidateLeaseRequest { lease })
            .await
        {
            Ok(result) => Ok(result),
            Err(AuthorityError::Rejected { error_code, .. }) => {
                debug!(?error_code, "lease rejected");
                Ok(LeaseValidation::invalid(error_code))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Verifies the current lease's signature and expiry without the network.
    ///
    /// Any verification failure yields an invalid result with error code
    /// [`OFFLINE_VALIDATION_FAILED`].
    ///
    /// # Errors
    ///
    /// Precondition: a signing key must have been configured. Without one
    /// this returns [`LeaseError::OfflineUnavailable`].
    pub fn validate_lease_offline(&self) -> LeaseResult<LeaseValidation> {
        let verifier = self
            .verifier
            .as_ref()
            .ok_or(LeaseError::OfflineUnavailable)?;

        let verified = match self.current_lease.as_deref() {
            Some(lease) => verifier.verify(lease, Utc::now()),
            None => Err(crate::error::VerifyError::MissingToken),
        };

        match verified {
            Ok(claims) => Ok(LeaseValidation {
                is_valid: true,
                error_code: None,
                expiry: claims.expires_at(),
                valid_for: claims.valid_for,
            }),
            Err(e) => {
                debug!(error = %e, "offline lease validation failed");
                Ok(LeaseValidation::invalid(Some(
                    OFFLINE_VALIDATION_FAILED.to_string(),
                )))
            }
        }
    }

    /// Exchanges the current lease for a new one.
    ///
    /// On success the new lease replaces the old one; invalidating the old
    /// lease is left to the authority. With no lease held the result carries
    /// [`NO_LEASE`] and the authority is not called.
    ///
    /// # Errors
    ///
    /// Returns an error on any fault other than a rejection, including a
    /// success response without a lease token.
    pub async fn renew_lease(&mut self, expiry: Option<u64>) -> LeaseResult<LeaseGrant> {
        let Some(lease) = self.current_lease.clone() else {
            return Ok(LeaseGrant::rejected(Some(NO_LEASE.to_string())));
        };

        let request = RenewLeaseRequest {
            lease,
            expiry: expiry.unwrap_or(self.default_lease_secs),
        };

        let grant = match self.authority.renew_lease(&request).await {
            Ok(grant) => grant,
            Err(AuthorityError::Rejected { error_code, .. }) => {
                warn!(?error_code, "lease renewal rejected");
                return Ok(LeaseGrant::rejected(error_code));
            }
            Err(e) => return Err(e.into()),
        };

        if grant.success {
            let renewed = grant.lease.clone().ok_or_else(|| {
                AuthorityError::MalformedResponse("lease renewed without a token".to_string())
            })?;
            info!(lease = redact(&renewed), expiry = ?grant.expiry, "renewed lease");
            self.current_lease = Some(renewed);
        }

        Ok(grant)
    }

    /// Releases the current lease.
    ///
    /// The lease is forgotten locally whatever the outcome, including when
    /// the call faults.
    ///
    /// # Errors
    ///
    /// Returns an error on any fault other than a rejection.
    pub async fn release_lease(&mut self) -> LeaseResult<ReleaseOutcome> {
        let Some(lease) = self.current_lease.take() else {
            return Ok(ReleaseOutcome::rejected(Some(NO_LEASE.to_string())));
        };

        match self
            .authority
            .release_lease(&ReleaseLeaseRequest { lease })
            .await
        {
            Ok(outcome) => {
                info!(success = outcome.success, "released lease");
                Ok(outcome)
            }
            Err(AuthorityError::Rejected { error_code, .. }) => {
                warn!(?error_code, "lease release rejected");
                Ok(ReleaseOutcome::rejected(error_code))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Makes sure a usable lease is held.
    ///
    /// 1. Validate the current lease online.
    /// 2. If that was inconclusive (invalid without an error code, or the
    ///    authority was unreachable) and offline checking is allowed, use
    ///    the offline result instead. An explicit rejection never falls back.
    /// 3. If the lease is still invalid, obtain a new one.
    /// 4. If the lease expires within the renewal threshold, renew it and
    ///    validate the new lease online for its grants.
    ///
    /// # Errors
    ///
    /// Returns an error on any authority fault. An unreachable authority is
    /// only tolerated at step 1, and only when offline checking is allowed.
    pub async fn check(&mut self) -> LeaseResult<CheckOutcome> {
        let mut validation = match self.validate_lease().await {
            Ok(validation) => validation,
            Err(LeaseError::Authority(e)) if e.is_unreachable() && self.offline_fallback_enabled() => {
                warn!(error = %e, "licensing authority unreachable");
                LeaseValidation::invalid(None)
            }
            Err(e) => return Err(e),
        };

        if validation.is_inconclusive() && self.offline_fallback_enabled() {
            debug!("falling back to offline lease validation");
            validation = self.validate_lease_offline()?;
        }

        let (expiry, mut valid_for) = if validation.is_valid {
            (validation.expiry, validation.valid_for)
        } else {
            debug!(error_code = ?validation.error_code, "no usable lease, obtaining one");
            let grant = self.obtain_lease(None).await?;
            if !grant.success {
                return Ok(CheckOutcome::failed(grant.error_code));
            }
            (grant.expiry, grant.valid_for)
        };

        if let Some(expiry) = expiry
            && needs_renewal(expiry, Utc::now(), self.renewal_threshold)
        {
            debug!(%expiry, "lease inside renewal window");
            let renewed = self.renew_lease(None).await?;
            if !renewed.success {
                return Ok(CheckOutcome::failed(renewed.error_code));
            }

            let revalidated = self.validate_lease().await?;
            if !revalidated.is_valid {
                return Ok(CheckOutcome::failed(revalidated.error_code));
            }
            valid_for = revalidated.valid_for;
        }

        Ok(CheckOutcome::granted(valid_for))
    }
}
