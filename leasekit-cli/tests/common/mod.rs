//! Scripted authority and fixtures for command tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use leasekit::{
    AuthorityError, AuthorityResult, Grant, KeyValidation, LeaseConfig, LeaseGrant,
    LeaseManager, LeaseStore, LeaseValidation, LicenseAuthority, ObtainLeaseRequest,
    ReleaseLeaseRequest, ReleaseOutcome, RenewLeaseRequest, ValidateKeyRequest,
    ValidateLeaseRequest,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Default)]
struct Script {
    obtain: VecDeque<AuthorityResult<LeaseGrant>>,
    validate: VecDeque<AuthorityResult<LeaseValidation>>,
    renew: VecDeque<AuthorityResult<LeaseGrant>>,
    release: VecDeque<AuthorityResult<ReleaseOutcome>>,
    released: Vec<String>,
}

/// Authority answering from queued results. An unscripted call panics.
#[derive(Clone, Default)]
pub struct ScriptedAuthority {
    script: Arc<Mutex<Script>>,
}

impl ScriptedAuthority {
    pub fn on_obtain(&self, result: AuthorityResult<LeaseGrant>) -> &Self {
        self.script.lock().unwrap().obtain.push_back(result);
        self
    }

    pub fn on_validate(&self, result: AuthorityResult<LeaseValidation>) -> &Self {
        self.script.lock().unwrap().validate.push_back(result);
        self
    }

    pub fn on_renew(&self, result: AuthorityResult<LeaseGrant>) -> &Self {
        self.script.lock().unwrap().renew.push_back(result);
        self
    }

    pub fn on_release(&self, result: AuthorityResult<ReleaseOutcome>) -> &Self {
        self.script.lock().unwrap().release.push_back(result);
        self
    }

    /// Leases sent to the release endpoint, in order.
    pub fn released(&self) -> Vec<String> {
        self.script.lock().unwrap().released.clone()
    }
}

fn next<T>(queue: &mut VecDeque<AuthorityResult<T>>, op: &str) -> AuthorityResult<T> {
    queue
        .pop_front()
        .unwrap_or_else(|| panic!("unscripted {op} call"))
}

#[async_trait]
impl LicenseAuthority for ScriptedAuthority {
    async fn validate_key(&self, _request: &ValidateKeyRequest) -> AuthorityResult<KeyValidation> {
        panic!("unscripted validate_key call")
    }

    async fn obtain_lease(&self, _request: &ObtainLeaseRequest) -> AuthorityResult<LeaseGrant> {
        next(&mut self.script.lock().unwrap().obtain, "obtain_lease")
    }

    async fn validate_lease(
        &self,
        _request: &ValidateLeaseRequest,
    ) -> AuthorityResult<LeaseValidation> {
        next(&mut self.script.lock().unwrap().validate, "validate_lease")
    }

    async fn renew_lease(&self, _request: &RenewLeaseRequest) -> AuthorityResult<LeaseGrant> {
        next(&mut self.script.lock().unwrap().renew, "renew_lease")
    }

    async fn release_lease(
        &self,
        request: &ReleaseLeaseRequest,
    ) -> AuthorityResult<ReleaseOutcome> {
        let mut script = self.script.lock().unwrap();
        script.released.push(request.lease.clone());
        next(&mut script.release, "release_lease")
    }
}

pub fn far_future() -> DateTime<Utc> {
    Utc::now() + Duration::days(30)
}

/// Inside the default 300 s renewal window.
pub fn soon() -> DateTime<Utc> {
    Utc::now() + Duration::seconds(60)
}

pub fn granted(lease: &str, expiry: DateTime<Utc>) -> LeaseGrant {
    LeaseGrant {
        success: true,
        lease: Some(lease.to_string()),
        expiry: Some(expiry),
        valid_for: vec![Grant::new("pro")],
        error_code: None,
    }
}

pub fn valid(expiry: DateTime<Utc>) -> LeaseValidation {
    LeaseValidation {
        is_valid: true,
        error_code: None,
        expiry: Some(expiry),
        valid_for: vec![Grant::new("pro")],
    }
}

pub fn service_unavailable() -> AuthorityError {
    AuthorityError::UnexpectedStatus {
        status: 503,
        body: "maintenance".to_string(),
    }
}

pub fn test_config() -> LeaseConfig {
    LeaseConfig {
        endpoint: "http://authority.test".to_string(),
        license_key: "KEY-1234".to_string(),
        client_id: Some("client-1".to_string()),
        ..LeaseConfig::default()
    }
}

/// A manager over a fresh scripted authority and a lease file in a temp dir.
pub fn setup() -> (
    LeaseManager<ScriptedAuthority>,
    ScriptedAuthority,
    LeaseStore,
    TempDir,
) {
    let dir = TempDir::new().unwrap();
    let store = LeaseStore::new(dir.path().join("lease.json"));
    let authority = ScriptedAuthority::default();
    let manager = LeaseManager::new(test_config(), authority.clone()).unwrap();
    (manager, authority, store, dir)
}

/// The lease currently in the lease file.
pub fn stored_lease(store: &LeaseStore) -> Option<String> {
    store.load().unwrap().map(|stored| stored.lease)
}
