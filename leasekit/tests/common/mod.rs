//! Shared test helpers for lease tests.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::{Signer, SigningKey};
use leasekit::{
    AuthorityError, AuthorityResult, Grant, KeyValidation, LeaseConfig, LeaseGrant,
    LeaseManager, LeaseValidation, LicenseAuthority, ObtainLeaseRequest, ReleaseLeaseRequest,
    ReleaseOutcome, RenewLeaseRequest, ValidateKeyRequest, ValidateLeaseRequest,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Returns a deterministic Ed25519 key pair from a fixed seed.
pub fn test_keypair() -> (SigningKey, [u8; 32]) {
    let seed: [u8; 32] = [
        1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24,
        25, 26, 27, 28, 29, 30, 31, 32,
    ];
    let signing_key = SigningKey::from_bytes(&seed);
    let verifying_key = signing_key.verifying_key();
    (signing_key, verifying_key.to_bytes())
}

/// Public key of [`test_keypair`] in the base64 form the config expects.
pub fn test_public_key_b64() -> String {
    use base64::engine::general_purpose::STANDARD;
    STANDARD.encode(test_keypair().1)
}

/// Creates a signed lease token `header.claims.signature`.
pub fn sign_token(signing_key: &SigningKey, claims_json: &str) -> String {
    let header_b64 = URL_SAFE_NO_PAD.encode(r#"{"alg":"EdDSA","typ":"JWT"}"#);
    let claims_b64 = URL_SAFE_NO_PAD.encode(claims_json.as_bytes());
    let signature = signing_key.sign(format!("{header_b64}.{claims_b64}").as_bytes());
    let sig_b64 = URL_SAFE_NO_PAD.encode(signature.to_bytes());
    format!("{header_b64}.{claims_b64}.{sig_b64}")
}

/// Creates a signed lease token expiring at `exp` granting `features`.
pub fn make_lease_token(signing_key: &SigningKey, exp: DateTime<Utc>, features: &[&str]) -> String {
    let grants: Vec<String> = features
        .iter()
        .map(|f| format!(r#"{{"id":"{f}"}}"#))
        .collect();
    let claims = format!(
        r#"{{"exp":{},"sub":"lease-1","validFor":[{}]}}"#,
        exp.timestamp(),
        grants.join(",")
    );
    sign_token(signing_key, &claims)
}

pub fn far_future() -> DateTime<Utc> {
    Utc::now() + Duration::days(30)
}

pub fn soon() -> DateTime<Utc> {
    Utc::now() + Duration::seconds(60)
}

pub fn grants(ids: &[&str]) -> Vec<Grant> {
    ids.iter().map(|id| Grant::new(*id)).collect()
}

pub fn rejected(status: u16, code: &str) -> AuthorityError {
    AuthorityError::Rejected {
        status,
        error_code: Some(code.to_string()),
    }
}

pub fn unreachable() -> AuthorityError {
    AuthorityError::Unreachable("connection refused".to_string())
}

pub fn valid(expiry: DateTime<Utc>, features: &[&str]) -> LeaseValidation {
    LeaseValidation {
        is_valid: true,
        error_code: None,
        expiry: Some(expiry),
        valid_for: grants(features),
    }
}

pub fn granted(lease: &str, expiry: DateTime<Utc>, features: &[&str]) -> LeaseGrant {
    LeaseGrant {
        success: true,
        lease: Some(lease.to_string()),
        expiry: Some(expiry),
        valid_for: grants(features),
        error_code: None,
    }
}

/// A call observed by [`MockAuthority`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ValidateKey { key: String },
    Obtain { key: String, expiry: u64, client_id: String },
    Validate { lease: String },
    Renew { lease: String, expiry: u64 },
    Release { lease: String },
}

#[derive(Default)]
struct Script {
    validate_key: VecDeque<AuthorityResult<KeyValidation>>,
    obtain: VecDeque<AuthorityResult<LeaseGrant>>,
    validate: VecDeque<AuthorityResult<LeaseValidation>>,
    renew: VecDeque<AuthorityResult<LeaseGrant>>,
    release: VecDeque<AuthorityResult<ReleaseOutcome>>,
    calls: Vec<Call>,
}

/// Scripted licensing authority. Each operation pops its next queued answer;
/// an unscripted call panics.
#[derive(Clone, Default)]
pub struct MockAuthority {
    script: Arc<Mutex<Script>>,
}

impl MockAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_validate_key(&self, result: AuthorityResult<KeyValidation>) -> &Self {
        self.script.lock().unwrap().validate_key.push_back(result);
        self
    }

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

    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    pub fn validate_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Validate { .. }))
    }

    pub fn obtain_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Obtain { .. }))
    }

    pub fn renew_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Renew { .. }))
    }
}

fn next<T>(queue: &mut VecDeque<AuthorityResult<T>>, op: &str) -> AuthorityResult<T> {
    queue
        .pop_front()
        .unwrap_or_else(|| panic!("unscripted {op} call"))
}

#[async_trait]
impl LicenseAuthority for MockAuthority {
    async fn validate_key(&self, request: &ValidateKeyRequest) -> AuthorityResult<KeyValidation> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(Call::ValidateKey {
            key: request.key.clone(),
        });
        next(&mut script.validate_key, "validate_key")
    }

    async fn obtain_lease(&self, request: &ObtainLeaseRequest) -> AuthorityResult<LeaseGrant> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(Call::Obtain {
            key: request.key.clone(),
            expiry: request.expiry,
            client_id: request.client_id.clone(),
        });
        next(&mut script.obtain, "obtain_lease")
    }

    async fn validate_lease(
        &self,
        request: &ValidateLeaseRequest,
    ) -> AuthorityResult<LeaseValidation> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(Call::Validate {
            lease: request.lease.clone(),
        });
        next(&mut script.validate, "validate_lease")
    }

    async fn renew_lease(&self, request: &RenewLeaseRequest) -> AuthorityResult<LeaseGrant> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(Call::Renew {
            lease: request.lease.clone(),
            expiry: request.expiry,
        });
        next(&mut script.renew, "renew_lease")
    }

    async fn release_lease(
        &self,
        request: &ReleaseLeaseRequest,
    ) -> AuthorityResult<ReleaseOutcome> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(Call::Release {
            lease: request.lease.clone(),
        });
        next(&mut script.release, "release_lease")
    }
}

/// Base configuration: 300 s renewal threshold, fixed client id.
pub fn test_config() -> LeaseConfig {
    LeaseConfig {
        endpoint: "http://authority.test".to_string(),
        license_key: "KEY-1234".to_string(),
        client_id: Some("client-1".to_string()),
        default_lease_secs: 3600,
        renewal_threshold_secs: 300,
        ..LeaseConfig::default()
    }
}

/// Configuration with the test public key and offline checking on.
pub fn offline_config() -> LeaseConfig {
    LeaseConfig {
        public_key: Some(test_public_key_b64()),
        offline_check: true,
        ..test_config()
    }
}

/// Builds a manager over a fresh mock authority, returning a handle to the mock.
pub fn manager_with(config: LeaseConfig) -> (LeaseManager<MockAuthority>, MockAuthority) {
    let authority = MockAuthority::new();
    let manager = LeaseManager::new(config, authority.clone()).unwrap();
    (manager, authority)
}
