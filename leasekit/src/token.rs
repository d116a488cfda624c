//! Offline lease token verification.
//!
//! Lease tokens are compact JWS strings:
//! `base64url(header).base64url(claims).base64url(signature)`
//!
//! The header must be `{"alg":"EdDSA"}` (the `typ` field is ignored). The
//! signature is Ed25519 over the ASCII bytes `header_b64.claims_b64`, matching
//! what the licensing authority issues. Claims carry:
//! - `exp`: expiry timestamp (seconds since epoch)
//! - `iat`: issued-at timestamp (optional)
//! - `sub`: lease subject (optional)
//! - `validFor`: product/feature grants

use crate::error::{LeaseError, LeaseResult, VerifyError};
use crate::protocol::Grant;
use base64::{
    Engine,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use chrono::{DateTime, Utc};
use ed25519_dalek::pkcs8::DecodePublicKey;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

/// The only signing algorithm accepted for lease tokens.
pub const LEASE_TOKEN_ALGORITHM: &str = "EdDSA";

/// Verifies lease tokens without contacting the authority.
pub trait SignatureVerifier: Send + Sync {
    /// Verifies authenticity and expiry of `token` as of `now`, returning its claims.
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<LeaseClaims, VerifyError>;
}

#[derive(Debug, Deserialize)]
struct TokenHeader {
    alg: String,
}

/// Claims embedded in a signed lease token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseClaims {
    /// Expiry timestamp (seconds since epoch).
    pub exp: i64,
    /// Issued-at timestamp (seconds since epoch).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Lease subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Grants this lease authorizes.
    #[serde(default)]
    pub valid_for: Vec<Grant>,
}

impl LeaseClaims {
    /// Returns the expiry as a UTC timestamp.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Ed25519 verifier for lease tokens.
#[derive(Debug, Clone)]
pub struct Ed25519Verifier {
    key: VerifyingKey,
}

impl Ed25519Verifier {
    /// Creates a verifier from raw public key bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid Ed25519 point.
    pub fn from_bytes(bytes: &[u8; 32]) -> LeaseResult<Self> {
        let key = VerifyingKey::from_bytes(bytes)
            .map_err(|e| LeaseError::InvalidPublicKey(e.to_string()))?;
        Ok(Self { key })
    }

    /// Creates a verifier from a configured public key.
    ///
    /// Accepts either an SPKI PEM block or standard base64 of the 32 raw
    /// key bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be decoded.
    pub fn from_public_key(encoded: &str) -> LeaseResult<Self> {
        let encoded = encoded.trim();

        if encoded.starts_with("-----BEGIN") {
            let key = VerifyingKey::from_public_key_pem(encoded)
                .map_err(|e| LeaseError::InvalidPublicKey(format!("invalid PEM: {e}")))?;
            return Ok(Self { key });
        }

        let raw = STANDARD
            .decode(encoded)
            .map_err(|e| LeaseError::InvalidPublicKey(format!("invalid base64: {e}")))?;
        let bytes: [u8; 32] = raw.as_slice().try_into().map_err(|_| {
            LeaseError::InvalidPublicKey(format!("expected 32 bytes, got {}", raw.len()))
        })?;
        Self::from_bytes(&bytes)
    }

    /// Returns the raw public key bytes.
    #[must_use]
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.key.to_bytes()
    }
}

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<LeaseClaims, VerifyError> {
        let token = token.trim();

        let parts: Vec<&str> = token.split('.').collect();
        let [header_b64, claims_b64, signature_b64] = parts.as_slice() else {
            return Err(VerifyError::Malformed(
                "token must have exactly three dot-separated parts".to_string(),
            ));
        };

        let header_json = URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|e| VerifyError::Malformed(format!("invalid header base64: {e}")))?;
        let header: TokenHeader = serde_json::from_slice(&header_json)
            .map_err(|e| VerifyError::Malformed(format!("invalid header JSON: {e}")))?;
        if header.alg != LEASE_TOKEN_ALGORITHM {
            return Err(VerifyError::UnsupportedAlgorithm(header.alg));
        }

        let sig_bytes = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|e| VerifyError::Malformed(format!("invalid signature base64: {e}")))?;
        let signature = Signature::from_slice(&sig_bytes)
            .map_err(|_| VerifyError::Malformed("invalid signature length".to_string()))?;

        let signing_input = &token[..header_b64.len() + 1 + claims_b64.len()];
        self.key
            .verify(signing_input.as_bytes(), &signature)
            .map_err(|_| VerifyError::InvalidSignature)?;

        let claims_json = URL_SAFE_NO_PAD
            .decode(claims_b64)
            .map_err(|e| VerifyError::Malformed(format!("invalid claims base64: {e}")))?;
        let claims: LeaseClaims = serde_json::from_slice(&claims_json)
            .map_err(|e| VerifyError::Malformed(format!("invalid claims JSON: {e}")))?;

        if claims.exp <= now.timestamp() {
            return Err(VerifyError::Expired(claims.exp));
        }

        Ok(claims)
    }
}
