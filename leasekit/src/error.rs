//! Error types for the lease client.
//!
//! Outcomes from the licensing authority come in two classes. A *rejection*
//! means the authority was reached and declined the request (HTTP 400-409);
//! the manager turns those into structured negative results. Everything else
//! is a *fault* and propagates to the caller.

use thiserror::Error;

/// Result type for calls against the licensing authority.
pub type AuthorityResult<T> = Result<T, AuthorityError>;

/// Result type for lease manager operations.
pub type LeaseResult<T> = Result<T, LeaseError>;

/// Errors reported by a [`LicenseAuthority`](crate::LicenseAuthority).
#[derive(Debug, Error)]
pub enum AuthorityError {
    /// The authority explicitly declined the request.
    #[error("rejected by licensing authority (HTTP {status}), error code: {error_code:?}")]
    Rejected {
        /// HTTP status of the rejection.
        status: u16,
        /// Machine-readable reason, when the authority supplied one.
        error_code: Option<String>,
    },

    /// The authority could not be reached (connect failure, timeout).
    #[error("licensing authority unreachable: {0}")]
    Unreachable(String),

    /// Any other failure while sending the request or reading the response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The authority answered with a status outside the success and rejection ranges.
    #[error("unexpected response from licensing authority (HTTP {status}): {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// The response could not be understood.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AuthorityError {
    /// Returns true for the HTTP status range treated as a definitive "no".
    #[must_use]
    pub fn is_rejection_status(status: u16) -> bool {
        (400..=409).contains(&status)
    }

    /// Returns true if the authority was reached and declined the request.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// Returns true if the request never got an answer.
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}

/// Offline token verification failures.
///
/// The manager never surfaces these directly; any of them collapses into an
/// `offline-validation-failed` result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// Token is not a well-formed compact token.
    #[error("malformed lease token: {0}")]
    Malformed(String),

    /// Token header names an algorithm other than EdDSA.
    #[error("unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Ed25519 signature verification failed.
    #[error("lease token signature invalid")]
    InvalidSignature,

    /// Token `exp` is in the past.
    #[error("lease token expired at {0}")]
    Expired(i64),

    /// No lease token to verify.
    #[error("no lease token held")]
    MissingToken,
}

/// Lease manager errors.
#[derive(Debug, Error)]
pub enum LeaseError {
    /// A fault from the licensing authority (never a rejection).
    #[error(transparent)]
    Authority(#[from] AuthorityError),

    /// Offline validation requested but no signing key was configured.
    #[error("offline validation unavailable: no signing key configured")]
    OfflineUnavailable,

    /// The configured public key could not be decoded.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Lease persistence error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
