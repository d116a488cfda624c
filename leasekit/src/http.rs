//! HTTP licensing authority.
//!
//! Every operation is a JSON `POST` to `{endpoint}/<path>`. Responses in the
//! 2xx range are decoded as the operation's result, 400-409 are rejections and
//! everything else is a fault.

use crate::authority::LicenseAuthority;
use crate::config::LeaseConfig;
use crate::error::{AuthorityError, AuthorityResult};
use crate::protocol::{
    ErrorBody, KeyValidation, LeaseGrant, LeaseValidation, ObtainLeaseRequest,
    ReleaseLeaseRequest, ReleaseOutcome, RenewLeaseRequest, ValidateKeyRequest,
    ValidateLeaseRequest,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

const KEY_VALIDATE_PATH: &str = "key/validate";
const LEASE_OBTAIN_PATH: &str = "lease/obtain";
const LEASE_VALIDATE_PATH: &str = "lease/validate";
const LEASE_RENEW_PATH: &str = "lease/renew";
const LEASE_RELEASE_PATH: &str = "lease/release";

/// Licensing authority reached over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpAuthority {
    client: Client,
    endpoint: String,
    api_token: Option<String>,
}

impl HttpAuthority {
    /// Creates an authority client for the given base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> AuthorityResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthorityError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_token: None,
        })
    }

    /// Creates an authority client from a lease configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn from_config(config: &LeaseConfig) -> AuthorityResult<Self> {
        let mut authority = Self::new(
            config.endpoint.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )?;
        authority.api_token = config.api_token.clone();
        Ok(authority)
    }

    /// Sets the bearer token sent with every request.
    #[must_use]
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Returns the base URL requests are sent to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> AuthorityResult<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.endpoint, path);
        debug!(%url, "licensing authority request");

        let mut request = self.client.post(&url).json(body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(classify_send_error)?;
        let status = response.status().as_u16();

        if response.status().is_success() {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| AuthorityError::Transport(format!("failed to read response: {e}")))?;
            return serde_json::from_slice(&bytes).map_err(|e| {
                AuthorityError::MalformedResponse(format!("{path}: {e}"))
            });
        }

        let body = response.text().await.unwrap_or_default();

        if AuthorityError::is_rejection_status(status) {
            let error_code = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error_code);
            debug!(status, ?error_code, "licensing authority rejected {}", path);
            return Err(AuthorityError::Rejected { status, error_code });
        }

        warn!(status, "unexpected licensing authority response for {}", path);
        Err(AuthorityError::UnexpectedStatus { status, body })
    }
}

fn classify_send_error(e: reqwest::Error) -> AuthorityError {
    if e.is_connect() || e.is_timeout() {
        AuthorityError::Unreachable(e.to_string())
    } else {
        AuthorityError::Transport(e.to_string())
    }
}

#[async_trait]
impl LicenseAuthority for HttpAuthority {
    async fn validate_key(&self, request: &ValidateKeyRequest) -> AuthorityResult<KeyValidation> {
        self.post(KEY_VALIDATE_PATH, request).await
    }

    async fn obtain_lease(&self, request: &ObtainLeaseRequest) -> AuthorityResult<LeaseGrant> {
        self.post(LEASE_OBTAIN_PATH, request).await
    }

    async fn validate_lease(
        &self,
        request: &ValidateLeaseRequest,
    ) -> AuthorityResult<LeaseValidation> {
        self.post(LEASE_VALIDATE_PATH, request).await
    }

    async fn renew_lease(&self, request: &RenewLeaseRequest) -> AuthorityResult<LeaseGrant> {
        self.post(LEASE_RENEW_PATH, request).await
    }

    async fn release_lease(
        &self,
        request: &ReleaseLeaseRequest,
    ) -> AuthorityResult<ReleaseOutcome> {
        self.post(LEASE_RELEASE_PATH, request).await
    }
}
