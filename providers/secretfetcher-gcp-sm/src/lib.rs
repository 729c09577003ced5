//! Google Secret Manager backend for secretfetcher.
//!
//! Secret versions are read through the REST API with a bearer token taken
//! from the environment or, failing that, from the instance metadata server.
//! [`ApplicationDefaultCredentials`] discovers the project used for short
//! secret names.

mod adc;
mod auth;
mod metadata;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::{Client, StatusCode, Url};
use secretfetcher_core::{
    BackendError, CanonicalReference, EnvironmentView, SecretBackend, SecretPayload,
};
use serde::Deserialize;
use tracing::debug;
use zeroize::Zeroizing;

pub use adc::{ApplicationDefaultCredentials, CLOUDSDK_CONFIG_ENV, CREDENTIALS_ENV};
pub use auth::{ACCESS_TOKEN_ENV, OAUTH_ACCESS_TOKEN_ENV};

const SECRET_MANAGER_ENDPOINT: &str = "https://secretmanager.googleapis.com/v1";
const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const MAX_ERROR_DETAIL: usize = 512;
const ACCESS_SUFFIX: &str = ":access";

pub const ENDPOINT_ENV: &str = "SECRETFETCHER_SM_ENDPOINT";
pub const HTTP_TIMEOUT_ENV: &str = "SECRETFETCHER_HTTP_TIMEOUT_SECS";
pub const METADATA_HOST_ENV: &str = "GCE_METADATA_HOST";

/// Connection settings for Secret Manager.
#[derive(Clone)]
pub struct GcpProviderConfig {
    secret_endpoint: String,
    timeout: Duration,
    metadata_host: String,
    access_token: Option<Zeroizing<String>>,
}

impl GcpProviderConfig {
    pub fn from_env(env: &dyn EnvironmentView) -> Self {
        let secret_endpoint = env
            .non_empty(ENDPOINT_ENV)
            .unwrap_or_else(|| SECRET_MANAGER_ENDPOINT.to_string());

        let timeout = env
            .var(HTTP_TIMEOUT_ENV)
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        Self {
            secret_endpoint: secret_endpoint.trim_end_matches('/').to_string(),
            timeout,
            metadata_host: metadata_host(env),
            access_token: auth::token_from_env(env),
        }
    }

    pub fn secret_endpoint(&self) -> &str {
        &self.secret_endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

pub(crate) fn metadata_host(env: &dyn EnvironmentView) -> String {
    env.non_empty(METADATA_HOST_ENV)
        .unwrap_or_else(|| DEFAULT_METADATA_HOST.to_string())
}

/// [`SecretBackend`] over the Secret Manager REST API.
#[derive(Clone)]
pub struct GcpSecretManager {
    config: Arc<GcpProviderConfig>,
}

impl GcpSecretManager {
    pub fn new(config: GcpProviderConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn from_env(env: &dyn EnvironmentView) -> Self {
        Self::new(GcpProviderConfig::from_env(env))
    }

    // One client per call; it is dropped with the call on every path.
    fn session(&self) -> Result<Client, BackendError> {
        Client::builder()
            .timeout(self.config.timeout)
            .build()
            .map_err(|err| BackendError::Unavailable(format!("failed to build http client: {err}")))
    }

    /// `{endpoint}/{reference}:access`, each reference segment percent-encoded
    /// so reserved characters in a secret name cannot change the target.
    fn access_url(&self, reference: &CanonicalReference) -> Result<Url, BackendError> {
        let invalid = |reason: &str| {
            BackendError::Protocol(format!(
                "invalid secret manager endpoint '{}': {reason}",
                self.config.secret_endpoint
            ))
        };
        let mut url = Url::parse(&self.config.secret_endpoint)
            .map_err(|err| invalid(&err.to_string()))?;

        let mut segments: Vec<String> =
            reference.as_str().split('/').map(str::to_string).collect();
        if let Some(last) = segments.last_mut() {
            last.push_str(ACCESS_SUFFIX);
        }
        url.path_segments_mut()
            .map_err(|()| invalid("endpoint cannot carry a path"))?
            .pop_if_empty()
            .extend(&segments);
        Ok(url)
    }
}

#[async_trait]
impl SecretBackend for GcpSecretManager {
    async fn access_latest_version(
        &self,
        reference: &CanonicalReference,
    ) -> Result<Option<SecretPayload>, BackendError> {
        let url = self.access_url(reference)?;
        let client = self.session()?;
        let token = auth::access_token(&self.config, &client).await?;

        debug!(%reference, "requesting secret version");
        let response = client
            .get(url)
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(|err| BackendError::Unavailable(format!("http request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify(status, &body));
        }

        let body = Zeroizing::new(response.bytes().await.map_err(|err| {
            BackendError::Unavailable(format!("failed to read access response: {err}"))
        })?.to_vec());
        // The body holds the payload, so decode errors never echo it.
        let parsed: AccessSecretVersionResponse = serde_json::from_slice(&body).map_err(|err| {
            BackendError::Protocol(format!("failed to decode access response: {err}"))
        })?;

        let Some(payload) = parsed.payload else {
            return Ok(None);
        };
        let data = Zeroizing::new(payload.data.unwrap_or_default());
        let decoded = STANDARD
            .decode(data.as_bytes())
            .map_err(|err| BackendError::Protocol(format!("base64 decode failed: {err}")))?;
        Ok(Some(SecretPayload::new(decoded)))
    }
}

/// Map a non-success response to a typed backend error.
fn classify(status: StatusCode, body: &str) -> BackendError {
    let detail = format!("{status} {}", error_detail(body));
    match status {
        StatusCode::UNAUTHORIZED => BackendError::Unauthenticated(detail),
        StatusCode::FORBIDDEN => BackendError::AccessDenied(detail),
        StatusCode::NOT_FOUND => BackendError::NotFound(detail),
        StatusCode::TOO_MANY_REQUESTS => BackendError::Unavailable(detail),
        status if status.is_server_error() => BackendError::Unavailable(detail),
        _ => BackendError::Protocol(detail),
    }
}

/// Prefer the `error.message` of a Google API error body.
fn error_detail(body: &str) -> String {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|parsed| parsed.error)
        .and_then(|error| error.message)
        .unwrap_or_else(|| body.trim().to_string());
    message.chars().take(MAX_ERROR_DETAIL).collect()
}

#[derive(Deserialize)]
struct AccessSecretVersionResponse {
    payload: Option<SecretPayloadBody>,
}

#[derive(Deserialize)]
struct SecretPayloadBody {
    #[serde(default)]
    data: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}
