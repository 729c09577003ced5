use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use zeroize::Zeroizing;

const FLAVOR_HEADER: &str = "Metadata-Flavor";
const FLAVOR_VALUE: &str = "Google";
const PROJECT_ID_PATH: &str = "project/project-id";
const TOKEN_PATH: &str = "instance/service-accounts/default/token";

#[derive(Debug, Error)]
pub(crate) enum MetadataError {
    #[error("metadata server at {host} is unreachable: {reason}")]
    Unreachable { host: String, reason: String },
    #[error("{host} did not answer as a metadata server")]
    NotMetadata { host: String },
    #[error("metadata request for {path} returned {status}")]
    Status { path: &'static str, status: StatusCode },
    #[error("failed to decode metadata response: {0}")]
    Decode(String),
}

/// Client for the instance metadata server.
pub(crate) struct MetadataClient {
    host: String,
    client: Client,
}

impl MetadataClient {
    pub(crate) fn new(host: &str, client: Client) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            client,
        }
    }

    async fn get(&self, path: &'static str) -> Result<Response, MetadataError> {
        // The metadata server only speaks plain HTTP on the instance network.
        let url = format!("http://{}/computeMetadata/v1/{path}", self.host);
        let response = self
            .client
            .get(url)
            .header(FLAVOR_HEADER, FLAVOR_VALUE)
            .send()
            .await
            .map_err(|err| MetadataError::Unreachable {
                host: self.host.clone(),
                reason: err.to_string(),
            })?;

        let flavor = response
            .headers()
            .get(FLAVOR_HEADER)
            .and_then(|value| value.to_str().ok());
        if flavor != Some(FLAVOR_VALUE) {
            return Err(MetadataError::NotMetadata {
                host: self.host.clone(),
            });
        }

        let status = response.status();
        if !status.is_success() {
            return Err(MetadataError::Status { path, status });
        }
        Ok(response)
    }

    /// Project the instance runs in; `None` when the server reports none.
    pub(crate) async fn project_id(&self) -> Result<Option<String>, MetadataError> {
        let body = self
            .get(PROJECT_ID_PATH)
            .await?
            .text()
            .await
            .map_err(|err| MetadataError::Decode(err.to_string()))?;
        let project = body.trim();
        Ok((!project.is_empty()).then(|| project.to_string()))
    }

    /// Access token of the default service account.
    pub(crate) async fn access_token(&self) -> Result<Zeroizing<String>, MetadataError> {
        let token: TokenResponse = self
            .get(TOKEN_PATH)
            .await?
            .json()
            .await
            .map_err(|err| MetadataError::Decode(err.to_string()))?;
        Ok(Zeroizing::new(token.access_token))
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}
