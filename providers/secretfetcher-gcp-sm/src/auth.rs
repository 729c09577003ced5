use reqwest::Client;
use secretfetcher_core::{BackendError, EnvironmentView};
use zeroize::Zeroizing;

use crate::GcpProviderConfig;
use crate::metadata::MetadataClient;

pub const ACCESS_TOKEN_ENV: &str = "SECRETFETCHER_ACCESS_TOKEN";
pub const OAUTH_ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

pub(crate) fn token_from_env(env: &dyn EnvironmentView) -> Option<Zeroizing<String>> {
    env.non_empty(ACCESS_TOKEN_ENV)
        .or_else(|| env.non_empty(OAUTH_ACCESS_TOKEN_ENV))
        .map(|token| Zeroizing::new(token.trim().to_string()))
}

/// Bearer token for one request: the configured token, else the metadata
/// server's default service account.
pub(crate) async fn access_token(
    config: &GcpProviderConfig,
    client: &Client,
) -> Result<Zeroizing<String>, BackendError> {
    if let Some(token) = &config.access_token {
        return Ok(token.clone());
    }
    MetadataClient::new(&config.metadata_host, client.clone())
        .access_token()
        .await
        .map_err(|err| {
            BackendError::Unauthenticated(format!(
                "{err}. Set {ACCESS_TOKEN_ENV} or {OAUTH_ACCESS_TOKEN_ENV}, or run with an attached service account"
            ))
        })
}
