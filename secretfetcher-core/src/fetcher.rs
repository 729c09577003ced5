use std::io::{self, Write};

use tracing::debug;

use crate::backend::{SecretBackend, SecretPayload};
use crate::config::FetcherConfig;
use crate::credentials::AmbientCredentials;
use crate::env::EnvironmentView;
use crate::errors::{Failure, FetchError};
use crate::resolver::{CanonicalReference, resolve};
use crate::retry::RetryPolicy;

/// One access attempt against the backend.
pub async fn fetch(
    reference: &CanonicalReference,
    backend: &dyn SecretBackend,
) -> Result<SecretPayload, FetchError> {
    match backend.access_latest_version(reference).await {
        Ok(Some(payload)) => Ok(payload),
        Ok(None) => Err(FetchError::EmptyPayload {
            reference: reference.clone(),
        }),
        Err(source) => Err(FetchError::Access {
            reference: reference.clone(),
            source,
        }),
    }
}

/// Write the payload in one piece and flush it.
pub fn write_payload<W: Write + ?Sized>(out: &mut W, payload: &SecretPayload) -> io::Result<()> {
    out.write_all(payload.as_bytes())?;
    out.flush()
}

/// Resolve, fetch with retries, and stream the payload.
#[derive(Debug, Clone, Default)]
pub struct Fetcher {
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn from_config(config: &FetcherConfig) -> Self {
        Self::new(config.retry_policy())
    }

    /// Run the whole protocol for one identifier.
    ///
    /// Input and resolution problems fail immediately. Backend failures are
    /// retried on the configured schedule. `out` is written at most once, and
    /// only with a complete payload.
    pub async fn fetch_with_retry<W: Write + ?Sized>(
        &self,
        identifier: Option<&str>,
        env: &dyn EnvironmentView,
        credentials: &dyn AmbientCredentials,
        backend: &dyn SecretBackend,
        out: &mut W,
    ) -> Result<(), Failure> {
        let identifier = identifier.ok_or(Failure::MissingIdentifier)?;
        let reference = resolve(identifier, env, credentials).await?;
        debug!(
            %reference,
            max_attempts = self.policy.max_attempts(),
            "resolved secret reference"
        );

        let payload = self
            .policy
            .run(|attempt| {
                let reference = &reference;
                async move {
                    debug!(attempt, %reference, "accessing secret version");
                    fetch(reference, backend).await
                }
            })
            .await
            .map_err(|exhausted| Failure::Access {
                attempts: exhausted.attempts,
                last: exhausted.last,
            })?;

        debug!(%reference, bytes = payload.len(), "writing payload");
        write_payload(out, &payload).map_err(Failure::Stream)
    }
}
