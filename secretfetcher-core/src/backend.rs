use std::fmt;

use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::errors::BackendError;
use crate::resolver::CanonicalReference;

/// Raw secret bytes. Wiped on drop and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretPayload(Zeroizing<Vec<u8>>);

impl SecretPayload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for SecretPayload {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for SecretPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretPayload(<{} bytes redacted>)", self.len())
    }
}

/// The single operation the fetcher needs from a secret-management service.
#[async_trait]
pub trait SecretBackend: Send + Sync {
    /// Access the version named by `reference`.
    ///
    /// `Ok(None)` means the call succeeded but the response carried no
    /// payload object. Implementations acquire and release their own
    /// connection within the call.
    async fn access_latest_version(
        &self,
        reference: &CanonicalReference,
    ) -> Result<Option<SecretPayload>, BackendError>;
}
