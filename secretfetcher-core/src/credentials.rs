use async_trait::async_trait;

use crate::errors::CredentialsError;

/// Ambient default credentials discoverable from the execution environment.
#[async_trait]
pub trait AmbientCredentials: Send + Sync {
    /// Project associated with the default credentials.
    ///
    /// `Ok(None)` means credentials were found but carry no project; an error
    /// means the lookup itself failed.
    async fn project_id(&self) -> Result<Option<String>, CredentialsError>;
}
