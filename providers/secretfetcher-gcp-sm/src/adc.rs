use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secretfetcher_core::{AmbientCredentials, CredentialsError, EnvironmentView};
use serde::Deserialize;
use tracing::debug;
use zeroize::Zeroizing;

use crate::metadata::{MetadataClient, MetadataError};

pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const CLOUDSDK_CONFIG_ENV: &str = "CLOUDSDK_CONFIG";
const WELL_KNOWN_FILE: &str = "application_default_credentials.json";
const METADATA_TIMEOUT: Duration = Duration::from_secs(3);

/// The application-default-credential chain, used only to find a project.
///
/// Lookup order: the file named by `GOOGLE_APPLICATION_CREDENTIALS`, the
/// gcloud well-known file, then the metadata server.
#[derive(Debug, Clone)]
pub struct ApplicationDefaultCredentials {
    explicit_file: Option<PathBuf>,
    well_known_file: Option<PathBuf>,
    metadata_host: String,
    metadata_timeout: Duration,
}

impl ApplicationDefaultCredentials {
    pub fn from_env(env: &dyn EnvironmentView) -> Self {
        let well_known_dir = env
            .non_empty(CLOUDSDK_CONFIG_ENV)
            .map(PathBuf::from)
            .or_else(default_gcloud_dir);

        Self {
            explicit_file: env.non_empty(CREDENTIALS_ENV).map(PathBuf::from),
            well_known_file: well_known_dir.map(|dir| dir.join(WELL_KNOWN_FILE)),
            metadata_host: crate::metadata_host(env),
            metadata_timeout: METADATA_TIMEOUT,
        }
    }

    pub fn with_metadata_timeout(mut self, timeout: Duration) -> Self {
        self.metadata_timeout = timeout;
        self
    }

    async fn project_from_metadata(&self) -> Result<Option<String>, CredentialsError> {
        let client = Client::builder()
            .timeout(self.metadata_timeout)
            .build()
            .map_err(|err| CredentialsError::Metadata(err.to_string()))?;

        MetadataClient::new(&self.metadata_host, client)
            .project_id()
            .await
            .map_err(|err| match err {
                MetadataError::Unreachable { .. } | MetadataError::NotMetadata { .. } => {
                    CredentialsError::NotFound(format!(
                        "{CREDENTIALS_ENV} is not set, no gcloud application default credentials file, and {err}"
                    ))
                }
                other => CredentialsError::Metadata(other.to_string()),
            })
    }
}

#[async_trait]
impl AmbientCredentials for ApplicationDefaultCredentials {
    async fn project_id(&self) -> Result<Option<String>, CredentialsError> {
        if let Some(path) = &self.explicit_file {
            debug!(path = %path.display(), "reading credentials from {CREDENTIALS_ENV}");
            return project_from_file(path);
        }

        if let Some(path) = self.well_known_file.as_deref().filter(|path| path.is_file()) {
            debug!(path = %path.display(), "reading gcloud default credentials");
            return project_from_file(path);
        }

        debug!(host = %self.metadata_host, "asking metadata server for project");
        self.project_from_metadata().await
    }
}

#[cfg(windows)]
fn default_gcloud_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("gcloud"))
}

#[cfg(not(windows))]
fn default_gcloud_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|dir| dir.join(".config").join("gcloud"))
}

fn project_from_file(path: &Path) -> Result<Option<String>, CredentialsError> {
    let invalid = |reason: String| CredentialsError::InvalidFile {
        path: path.display().to_string(),
        reason,
    };
    // Credential files carry private keys or refresh tokens.
    let raw = Zeroizing::new(fs::read_to_string(path).map_err(|err| invalid(err.to_string()))?);
    let parsed: CredentialsFile =
        serde_json::from_str(&raw).map_err(|err| invalid(err.to_string()))?;
    Ok(parsed.project())
}

#[derive(Deserialize)]
struct CredentialsFile {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    quota_project_id: Option<String>,
}

impl CredentialsFile {
    fn project(self) -> Option<String> {
        let quota = match self.kind.as_deref() {
            Some("authorized_user") => self.quota_project_id,
            _ => None,
        };
        self.project_id
            .or(quota)
            .filter(|project| !project.trim().is_empty())
    }
}
