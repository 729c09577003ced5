use std::fmt;

use tracing::debug;

use crate::credentials::AmbientCredentials;
use crate::env::{EnvironmentView, PROJECT_ENV};
use crate::errors::ResolveError;

const ROOT_PREFIX: &str = "projects/";
const SECRETS_SEGMENT: &str = "secrets";
const VERSIONS_MARKER: &str = "/versions/";
const LATEST_SUFFIX: &str = "/versions/latest";
const MIN_SEPARATORS: usize = 3;

/// Fully-qualified secret version name pinned to the `latest` alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalReference(String);

impl CanonicalReference {
    fn latest(base: &str) -> Self {
        Self(format!("{base}{LATEST_SUFFIX}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `projects/<project>/secrets/<name>` without the version suffix.
    pub fn secret_path(&self) -> &str {
        self.0.strip_suffix(LATEST_SUFFIX).unwrap_or(&self.0)
    }
}

impl fmt::Display for CanonicalReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalReference {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Turn a short name or resource path into the `latest` version reference.
///
/// Short names take their project from `GOOGLE_CLOUD_PROJECT`; only when that
/// is unset or blank are the ambient credentials consulted, and then once.
pub async fn resolve(
    identifier: &str,
    env: &dyn EnvironmentView,
    credentials: &dyn AmbientCredentials,
) -> Result<CanonicalReference, ResolveError> {
    if identifier.is_empty() {
        return Err(ResolveError::EmptyIdentifier);
    }

    if identifier.contains('/') {
        return resolve_path(identifier);
    }

    let project = match env.non_empty(PROJECT_ENV) {
        Some(project) => {
            debug!(source = PROJECT_ENV, "project scope from environment");
            project
        }
        None => {
            let discovered = credentials.project_id().await.map_err(|source| {
                ResolveError::CredentialsUnavailable {
                    identifier: identifier.to_string(),
                    source,
                }
            })?;
            match discovered.filter(|project| !project.trim().is_empty()) {
                Some(project) => {
                    debug!(source = "adc", "project scope from default credentials");
                    project
                }
                None => {
                    return Err(ResolveError::ProjectUndetermined {
                        identifier: identifier.to_string(),
                    });
                }
            }
        }
    };

    let base = format!("{ROOT_PREFIX}{project}/{SECRETS_SEGMENT}/{identifier}");
    if !is_secret_path(&base) {
        return Err(ResolveError::InvalidName {
            identifier: identifier.to_string(),
            reference: base,
        });
    }
    Ok(CanonicalReference::latest(&base))
}

/// Resolve a path-form identifier. Any explicit version is dropped.
pub fn resolve_path(identifier: &str) -> Result<CanonicalReference, ResolveError> {
    let base = identifier
        .split_once(VERSIONS_MARKER)
        .map_or(identifier, |(base, _)| base);

    if !is_secret_path(base) {
        return Err(ResolveError::MalformedPath {
            identifier: identifier.to_string(),
        });
    }

    Ok(CanonicalReference::latest(base))
}

// Dot segments would be collapsed by URL normalization and address a
// different resource.
fn is_secret_path(base: &str) -> bool {
    if !base.starts_with(ROOT_PREFIX) || base.matches('/').count() < MIN_SEPARATORS {
        return false;
    }
    let segments: Vec<&str> = base.split('/').collect();
    !segments[1].is_empty()
        && segments[2] == SECRETS_SEGMENT
        && !segments[3].is_empty()
        && !segments.iter().any(|segment| matches!(*segment, "." | ".."))
}
