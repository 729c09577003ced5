use std::io;

use thiserror::Error;

use crate::resolver::CanonicalReference;

/// Process exit status of a fetch run. The numeric values are part of the
/// command-line contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Success = 0,
    InputMissing = 1,
    ResolutionFailed = 2,
    AccessFailed = 3,
    StreamFailed = 4,
}

impl ExitCode {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(value: ExitCode) -> Self {
        std::process::ExitCode::from(value.code())
    }
}

/// Failure while looking up ambient default credentials.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialsError {
    #[error("could not find default credentials: {0}")]
    NotFound(String),
    #[error("failed to load credentials file {path}: {reason}")]
    InvalidFile { path: String, reason: String },
    #[error("metadata server error: {0}")]
    Metadata(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("secret identifier cannot be empty")]
    EmptyIdentifier,
    #[error(
        "invalid secret path format for '{identifier}'. Expected 'projects/PROJECT_ID/secrets/SECRET_ID'"
    )]
    MalformedPath { identifier: String },
    #[error(
        "could not determine Project ID for secret '{identifier}': {source}. To resolve, set GOOGLE_CLOUD_PROJECT, ensure ADC has a project, or use full path"
    )]
    CredentialsUnavailable {
        identifier: String,
        source: CredentialsError,
    },
    #[error(
        "could not determine Project ID for secret '{identifier}': GOOGLE_CLOUD_PROJECT is not set and application default credentials carry no project. To resolve, set GOOGLE_CLOUD_PROJECT, ensure ADC has a project, or use full path"
    )]
    ProjectUndetermined { identifier: String },
    #[error(
        "secret identifier '{identifier}' does not form a valid secret path ('{reference}'). Expected 'projects/PROJECT_ID/secrets/SECRET_ID'"
    )]
    InvalidName {
        identifier: String,
        reference: String,
    },
}

/// Error reported by a [`crate::SecretBackend`]. Messages carry status and
/// service diagnostics, never payload bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("permission denied: {0}")]
    AccessDenied(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("unexpected response: {0}")]
    Protocol(String),
}

/// Failure of a single fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("error accessing secret version '{reference}': {source}")]
    Access {
        reference: CanonicalReference,
        source: BackendError,
    },
    #[error("secret payload is unexpectedly empty for '{reference}'")]
    EmptyPayload { reference: CanonicalReference },
}

impl FetchError {
    pub fn reference(&self) -> &CanonicalReference {
        match self {
            FetchError::Access { reference, .. } | FetchError::EmptyPayload { reference } => {
                reference
            }
        }
    }
}

/// Terminal outcome of a failed run. Each variant maps to one exit code.
#[derive(Debug, Error)]
pub enum Failure {
    #[error(
        "the --secret-identifier flag or SECRET_NAME environment variable must be provided and non-empty"
    )]
    MissingIdentifier,
    #[error(transparent)]
    Resolution(#[from] ResolveError),
    #[error("giving up after {attempts} attempt(s): {last}")]
    Access {
        attempts: u32,
        #[source]
        last: FetchError,
    },
    #[error("error writing secret payload to stdout: {0}")]
    Stream(#[source] io::Error),
}

impl Failure {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Failure::MissingIdentifier | Failure::Resolution(ResolveError::EmptyIdentifier) => {
                ExitCode::InputMissing
            }
            Failure::Resolution(_) => ExitCode::ResolutionFailed,
            Failure::Access { .. } => ExitCode::AccessFailed,
            Failure::Stream(_) => ExitCode::StreamFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_stable() {
        assert_eq!(ExitCode::Success.code(), 0);
        assert_eq!(Failure::MissingIdentifier.exit_code().code(), 1);
        assert_eq!(
            Failure::Resolution(ResolveError::EmptyIdentifier)
                .exit_code()
                .code(),
            1
        );
        assert_eq!(
            Failure::Resolution(ResolveError::MalformedPath {
                identifier: "projects/x".into()
            })
            .exit_code()
            .code(),
            2
        );
        assert_eq!(
            Failure::Stream(io::Error::from(io::ErrorKind::BrokenPipe))
                .exit_code()
                .code(),
            4
        );
    }

    #[test]
    fn credentials_error_is_carried_in_message() {
        let err = ResolveError::CredentialsUnavailable {
            identifier: "db-password".into(),
            source: CredentialsError::NotFound("no metadata server".into()),
        };
        let text = err.to_string();
        assert!(text.contains("db-password"));
        assert!(text.contains("no metadata server"));
        assert!(text.contains("GOOGLE_CLOUD_PROJECT"));
    }
}
