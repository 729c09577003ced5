//! Resolve a secret identifier to its latest Secret Manager version and stream
//! the payload to an output channel, retrying transient backend failures.

pub mod backend;
pub mod config;
pub mod credentials;
pub mod env;
pub mod errors;
pub mod fetcher;
pub mod resolver;
pub mod retry;

pub use backend::{SecretBackend, SecretPayload};
pub use config::FetcherConfig;
pub use credentials::AmbientCredentials;
pub use env::{EnvironmentView, MapEnv, ProcessEnv};
pub use errors::{
    BackendError, CredentialsError, ExitCode, Failure, FetchError, ResolveError,
};
pub use fetcher::{Fetcher, fetch, write_payload};
pub use resolver::{CanonicalReference, resolve};
pub use retry::RetryPolicy;
