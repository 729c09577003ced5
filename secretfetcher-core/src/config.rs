use std::time::Duration;

use tracing::warn;

use crate::env::EnvironmentView;
use crate::retry::{DEFAULT_BACKOFF_BASE, DEFAULT_MAX_ATTEMPTS, RetryPolicy};

pub const MAX_ATTEMPTS_ENV: &str = "SECRETFETCHER_MAX_ATTEMPTS";
pub const BACKOFF_BASE_MS_ENV: &str = "SECRETFETCHER_BACKOFF_BASE_MS";

/// Retry settings for a fetch run.
///
/// Layering is defaults, then environment, then explicit overrides (flags).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetcherConfig {
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }
}

impl FetcherConfig {
    /// Read overrides from the environment. Unparseable or out-of-range values
    /// are ignored with a warning.
    pub fn from_env(env: &dyn EnvironmentView) -> Self {
        let mut config = Self::default();

        if let Some(raw) = env.non_empty(MAX_ATTEMPTS_ENV) {
            match raw.trim().parse::<u32>() {
                Ok(value) if value > 0 => config.max_attempts = value,
                _ => warn!(
                    var = MAX_ATTEMPTS_ENV,
                    value = %raw,
                    "ignoring invalid attempt bound"
                ),
            }
        }

        if let Some(raw) = env.non_empty(BACKOFF_BASE_MS_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.backoff_base = Duration::from_millis(ms),
                Err(_) => warn!(
                    var = BACKOFF_BASE_MS_ENV,
                    value = %raw,
                    "ignoring invalid backoff base"
                ),
            }
        }

        config
    }

    pub fn with_overrides(mut self, max_attempts: Option<u32>, backoff_base_ms: Option<u64>) -> Self {
        if let Some(value) = max_attempts {
            self.max_attempts = value;
        }
        if let Some(ms) = backoff_base_ms {
            self.backoff_base = Duration::from_millis(ms);
        }
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.backoff_base)
    }
}
