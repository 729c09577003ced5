use std::collections::BTreeMap;

/// Project scope used for short secret names.
pub const PROJECT_ENV: &str = "GOOGLE_CLOUD_PROJECT";
/// Fallback source for the secret identifier when no flag is given.
pub const SECRET_NAME_ENV: &str = "SECRET_NAME";

/// Read-only view over environment configuration.
///
/// Production code reads the process environment through [`ProcessEnv`];
/// tests hand in a [`MapEnv`] so nothing depends on global state.
pub trait EnvironmentView: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;

    /// Returns the value only when it is set and not blank.
    fn non_empty(&self, key: &str) -> Option<String> {
        self.var(key).filter(|value| !value.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvironmentView for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// In-memory environment.
#[derive(Debug, Clone, Default)]
pub struct MapEnv {
    vars: BTreeMap<String, String>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

impl EnvironmentView for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}
