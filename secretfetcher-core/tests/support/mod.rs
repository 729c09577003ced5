#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use secretfetcher_core::{
    AmbientCredentials, BackendError, CanonicalReference, CredentialsError, SecretBackend,
    SecretPayload,
};

/// Ambient credentials returning a fixed answer and counting lookups.
pub struct StubCredentials {
    answer: Result<Option<String>, CredentialsError>,
    calls: AtomicUsize,
}

impl StubCredentials {
    pub fn project(project: &str) -> Self {
        Self::with(Ok(Some(project.to_string())))
    }

    pub fn no_project() -> Self {
        Self::with(Ok(None))
    }

    pub fn failing() -> Self {
        Self::with(Err(CredentialsError::NotFound(
            "no credentials file and no metadata server".into(),
        )))
    }

    fn with(answer: Result<Option<String>, CredentialsError>) -> Self {
        Self {
            answer,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AmbientCredentials for StubCredentials {
    async fn project_id(&self) -> Result<Option<String>, CredentialsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone()
    }
}

/// Backend that fails a fixed number of times before answering.
pub struct ScriptedBackend {
    failures: usize,
    success: Option<Vec<u8>>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn failing_then(failures: usize, payload: &[u8]) -> Self {
        Self {
            failures,
            success: Some(payload.to_vec()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn always_failing() -> Self {
        Self {
            failures: usize::MAX,
            success: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Succeeds but returns no payload object.
    pub fn empty() -> Self {
        Self {
            failures: 0,
            success: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn references(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl SecretBackend for ScriptedBackend {
    async fn access_latest_version(
        &self,
        reference: &CanonicalReference,
    ) -> Result<Option<SecretPayload>, BackendError> {
        let call = {
            let mut seen = self.seen.lock().unwrap();
            seen.push(reference.to_string());
            seen.len()
        };
        if call <= self.failures {
            return Err(BackendError::Unavailable(format!("503 on call {call}")));
        }
        Ok(self.success.clone().map(SecretPayload::from))
    }
}

/// Writer that records every `write` call.
#[derive(Default)]
pub struct RecordingWriter {
    pub writes: Vec<Vec<u8>>,
    pub flushes: usize,
}

impl RecordingWriter {
    pub fn bytes(&self) -> Vec<u8> {
        self.writes.concat()
    }
}

impl Write for RecordingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writes.push(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

/// Writer whose reader went away.
pub struct BrokenPipe;

impl Write for BrokenPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::from(io::ErrorKind::BrokenPipe))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
