use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::ModelRef;
use crate::errors::{RestoreError, Result};
use crate::traits::{Fetched, ImageFetcher, InferenceClient};

/// One recorded call to [`MockInferenceClient::run`].
#[derive(Debug, Clone)]
pub struct InferenceCall {
    pub model: ModelRef,
    pub input_key: String,
    pub payload: PathBuf,
    /// Payload contents at call time, `None` if it could not be read.
    pub payload_bytes: Option<Vec<u8>>,
}

/// Test double for a hosted model.
///
/// Answers with `https://mock.invalid/<model name>/<payload file name>` and
/// fails for payloads whose path contains a registered pattern.
#[derive(Debug, Default)]
pub struct MockInferenceClient {
    failing: Vec<String>,
    calls: Mutex<Vec<InferenceCall>>,
}

impl MockInferenceClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(mut self, pattern: &str) -> Self {
        self.failing.push(pattern.to_string());
        self
    }

    pub fn calls(&self) -> Vec<InferenceCall> {
        self.calls.lock().clone()
    }

    pub fn url_for(model: &ModelRef, payload: &Path) -> String {
        let name = payload
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("https://mock.invalid/{}/{}", model.name, name)
    }
}

impl InferenceClient for MockInferenceClient {
    fn run(&self, model: &ModelRef, input_key: &str, payload: &Path) -> Result<String> {
        self.calls.lock().push(InferenceCall {
            model: model.clone(),
            input_key: input_key.to_string(),
            payload: payload.to_path_buf(),
            payload_bytes: fs::read(payload).ok(),
        });

        let path = payload.to_string_lossy();
        if self.failing.iter().any(|p| path.contains(p.as_str())) {
            return Err(RestoreError::Api {
                status: 422,
                message: format!("mock rejected {}", path),
            });
        }

        Ok(Self::url_for(model, payload))
    }
}

/// Test double for the output download.
///
/// Returns status 200 with the URL's own bytes as the body, unless a response was
/// registered for a URL containing a given pattern.
#[derive(Debug, Default)]
pub struct MockFetcher {
    overrides: Vec<(String, Fetched)>,
    unreachable: Vec<String>,
    requests: Mutex<HashMap<String, usize>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, pattern: &str, status: u16, bytes: &[u8]) -> Self {
        self.overrides.push((
            pattern.to_string(),
            Fetched {
                status,
                bytes: bytes.to_vec(),
            },
        ));
        self
    }

    /// Makes URLs containing `pattern` fail with an error instead of a response.
    pub fn unreachable(mut self, pattern: &str) -> Self {
        self.unreachable.push(pattern.to_string());
        self
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests.lock().get(url).copied().unwrap_or(0)
    }

    pub fn total_requests(&self) -> usize {
        self.requests.lock().values().sum()
    }
}

impl ImageFetcher for MockFetcher {
    fn fetch(&self, url: &str) -> Result<Fetched> {
        *self.requests.lock().entry(url.to_string()).or_default() += 1;

        if self.unreachable.iter().any(|p| url.contains(p.as_str())) {
            return Err(RestoreError::InvalidResponse {
                operation: "download".to_string(),
                reason: format!("mock connection to {} refused", url),
            });
        }

        let fetched = self
            .overrides
            .iter()
            .find(|(pattern, _)| url.contains(pattern.as_str()))
            .map(|(_, fetched)| fetched.clone())
            .unwrap_or_else(|| Fetched {
                status: 200,
                bytes: url.as_bytes().to_vec(),
            });
        Ok(fetched)
    }
}
