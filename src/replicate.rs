//! Blocking client for the hosted inference API.
//!
//! One run is three steps: upload the payload as a file, create a prediction
//! that references it, then poll the prediction until it settles. Output images
//! are downloaded with a plain GET and no credentials.

use std::fs;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{multipart, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::{Config, ModelRef};
use crate::errors::{RestoreError, Result};
use crate::files::file_name_of;
use crate::traits::{Fetched, ImageFetcher, InferenceClient};

#[derive(Debug, Clone, Deserialize)]
pub struct Prediction {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub urls: PredictionUrls,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictionUrls {
    pub get: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadedFile {
    urls: FileUrls,
}

#[derive(Debug, Deserialize)]
struct FileUrls {
    get: String,
}

impl Prediction {
    pub fn is_terminal(&self) -> bool {
        matches!(self.status.as_str(), "succeeded" | "failed" | "canceled")
    }

    /// The output URL: either the output itself or the first element of an output list.
    pub fn output_url(&self) -> Option<&str> {
        match self.output.as_ref()? {
            Value::String(url) => Some(url),
            Value::Array(items) => items.first().and_then(Value::as_str),
            _ => None,
        }
    }

    fn error_message(&self) -> String {
        match &self.error {
            Some(Value::String(message)) => message.clone(),
            Some(Value::Null) | None => "no error detail reported".to_string(),
            Some(other) => other.to_string(),
        }
    }

    /// Turns a settled prediction into its output URL or an error.
    pub fn into_output_url(self) -> Result<String> {
        if self.status != "succeeded" {
            return Err(RestoreError::Prediction {
                message: self.error_message(),
                id: self.id,
                status: self.status,
            });
        }

        self.output_url()
            .map(str::to_string)
            .ok_or_else(|| RestoreError::InvalidResponse {
                operation: format!("prediction {}", self.id),
                reason: "succeeded without an output URL".to_string(),
            })
    }
}

#[derive(Clone)]
pub struct ReplicateClient {
    client: Client,
    api_base: String,
    api_token: Option<String>,
    poll_interval: Duration,
}

impl ReplicateClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("photo-restore/", env!("CARGO_PKG_VERSION")))
            .build()?;

        if config.api_token.is_none() {
            tracing::warn!("no API token configured; set REPLICATE_API_TOKEN or pass --api-token");
        }

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            poll_interval: config.poll_interval(),
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    fn add_auth(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn send(&self, req: RequestBuilder, url: &str) -> Result<Response> {
        self.add_auth(req)
            .send()
            .map_err(|e| RestoreError::Transport {
                url: url.to_string(),
                source: e,
            })
    }

    fn check_response<T: DeserializeOwned>(resp: Response) -> Result<T> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json()?);
        }

        let body = resp.text().unwrap_or_default();
        Err(RestoreError::Api {
            status: status.as_u16(),
            message: api_error_message(&body),
        })
    }

    /// Uploads `payload` and returns the URL that predictions can reference.
    pub fn upload(&self, payload: &Path) -> Result<String> {
        let bytes = fs::read(payload).map_err(|e| RestoreError::fs(payload, "read payload", e))?;
        let file_name = file_name_of(payload)?.to_string_lossy().into_owned();
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime_for(payload))?;
        let form = multipart::Form::new().part("content", part);

        let url = self.api_url("files");
        let resp = self.send(self.client.post(&url).multipart(form), &url)?;
        let uploaded: UploadedFile = Self::check_response(resp)?;
        tracing::debug!(payload = %payload.display(), url = %uploaded.urls.get, "uploaded payload");
        Ok(uploaded.urls.get)
    }

    pub fn create_prediction(
        &self,
        model: &ModelRef,
        input_key: &str,
        input_url: &str,
    ) -> Result<Prediction> {
        let url = self.api_url("predictions");
        let body = json!({
            "version": model.version,
            "input": { input_key: input_url },
        });
        let resp = self.send(
            self.client.post(&url).header("Prefer", "wait").json(&body),
            &url,
        )?;
        let prediction: Prediction = Self::check_response(resp)?;
        tracing::debug!(id = %prediction.id, status = %prediction.status, model = %model, "created prediction");
        Ok(prediction)
    }

    pub fn get_prediction(&self, url: &str) -> Result<Prediction> {
        let resp = self.send(self.client.get(url), url)?;
        Self::check_response(resp)
    }

    /// Polls until the prediction reaches `succeeded`, `failed` or `canceled`.
    pub fn wait(&self, mut prediction: Prediction) -> Result<Prediction> {
        while !prediction.is_terminal() {
            std::thread::sleep(self.poll_interval);
            let url = match &prediction.urls.get {
                Some(url) => url.clone(),
                None => self.api_url(&format!("predictions/{}", prediction.id)),
            };
            prediction = self.get_prediction(&url)?;
            tracing::trace!(id = %prediction.id, status = %prediction.status, "polled prediction");
        }
        Ok(prediction)
    }
}

impl InferenceClient for ReplicateClient {
    fn run(&self, model: &ModelRef, input_key: &str, payload: &Path) -> Result<String> {
        let input_url = self.upload(payload)?;
        let prediction = self.create_prediction(model, input_key, &input_url)?;
        self.wait(prediction)?.into_output_url()
    }
}

impl ImageFetcher for ReplicateClient {
    fn fetch(&self, url: &str) -> Result<Fetched> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| RestoreError::Transport {
                url: url.to_string(),
                source: e,
            })?;
        let status = resp.status().as_u16();
        let bytes = resp.bytes()?.to_vec();
        Ok(Fetched { status, bytes })
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Pulls `detail` out of a JSON error body, falling back to the raw body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
