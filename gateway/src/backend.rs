use crate::http::send_to_upstream;
use crate::metrics_defs::BACKEND_DURATION;
use async_trait::async_trait;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{ACCEPT, CONTENT_TYPE};
use hyper::{Method, Request};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde_json::{Value, json};
use shared::histogram;
use std::time::Instant;
use thiserror::Error;
use url::Url;

pub type UpstreamClient = Client<HttpConnector, Full<Bytes>>;

/// Synchronous optimization endpoint, relative to the tenant's backend URL.
pub const PICK_ROUTE_ENDPOINT: &str = "pickroute";
/// Endpoint used by dispatched single-batch jobs.
pub const SINGLE_BATCH_ENDPOINT: &str = "singlebatch";

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to build request: {0}")]
    Build(String),

    #[error("Upstream timeout for {0}")]
    Timeout(String),

    #[error("Upstream request failed for {0}: {1}")]
    Request(String, String),

    #[error("Failed to read response body: {0}")]
    ResponseBody(String),

    #[error("Backend answered with status {status}")]
    Status { status: u16, body: Value },

    #[error("Backend response is not valid JSON: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// What a failed task records as its result.
    pub fn payload(&self) -> Value {
        match self {
            BackendError::Status { status, body } => json!({
                "status": status,
                "body": body,
            }),
            other => json!({ "message": other.to_string() }),
        }
    }
}

/// Posts canonical documents to an optimizer backend.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn post(&self, url: &Url, canonical: &Value, api_key: &str) -> Result<Value, BackendError>;
}

/// `<base>/<endpoint>`, whether or not `base` ends with a slash.
pub fn endpoint(base: &Url, name: &str) -> Url {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(name);
    }
    url
}

pub fn build_client() -> UpstreamClient {
    Client::builder(TokioExecutor::new()).build(HttpConnector::new())
}

/// JSON over HTTP with a per-call timeout.
pub struct HttpBackend {
    client: UpstreamClient,
    timeout_secs: u64,
}

impl HttpBackend {
    pub fn new(client: UpstreamClient, timeout_secs: u64) -> Self {
        HttpBackend {
            client,
            timeout_secs,
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn post(&self, url: &Url, canonical: &Value, api_key: &str) -> Result<Value, BackendError> {
        let started = Instant::now();
        let body = Bytes::from(canonical.to_string());

        let request = Request::builder()
            .method(Method::POST)
            .uri(url.as_str())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header("x-api-key", api_key)
            .body(Full::new(body))
            .map_err(|e| BackendError::Build(e.to_string()))?;

        let result = send_to_upstream(&self.client, url, request, self.timeout_secs).await;
        let outcome = match &result {
            Ok(response) if response.status().is_success() => "success",
            Ok(_) => "error_status",
            Err(BackendError::Timeout(_)) => "timeout",
            Err(_) => "error",
        };
        histogram!(BACKEND_DURATION, "outcome" => outcome).record(started.elapsed().as_secs_f64());

        let response = result?;
        let status = response.status();
        let bytes = response.into_body();

        if !status.is_success() {
            // Keep whatever the backend said; non-JSON bodies are kept as text
            let body = serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
            tracing::warn!(url = %url, status = status.as_u16(), "Backend rejected request");
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }
}
