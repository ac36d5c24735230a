const BASE_DELAY: u64 = 500;
const MAX_RETRIES: u32 = 3;

use crate::metrics_defs::CONTROL_PLANE_LOOKUP_DURATION;
use crate::store::{TenantStore, TenantStoreError};
use crate::types::TenantRecord;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use shared::histogram;
use std::time::Instant;
use tokio::time::{Duration, sleep};
use url::Url;

#[derive(Deserialize)]
struct ControlPlaneData {
    data: Vec<TenantRecord>,
}

/// Looks tenants up in the control plane on every request.
///
/// `GET <url>?api_key=<credential>` answers `{"data": [<tenant record>, ...]}`.
pub struct ControlPlaneTenantStore {
    client: reqwest::Client,
    url: Url,
    base_delay: Duration,
}

impl ControlPlaneTenantStore {
    pub fn new(url: Url) -> Self {
        ControlPlaneTenantStore {
            client: reqwest::Client::new(),
            url,
            base_delay: Duration::from_millis(BASE_DELAY),
        }
    }

    #[cfg(test)]
    fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }
}

#[async_trait]
impl TenantStore for ControlPlaneTenantStore {
    async fn lookup(&self, credential: &str) -> Result<Vec<TenantRecord>, TenantStoreError> {
        const RETRIABLE_STATUS_CODES: &[StatusCode] = &[
            StatusCode::TOO_MANY_REQUESTS,     // 429
            StatusCode::INTERNAL_SERVER_ERROR, // 500
            StatusCode::BAD_GATEWAY,           // 502
            StatusCode::SERVICE_UNAVAILABLE,   // 503
            StatusCode::GATEWAY_TIMEOUT,       // 504
        ];

        let started = Instant::now();
        let mut url = self.url.clone();
        url.query_pairs_mut().append_pair("api_key", credential);

        let mut retries = 0;
        loop {
            let response = self.client.get(url.clone()).send().await?;
            let status = response.status();

            if status.is_success() {
                let records = response.json::<ControlPlaneData>().await?.data;
                histogram!(CONTROL_PLANE_LOOKUP_DURATION).record(started.elapsed().as_secs_f64());
                return Ok(records);
            }

            if !RETRIABLE_STATUS_CODES.contains(&status) {
                return Err(TenantStoreError::UnexpectedStatus(status.as_u16()));
            }
            if retries >= MAX_RETRIES {
                return Err(TenantStoreError::RetriesExceeded);
            }

            tracing::warn!(status = %status, retries, "Control plane lookup failed, retrying");
            sleep(self.base_delay * 2_u32.pow(retries)).await;
            retries += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;
    use hyper::body::{Bytes, Incoming};
    use hyper::service::service_fn;
    use hyper::{Request, Response};
    use hyper_util::rt::{TokioExecutor, TokioIo};
    use std::convert::Infallible;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::net::TcpListener;

    const RECORD: &str = r#"{"data": [{"id": 4, "uuid": "6f1c1c52-2f37-4a63-a9e6-5d0d1f7e55b1", "name": "Central", "tag": "CAG", "api_key": "abc123", "schema": "cag"}]}"#;

    // Fails the first `failures` requests with a 503, then answers with one record
    // when the expected credential is in the query.
    async fn start_control_plane(failures: usize) -> (Url, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let calls = Arc::new(AtomicUsize::new(0));
        let server_calls = calls.clone();

        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                let calls = server_calls.clone();
                let service = service_fn(move |req: Request<Incoming>| {
                    let call = calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        let query = req.uri().query().unwrap_or_default().to_string();
                        let (status, body) = if call < failures {
                            (503, String::new())
                        } else if query == "api_key=abc123" {
                            (200, RECORD.to_string())
                        } else {
                            (200, r#"{"data": []}"#.to_string())
                        };
                        let mut response = Response::new(Full::new(Bytes::from(body)));
                        *response.status_mut() = hyper::StatusCode::from_u16(status).unwrap();
                        Ok::<_, Infallible>(response)
                    }
                });
                tokio::spawn(async move {
                    let _ = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        let url = Url::parse(&format!("http://127.0.0.1:{port}/warehouses")).unwrap();
        (url, calls)
    }

    #[tokio::test]
    async fn test_control_plane_lookup() {
        let (url, _calls) = start_control_plane(0).await;
        let store = ControlPlaneTenantStore::new(url);

        let records = store.lookup("abc123").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 4);
        assert_eq!(records[0].tag, "CAG");

        assert!(store.lookup("unknown").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_control_plane_retries() {
        let (url, calls) = start_control_plane(2).await;
        let store = ControlPlaneTenantStore::new(url).with_base_delay(Duration::from_millis(1));
        assert_eq!(store.lookup("abc123").await.unwrap().len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let (url, _calls) = start_control_plane(usize::MAX).await;
        let store = ControlPlaneTenantStore::new(url).with_base_delay(Duration::from_millis(1));
        assert!(matches!(
            store.lookup("abc123").await,
            Err(TenantStoreError::RetriesExceeded)
        ));
    }
}
