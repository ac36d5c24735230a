use http_body_util::BodyExt;
use hyper::body::Bytes;
use hyper::{Request, Response};
use hyper_util::client::legacy::Client;
use shared::http::{add_via_header, filter_hop_by_hop};
use std::time::Duration;
use tokio::time::{Instant, timeout_at};

use crate::backend::BackendError;

/// Sends `request` to `target` and collects the whole response.
///
/// The request's own URI is replaced by `target`. Hop-by-hop headers are
/// filtered in both directions and this gateway is appended to `Via`.
///
/// # Timeout Behavior
///
/// `timeout_secs` covers the entire cycle: connecting, sending, receiving
/// headers and collecting the complete response body. Not suitable for
/// streaming responses.
pub async fn send_to_upstream<C, B>(
    client: &Client<C, B>,
    target: &url::Url,
    request: Request<B>,
    timeout_secs: u64,
) -> Result<Response<Bytes>, BackendError>
where
    C: hyper_util::client::legacy::connect::Connect + Clone + Send + Sync + 'static,
    B: hyper::body::Body + Send + Unpin + 'static,
    B::Data: Send,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let upstream_identifier = target.host_str().unwrap_or(target.as_str()).to_string();

    let (mut parts, body) = request.into_parts();
    let request_version = parts.version;
    filter_hop_by_hop(&mut parts.headers, request_version);
    add_via_header(&mut parts.headers, request_version);

    let mut req_builder = Request::builder()
        .method(parts.method)
        .uri(target.as_str())
        .version(parts.version);

    for (name, value) in parts.headers.iter() {
        req_builder = req_builder.header(name, value);
    }

    let upstream_request = req_builder
        .body(body)
        .map_err(|e| BackendError::Build(e.to_string()))?;

    let deadline = Instant::now() + Duration::from_secs(timeout_secs);

    let response = timeout_at(deadline, client.request(upstream_request))
        .await
        // Outer error: the deadline elapsed
        .map_err(|_| BackendError::Timeout(upstream_identifier.clone()))?
        // Inner error: connection or protocol failure
        .map_err(|e| BackendError::Request(upstream_identifier.clone(), e.to_string()))?;

    let (mut parts, body) = response.into_parts();
    let response_version = parts.version;
    filter_hop_by_hop(&mut parts.headers, response_version);
    add_via_header(&mut parts.headers, response_version);

    // The body shares the deadline with the headers
    let body_bytes = timeout_at(deadline, body.collect())
        .await
        .map_err(|_| BackendError::Timeout(upstream_identifier.clone()))?
        .map(|collected| collected.to_bytes())
        .map_err(|e| BackendError::ResponseBody(e.to_string()))?;

    Ok(Response::from_parts(parts, body_bytes))
}
