use http::Version;
use http::header::{
    CONNECTION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, PROXY_AUTHENTICATE,
    PROXY_AUTHORIZATION, TE, TRAILER, TRANSFER_ENCODING, UPGRADE, VIA,
};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioExecutor;
use hyper_util::rt::TokioIo;
use hyper_util::server::conn::auto::Builder;
use std::sync::Arc;
use tokio::net::TcpListener;

const VIA_NAME: &str = "pickgate";

static HOP_BY_HOP_NAMES: &[HeaderName] = &[
    CONNECTION,
    TRANSFER_ENCODING,
    TE,
    TRAILER,
    UPGRADE,
    PROXY_AUTHORIZATION,
    PROXY_AUTHENTICATE,
];

/// Accepts connections forever, serving each one on its own task.
pub async fn run_http_service<S, E>(host: &str, port: u16, service: S) -> Result<(), E>
where
    S: Service<Request<Incoming>, Response = Response<BoxBody<Bytes, E>>, Error = E>
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
    E: From<std::io::Error> + std::error::Error + Send + Sync + 'static,
{
    let listener = TcpListener::bind(format!("{host}:{port}")).await?;
    tracing::info!(host, port, "Listening");
    serve(listener, service).await
}

/// Serves an already bound listener. Tests bind port 0 and hand the listener in.
pub async fn serve<S, E>(listener: TcpListener, service: S) -> Result<(), E>
where
    S: Service<Request<Incoming>, Response = Response<BoxBody<Bytes, E>>, Error = E>
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
    E: From<std::io::Error> + std::error::Error + Send + Sync + 'static,
{
    let service_arc = Arc::new(service);

    loop {
        let (stream, _peer_addr) = listener.accept().await?;
        let _ = stream.set_nodelay(true);
        let io = TokioIo::new(stream);
        let svc = service_arc.clone();

        // Hand the connection to hyper; auto-detect h1/h2 on this socket
        tokio::spawn(async move {
            if let Err(e) = Builder::new(TokioExecutor::new())
                .serve_connection(io, svc)
                .await
            {
                tracing::debug!(error = %e, "Connection closed with error");
            }
        });
    }
}

/// Plain-text response carrying the status's canonical reason.
pub fn make_error_response(status_code: StatusCode) -> Response<Bytes> {
    let message = status_code
        .canonical_reason()
        .unwrap_or("an error occurred");

    let mut response = Response::new(Bytes::from(format!("{message}\n")));
    *response.status_mut() = status_code;
    response
}

pub fn make_boxed_error_response<E: 'static>(status_code: StatusCode) -> Response<BoxBody<Bytes, E>> {
    make_error_response(status_code).map(|body| Full::new(body).map_err(|e| match e {}).boxed())
}

/// Builds a JSON response. Serialization of a `serde_json::Value` cannot fail.
pub fn make_json_response<E: 'static>(
    status_code: StatusCode,
    value: &serde_json::Value,
) -> Response<BoxBody<Bytes, E>> {
    let body = Bytes::from(value.to_string());
    let mut response = Response::new(Full::new(body).map_err(|e| match e {}).boxed());
    *response.status_mut() = status_code;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

pub fn is_http1(v: Version) -> bool {
    matches!(v, Version::HTTP_09 | Version::HTTP_10 | Version::HTTP_11)
}

/// Appends this gateway to the `Via` header.
pub fn add_via_header(headers: &mut HeaderMap, version: Version) {
    let version_str = match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_11 => "1.1",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => {
            tracing::warn!(version = ?version, "Unknown HTTP version, skipping Via header");
            return;
        }
    };

    let via_value = format!("{version_str} {VIA_NAME}");
    let combined = match headers.get(VIA).and_then(|existing| existing.to_str().ok()) {
        Some(existing) => format!("{existing}, {via_value}"),
        None => via_value,
    };
    if let Ok(value) = HeaderValue::from_str(&combined) {
        headers.insert(VIA, value);
    }
}

/// Strips hop-by-hop headers, including any named by `Connection`.
pub fn filter_hop_by_hop(headers: &mut HeaderMap, version: Version) -> &mut HeaderMap {
    if !is_http1(version) {
        return headers;
    }

    let extra_drops: Vec<HeaderName> = headers
        .get(CONNECTION)
        .and_then(|connection| connection.to_str().ok())
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .filter_map(|t| HeaderName::from_bytes(t.as_bytes()).ok())
                .collect()
        })
        .unwrap_or_default();

    for name in HOP_BY_HOP_NAMES {
        headers.remove(name);
    }
    for name in extra_drops {
        headers.remove(&name);
    }

    if matches!(version, Version::HTTP_09 | Version::HTTP_10) {
        headers.remove(HeaderName::from_static("keep-alive"));
    }

    headers
}
