use crate::errors::GatewayError;
use http::Version;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderValue, TRANSFER_ENCODING};
use hyper::{Response, StatusCode};
use serde_json::Value;
use shared::http::{filter_hop_by_hop, make_json_response};

pub type HandlerBody = BoxBody<Bytes, GatewayError>;
pub type HandlerResponse = Response<HandlerBody>;

pub fn full_body(bytes: impl Into<Bytes>) -> HandlerBody {
    Full::new(bytes.into()).map_err(|e| match e {}).boxed()
}

pub fn json_response(status: StatusCode, value: &Value) -> HandlerResponse {
    make_json_response(status, value)
}

pub fn bytes_response(
    status: StatusCode,
    content_type: &'static str,
    body: impl Into<Bytes>,
) -> HandlerResponse {
    let mut response = Response::new(full_body(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

/// Common header normalization for relayed responses. Length headers are
/// dropped since hyper recomputes them for the new body.
pub fn normalize_headers(headers: &mut HeaderMap, version: Version) -> &mut HeaderMap {
    filter_hop_by_hop(headers, version);
    headers.remove(CONTENT_LENGTH);
    headers.remove(TRANSFER_ENCODING);

    headers
}
