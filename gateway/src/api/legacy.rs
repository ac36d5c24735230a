//! `/optimize`: the pre-v1 endpoint. Bodies are relayed untouched to the
//! tenant tag's legacy optimizer.

use crate::api::utils::{HandlerResponse, bytes_response, full_body, normalize_headers};
use crate::errors::{GatewayError, Result};
use crate::http::send_to_upstream;
use crate::ingest::{API_KEY_HEADER, header_credential};
use crate::state::GatewayState;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::{HeaderMap, Method, Request, Response, StatusCode};
use tenants::ResolveError;
use transcoder::WireFormat;

const UNSUPPORTED: &str = "Only JSON or XML is supported.";
const UNAUTHORIZED: &str = "Unauthorized";

pub async fn handle(state: &GatewayState, headers: &HeaderMap, body: Bytes) -> Result<HandlerResponse> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let Some(format) = WireFormat::from_content_type(&content_type) else {
        return Ok(bytes_response(StatusCode::BAD_REQUEST, "text/plain", UNSUPPORTED));
    };

    let credential = match format {
        WireFormat::Json => header_credential(headers),
        WireFormat::Xml => xml_credential(state, &body).or_else(|| header_credential(headers)),
    };
    let Some(credential) = credential else {
        return Ok(unauthorized());
    };

    let binding = match state.tenants.resolve_tenant(&credential).await {
        Ok(binding) => binding,
        Err(ResolveError::NotFound) => return Ok(unauthorized()),
        Err(e) => return Err(e.into()),
    };
    let Some(target) = state.legacy_urls.get(&binding.tag) else {
        tracing::warn!(tag = %binding.tag, "No legacy optimizer configured for tenant tag");
        return Ok(unauthorized());
    };

    let request = Request::builder()
        .method(Method::POST)
        .uri(target.as_str())
        .header(CONTENT_TYPE, content_type)
        .header(API_KEY_HEADER, credential)
        .body(Full::new(body))
        .map_err(|e| GatewayError::Internal(e.to_string()))?;

    let response = send_to_upstream(&state.legacy_client, target, request, state.timeout_secs)
        .await
        .inspect_err(|e| tracing::error!(url = %target, error = %e, "Legacy optimizer call failed"))?;

    let (mut parts, body) = response.into_parts();
    normalize_headers(&mut parts.headers, parts.version);
    Ok(Response::from_parts(parts, full_body(body)))
}

/// Credential inside an XML body, read with the default schema.
fn xml_credential(state: &GatewayState, body: &Bytes) -> Option<String> {
    let schema = state.schemas.get(&state.default_schema)?;
    let wire = WireFormat::Xml.parse(body).ok()?;
    schema.credential(&wire)
}

fn unauthorized() -> HandlerResponse {
    bytes_response(StatusCode::UNAUTHORIZED, "text/plain", UNAUTHORIZED)
}
