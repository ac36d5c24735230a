use crate::api::utils::{HandlerResponse, bytes_response, json_response};
use crate::audit::{AuditEvent, AuditKind};
use crate::backend::{PICK_ROUTE_ENDPOINT, endpoint};
use crate::errors::{GatewayError, Result};
use crate::ingest::ingest;
use crate::state::GatewayState;
use hyper::body::Bytes;
use hyper::{HeaderMap, StatusCode};
use serde_json::{Value, json};
use transcoder::encode;
use uuid::Uuid;

/// Synchronous optimization: the backend answer is returned in the request's
/// wire format.
pub async fn handle(state: &GatewayState, headers: &HeaderMap, body: Bytes) -> Result<HandlerResponse> {
    let ingested = ingest(state, headers, &body).await?;
    let request = ingested.tagged_canonical();
    let url = endpoint(&ingested.binding.backend_url, PICK_ROUTE_ENDPOINT);

    let response = state
        .backend
        .post(&url, &request, &ingested.binding.credential)
        .await
        .inspect_err(|e| {
            tracing::error!(tenant = %ingested.binding.uuid, url = %url, error = %e, "Pick route optimization failed");
        })?;

    state.audit.record(AuditEvent::new(
        AuditKind::PickRoute,
        &ingested.binding,
        Uuid::new_v4(),
        json!({"request": request, "response": response}),
    ));

    let Some(schema) = &ingested.schema else {
        return Ok(json_response(StatusCode::OK, &response));
    };

    let document = response_document(&request, response);
    let encoded = encode(&document, &schema.response_template, &schema.response)
        .map_err(|e| GatewayError::Internal(format!("could not encode response: {e}")))?;
    Ok(bytes_response(
        StatusCode::OK,
        schema.response_template.format().content_type(),
        encoded,
    ))
}

/// The document the response table reads: the backend answer, with the
/// request's `requestData` when the backend did not echo it.
fn response_document(request: &Value, mut response: Value) -> Value {
    if let Value::Object(map) = &mut response
        && !map.contains_key("requestData")
        && let Some(request_data) = request.get("requestData")
    {
        map.insert("requestData".to_string(), request_data.clone());
    }
    response
}
