use crate::api::utils::{HandlerResponse, json_response};
use crate::audit::{AuditEvent, AuditKind, AuditSink};
use crate::backend::{SINGLE_BATCH_ENDPOINT, endpoint};
use crate::errors::{GatewayError, Result};
use crate::ingest::{header_credential, ingest, set_meta};
use crate::state::GatewayState;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, LOCATION};
use hyper::{HeaderMap, StatusCode};
use serde_json::{Value, json};
use std::sync::Arc;
use tasks::{AdvanceOutcome, DispatchHandle, TaskKind, TaskStatus};
use tenants::TenantBinding;
use uuid::Uuid;

pub const PATH: &str = "/v1/optimize/singlebatch";

/// Where a task's status can be polled.
pub fn status_path(id: Uuid) -> String {
    format!("{PATH}/{id}")
}

/// Accepts a single-batch job and runs it in the background.
pub async fn create(state: &GatewayState, headers: &HeaderMap, body: Bytes) -> Result<HandlerResponse> {
    let ingested = ingest(state, headers, &body).await?;
    let binding = ingested.binding.clone();
    let payload = ingested.tagged_canonical();

    let task_id = state
        .tasks
        .create(&binding.owner_id(), TaskKind::SingleBatch, payload.clone())
        .await
        .map_err(|e| GatewayError::Queue(e.to_string()))?;

    let mut job_payload = payload.clone();
    set_meta(&mut job_payload, "taskId", json!(task_id));
    let url = endpoint(&binding.backend_url, SINGLE_BATCH_ENDPOINT);
    let backend = state.backend.clone();
    let audit = state.audit.clone();
    let job_binding = binding.clone();

    let handle = state.tasks.dispatch(task_id, async move {
        backend
            .post(&url, &job_payload, &job_binding.credential)
            .await
            .map_err(|e| {
                tracing::warn!(task_id = %task_id, url = %url, error = %e, "Single batch optimization failed");
                e.payload()
            })
    });
    tokio::spawn(audit_outcome(handle, audit, binding.clone()));

    state.audit.record(AuditEvent::new(
        AuditKind::SingleBatchCreated,
        &binding,
        task_id,
        payload,
    ));

    let location = status_path(task_id);
    let mut response = json_response(
        StatusCode::ACCEPTED,
        &json!({
            "accepted": true,
            "taskId": task_id,
            "url": location,
        }),
    );
    if let Ok(value) = HeaderValue::from_str(&location) {
        response.headers_mut().insert(LOCATION, value);
    }
    Ok(response)
}

/// Records the finished task once its outcome is the one stored. A repeated
/// or rejected terminal advance is not a completion.
async fn audit_outcome(handle: DispatchHandle, audit: Arc<dyn AuditSink>, binding: TenantBinding) {
    let task_id = handle.task_id();
    match handle.wait().await {
        Ok(AdvanceOutcome::Applied(task)) => audit.record(AuditEvent::new(
            AuditKind::TaskFinished,
            &binding,
            task_id,
            json!({"status": task.status.as_str(), "result": task.result}),
        )),
        Ok(AdvanceOutcome::Unchanged(_)) => {
            tracing::debug!(task_id = %task_id, "Task outcome already recorded");
        }
        Err(e) => {
            tracing::warn!(task_id = %task_id, error = %e, "Task outcome not recorded");
        }
    }
}

/// Reports a task to the tenant that created it.
pub async fn status(state: &GatewayState, headers: &HeaderMap, raw_id: &str) -> Result<HandlerResponse> {
    let credential = header_credential(headers).ok_or(GatewayError::MissingApiKey)?;
    let binding = state.tenants.resolve_tenant(&credential).await?;

    let id = Uuid::parse_str(raw_id).map_err(|_| GatewayError::InvalidTaskId(raw_id.to_string()))?;
    let task = state
        .tasks
        .get(id)
        .await?
        .ok_or_else(|| GatewayError::InvalidTaskId(raw_id.to_string()))?;

    if task.owner != binding.owner_id() {
        tracing::warn!(task_id = %id, tenant = %binding.uuid, "Task requested by another tenant");
        return Err(GatewayError::TaskNotOwned(binding.uuid));
    }

    match task.status {
        TaskStatus::Waiting | TaskStatus::Running => Ok(json_response(
            StatusCode::ACCEPTED,
            &json!({
                "accepted": true,
                "taskId": task.id,
                "status": task.status.as_str(),
            }),
        )),
        TaskStatus::Done => Ok(json_response(
            StatusCode::OK,
            &task.result.unwrap_or(Value::Null),
        )),
        TaskStatus::Failed => Err(GatewayError::TaskFailed(task.result.unwrap_or(Value::Null))),
    }
}
