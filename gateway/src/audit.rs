use crate::metrics_defs::AUDIT_FAILURES;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::counter;
use std::sync::Arc;
use tenants::TenantBinding;
use url::Url;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    PickRoute,
    SingleBatchCreated,
    TaskFinished,
}

/// A record of one optimization exchange.
#[derive(Clone, Debug, Serialize)]
pub struct AuditEvent {
    pub kind: AuditKind,
    pub tenant_uuid: Uuid,
    pub tag: String,
    /// Task id for single-batch jobs, a fresh id for synchronous calls.
    pub job_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub payload: Value,
}

impl AuditEvent {
    pub fn new(kind: AuditKind, binding: &TenantBinding, job_id: Uuid, payload: Value) -> Self {
        AuditEvent {
            kind,
            tenant_uuid: binding.uuid,
            tag: binding.tag.clone(),
            job_id,
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// Fire-and-forget event recording. Implementations never fail the caller.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "type")]
pub enum AuditConfig {
    /// Events go to the log.
    #[default]
    Log,
    /// Events are posted as JSON to `url`.
    Http { url: Url },
}

pub fn build_sink(config: &AuditConfig) -> Arc<dyn AuditSink> {
    match config {
        AuditConfig::Log => Arc::new(LogAuditSink),
        AuditConfig::Http { url } => Arc::new(HttpAuditSink::new(url.clone())),
    }
}

pub struct LogAuditSink;

impl AuditSink for LogAuditSink {
    fn record(&self, event: AuditEvent) {
        tracing::info!(
            kind = ?event.kind,
            tenant = %event.tenant_uuid,
            tag = %event.tag,
            job_id = %event.job_id,
            payload = %event.payload,
            "Audit event"
        );
    }
}

pub struct HttpAuditSink {
    client: reqwest::Client,
    url: Url,
}

impl HttpAuditSink {
    pub fn new(url: Url) -> Self {
        HttpAuditSink {
            client: reqwest::Client::new(),
            url,
        }
    }
}

impl AuditSink for HttpAuditSink {
    fn record(&self, event: AuditEvent) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            counter!(AUDIT_FAILURES).increment(1);
            tracing::error!(job_id = %event.job_id, "No runtime to deliver audit event");
            return;
        };

        let client = self.client.clone();
        let url = self.url.clone();
        runtime.spawn(async move {
            let result = client
                .post(url)
                .json(&event)
                .send()
                .await
                .and_then(|response| response.error_for_status());

            if let Err(e) = result {
                counter!(AUDIT_FAILURES).increment(1);
                tracing::error!(job_id = %event.job_id, error = %e, "Failed to deliver audit event");
            }
        });
    }
}
