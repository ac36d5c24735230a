#![allow(dead_code)]

use async_trait::async_trait;
use gateway::GatewayService;
use gateway::audit::{AuditEvent, AuditKind, AuditSink};
use gateway::backend::{Backend, BackendError, build_client};
use gateway::state::GatewayState;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{HeaderMap, Method, Request, StatusCode};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tasks::{InMemoryTaskStore, TaskManager};
use tenants::config::BackendConfig;
use tenants::{StaticTenantStore, TenantRecord, TenantRouter};
use tokio::sync::Semaphore;
use transcoder::SchemaRegistry;
use url::Url;
use uuid::Uuid;

pub const KEY: &str = "abc123";
pub const OTHER_KEY: &str = "def456";
pub const SHARED_KEY: &str = "shared";

type Responder = dyn Fn(&Url, &Value) -> Result<Value, BackendError> + Send + Sync;

/// Answers backend calls in-process and remembers them.
pub struct FakeBackend {
    responder: Box<Responder>,
    gate: Option<Arc<Semaphore>>,
    pub calls: Mutex<Vec<(Url, Value, String)>>,
}

impl FakeBackend {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&Url, &Value) -> Result<Value, BackendError> + Send + Sync + 'static,
    {
        FakeBackend {
            responder: Box::new(responder),
            gate: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Calls block until the test adds a permit to `gate`.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> Vec<(Url, Value, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn post(&self, url: &Url, canonical: &Value, api_key: &str) -> Result<Value, BackendError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.clone(), canonical.clone(), api_key.to_string()));
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        (self.responder)(url, canonical)
    }
}

#[derive(Default)]
pub struct RecordingAuditSink {
    pub events: Mutex<Vec<AuditEvent>>,
}

impl RecordingAuditSink {
    pub fn kinds(&self) -> Vec<AuditKind> {
        self.events.lock().unwrap().iter().map(|e| e.kind).collect()
    }
}

impl AuditSink for RecordingAuditSink {
    fn record(&self, event: AuditEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn record(id: u64, api_key: &str) -> TenantRecord {
    TenantRecord {
        id,
        uuid: Uuid::new_v4(),
        name: format!("warehouse-{id}"),
        tag: "CAG".to_string(),
        api_key: api_key.to_string(),
        schema: "cag".to_string(),
    }
}

/// A canned optimizer answer in the canonical response shape.
pub fn optimized() -> Value {
    json!({
        "responseData": {
            "originalRouteDistance": 120,
            "optimalRouteDistance": 80.4,
            "pickLocations": {
                "assignmentIdentifier": ["A2", "A1", "A3"],
                "originalSortingNumber": ["2", "1", "3"],
                "materialHandlingSection": ["M1", "M1", "M2"],
                "rackIdentifier": ["R11", "R10", "R12"],
                "rackLocationIdentifier_1": ["07", "03", "01"],
                "rackLocationIdentifier_2": null,
                "optimizedSortingNumber": ["1", "2", "3"]
            }
        }
    })
}

pub struct Harness {
    pub service: GatewayService,
    pub state: Arc<GatewayState>,
    pub backend: Arc<FakeBackend>,
    pub audit: Arc<RecordingAuditSink>,
    pub tasks: Arc<InMemoryTaskStore>,
    pub tenants: Vec<TenantRecord>,
}

impl Harness {
    pub fn new(backend: FakeBackend) -> Self {
        Self::with_legacy(backend, HashMap::new())
    }

    pub fn with_legacy(backend: FakeBackend, legacy_urls: HashMap<String, Url>) -> Self {
        let tenants = vec![
            record(1, KEY),
            record(2, OTHER_KEY),
            record(3, SHARED_KEY),
            record(4, SHARED_KEY),
        ];
        let backend = Arc::new(backend);
        let audit = Arc::new(RecordingAuditSink::default());
        let tasks = Arc::new(InMemoryTaskStore::new());
        let backend_config = BackendConfig {
            urls: HashMap::from([(
                "CAG".to_string(),
                Url::parse("http://optimizer-cag:8080").unwrap(),
            )]),
            ..Default::default()
        };

        let state = Arc::new(GatewayState {
            schemas: Arc::new(SchemaRegistry::builtin().unwrap()),
            default_schema: "cag".to_string(),
            tenants: TenantRouter::new(
                Arc::new(StaticTenantStore::new(tenants.clone())),
                backend_config,
            ),
            tasks: TaskManager::new(tasks.clone()),
            backend: backend.clone(),
            audit: audit.clone(),
            legacy_urls,
            legacy_client: build_client(),
            timeout_secs: 5,
        });

        Harness {
            service: GatewayService::new(state.clone()),
            state,
            backend,
            audit,
            tasks,
            tenants,
        }
    }

    pub async fn send(
        &self,
        method: Method,
        path: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> (StatusCode, HeaderMap, Bytes) {
        let mut builder = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap();

        let response = self.service.handle(request).await;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, body)
    }

    pub async fn send_json(
        &self,
        method: Method,
        path: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> (StatusCode, Value) {
        let (status, _, body) = self.send(method, path, headers, body).await;
        (status, serde_json::from_slice(&body).unwrap())
    }
}

pub fn pick_round(api_key: Option<&str>) -> String {
    let api_key = api_key
        .map(|key| format!("<ApiKey>{key}</ApiKey>"))
        .unwrap_or_default();
    let location = |assignment: &str, sort: &str, rack: &str, mha: &str, horizontal: &str| {
        format!(
            "<PickLocation>\
                <AssignmentId>{assignment}</AssignmentId>\
                <OrigSortOrderNo>{sort}</OrigSortOrderNo>\
                <Location><MHA>{mha}</MHA><Rack>{rack}</Rack><HorizontalCoordinate>{horizontal}</HorizontalCoordinate></Location>\
            </PickLocation>"
        )
    };
    let locations = [
        location("A1", "1", "R10", "M1", "03"),
        location("A2", "2", "R11", "M1", "07"),
        location("A3", "3", "R12", "M2", "01"),
    ]
    .concat();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<MaXML_Envelope>
    <PickRoundShow>
        <DataArea>
            <PickRoundShow>
                <PickRound>
                    {api_key}
                    <IsPickDirectionClockwise>1</IsPickDirectionClockwise>
                    <IsReroute>0</IsReroute>
                    <MobileUnitId>42</MobileUnitId>
                    <PickRoundId>7</PickRoundId>
                    <PickLocationList>{locations}</PickLocationList>
                </PickRound>
            </PickRoundShow>
        </DataArea>
    </PickRoundShow>
</MaXML_Envelope>"#
    )
}

pub fn json_request(api_key: Option<&str>) -> String {
    let mut request = json!({
        "requestType": "PICK_ROUTE_OPTIMIZATION",
        "requestData": {
            "isClockwise": true,
            "isReroute": false,
            "mobileUnitIdentifier": "42",
            "pickRoundIdentifier": "7",
            "pickLocations": {
                "assignmentIdentifier": ["A1"],
                "originalSortingNumber": ["1"],
                "rackIdentifier": ["R10"],
                "materialHandlingSection": ["M1"],
                "rackLocationIdentifier_1": ["03"],
                "rackLocationIdentifier_2": null
            }
        }
    });
    if let Some(key) = api_key {
        request["requestData"]["apiKey"] = json!(key);
    }
    request.to_string()
}
