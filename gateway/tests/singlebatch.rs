mod common;

use common::{FakeBackend, Harness, KEY, OTHER_KEY, json_request, optimized};
use gateway::audit::AuditKind;
use gateway::backend::BackendError;
use hyper::{Method, StatusCode};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

const PATH: &str = "/v1/optimize/singlebatch";

async fn submit(harness: &Harness) -> String {
    let (status, headers, body) = harness
        .send(
            Method::POST,
            PATH,
            &[("content-type", "application/json"), ("x-api-key", KEY)],
            &json_request(None),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["accepted"], true);
    let task_id = body["taskId"].as_str().unwrap().to_string();
    let location = format!("{PATH}/{task_id}");
    assert_eq!(body["url"], location);
    assert_eq!(headers.get("location").unwrap(), location.as_str());
    task_id
}

async fn poll(harness: &Harness, task_id: &str, api_key: &str) -> (StatusCode, Value) {
    harness
        .send_json(
            Method::GET,
            &format!("{PATH}/{task_id}"),
            &[("x-api-key", api_key)],
            "",
        )
        .await
}

/// Polls until the task leaves `waiting`/`running`.
async fn poll_until_finished(harness: &Harness, task_id: &str) -> (StatusCode, Value) {
    for _ in 0..500 {
        let (status, body) = poll(harness, task_id, KEY).await;
        if status != StatusCode::ACCEPTED {
            return (status, body);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {task_id} did not finish");
}

#[tokio::test]
async fn test_single_batch_lifecycle() {
    let gate = Arc::new(Semaphore::new(0));
    let harness = Harness::new(FakeBackend::new(|_, _| Ok(optimized())).gated(gate.clone()));

    let task_id = submit(&harness).await;

    // The job is held by the gate
    let (status, body) = poll(&harness, &task_id, KEY).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["accepted"], true);
    assert!(body["status"] == "waiting" || body["status"] == "running");

    gate.add_permits(1);
    let (status, body) = poll_until_finished(&harness, &task_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, optimized());

    // The backend got the task id and the warehouse
    let calls = harness.backend.calls();
    assert_eq!(calls.len(), 1);
    let (url, payload, _) = &calls[0];
    assert_eq!(url.as_str(), "http://optimizer-cag:8080/singlebatch");
    assert_eq!(payload["_meta"]["taskId"], task_id.as_str());
    assert_eq!(payload["_meta"]["warehouse"]["tag"], "CAG");

    // Completion is audited after the outcome is stored
    for _ in 0..100 {
        if harness.audit.kinds().contains(&AuditKind::TaskFinished) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let kinds = harness.audit.kinds();
    assert!(kinds.contains(&AuditKind::SingleBatchCreated));
    assert_eq!(
        kinds.iter().filter(|kind| **kind == AuditKind::TaskFinished).count(),
        1
    );
}

#[tokio::test]
async fn test_single_batch_failure() {
    let harness = Harness::new(FakeBackend::new(|_, _| {
        Err(BackendError::Status {
            status: 422,
            body: json!({"reason": "unknown rack"}),
        })
    }));

    let task_id = submit(&harness).await;
    let (status, body) = poll_until_finished(&harness, &task_id).await;
    assert_eq!(status, StatusCode::IM_A_TEAPOT);
    assert_eq!(body["error"]["code"], "E013");
    assert_eq!(body["error"]["details"]["status"], 422);
    assert_eq!(body["error"]["details"]["body"]["reason"], "unknown rack");
}

#[tokio::test]
async fn test_task_owned_by_another_tenant() {
    let harness = Harness::new(FakeBackend::new(|_, _| Ok(optimized())));
    let task_id = submit(&harness).await;

    let (status, body) = poll(&harness, &task_id, OTHER_KEY).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "E012");
}

#[tokio::test]
async fn test_status_errors() {
    let harness = Harness::new(FakeBackend::new(|_, _| Ok(optimized())));

    let (status, body) = harness
        .send_json(Method::GET, PATH, &[("x-api-key", KEY)], "")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "E010");

    let (status, body) = poll(&harness, "not-a-uuid", KEY).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "E011");

    let (status, body) = poll(&harness, &uuid::Uuid::new_v4().to_string(), KEY).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "E011");

    let (status, body) = harness
        .send_json(Method::GET, &format!("{PATH}/{}", uuid::Uuid::new_v4()), &[], "")
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "E002");
}

#[tokio::test]
async fn test_rejected_request_creates_no_task() {
    let harness = Harness::new(FakeBackend::new(|_, _| Ok(optimized())));

    let (status, body) = harness
        .send_json(
            Method::POST,
            PATH,
            &[("content-type", "text/xml"), ("x-api-key", KEY)],
            &common::pick_round(None),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "E015");
    assert!(harness.tasks.is_empty());
    assert!(harness.backend.calls().is_empty());
}
