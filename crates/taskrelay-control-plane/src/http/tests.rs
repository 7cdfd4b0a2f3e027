use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use taskrelay_core::{TaskId, WorkerId};
use taskrelay_store::SqliteStore;

use super::create_router;
use crate::config::Config;
use crate::context::StaticContext;
use crate::state::AppState;

async fn test_state() -> Arc<AppState> {
    let store = Arc::new(SqliteStore::connect("sqlite::memory:").await.unwrap());
    let context = StaticContext(json!({"metrics": {"sessions": 1, "tasks": 0, "actions": 0}}));
    AppState::new(store, Arc::new(context), &Config::default())
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(body) => {
            request = request.header("content-type", "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn test_create_and_get_task() {
    let app = create_router(test_state().await);

    let (status, created) = send(
        &app,
        Method::POST,
        "/tasks",
        Some(json!({"task_type": "research", "description": "Find the bug"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "pending");
    assert_eq!(created["priority"], 5);
    assert_eq!(created["timeout_seconds"], 300);
    assert_eq!(created["max_retries"], 3);

    let id = created["task_id"].as_str().unwrap();
    let (status, fetched) = send(&app, Method::GET, &format!("/tasks/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["description"], "Find the bug");
}

#[tokio::test]
async fn test_create_task_rejects_out_of_range_fields() {
    let app = create_router(test_state().await);

    for body in [
        json!({"task_type": "t", "description": "d", "priority": 0}),
        json!({"task_type": "t", "description": "d", "timeout_seconds": 5}),
        json!({"task_type": "t", "description": "d", "max_retries": 6}),
        json!({"task_type": "", "description": "d"}),
    ] {
        let (status, error) = send(&app, Method::POST, "/tasks", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error["error"].is_string());
    }
}

#[tokio::test]
async fn test_malformed_requests_get_json_errors() {
    let app = create_router(test_state().await);

    for body in [
        json!({"task_type": "t", "description": "d", "priority": 300}),
        json!({"task_type": "t"}),
    ] {
        let (status, error) = send(&app, Method::POST, "/tasks", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error["error"].is_string());
    }

    let (status, error) = send(&app, Method::GET, "/tasks?limit=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error["error"].is_string());

    let (status, error) = send(&app, Method::POST, "/sessions", Some(json!({"role": 7}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error["error"].is_string());
}

#[tokio::test]
async fn test_unknown_task_is_404() {
    let app = create_router(test_state().await);

    let (status, error) = send(&app, Method::GET, "/tasks/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(error["error"].as_str().unwrap().contains("nope"));

    let (status, _) = send(&app, Method::DELETE, "/tasks/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::GET, "/tasks/nope/actions", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_tasks_filters_by_status() {
    let state = test_state().await;
    let app = create_router(state.clone());

    for description in ["a", "b", "c"] {
        send(
            &app,
            Method::POST,
            "/tasks",
            Some(json!({"task_type": "code", "description": description})),
        )
        .await;
    }
    state.queue.claim(&WorkerId::new("w1")).await.unwrap().unwrap();

    let (status, all) = send(&app, Method::GET, "/tasks", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 3);

    let (_, pending) = send(&app, Method::GET, "/tasks?status=pending&limit=1", None).await;
    let pending = pending.as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["description"], "c");

    let (_, running) = send(&app, Method::GET, "/tasks?status=running", None).await;
    assert_eq!(running[0]["description"], "a");

    let (status, _) = send(&app, Method::GET, "/tasks?status=bogus", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cancel_only_pending() {
    let state = test_state().await;
    let app = create_router(state.clone());

    let (_, first) = send(
        &app,
        Method::POST,
        "/tasks",
        Some(json!({"task_type": "code", "description": "first"})),
    )
    .await;
    let (_, second) = send(
        &app,
        Method::POST,
        "/tasks",
        Some(json!({"task_type": "code", "description": "second"})),
    )
    .await;
    state.queue.claim(&WorkerId::new("w1")).await.unwrap().unwrap();

    let running_id = first["task_id"].as_str().unwrap();
    let (status, body) = send(&app, Method::DELETE, &format!("/tasks/{running_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], false);
    assert_eq!(body["status"], "running");

    let pending_id = second["task_id"].as_str().unwrap();
    let (_, body) = send(&app, Method::DELETE, &format!("/tasks/{pending_id}"), None).await;
    assert_eq!(body["cancelled"], true);
    assert_eq!(body["status"], "cancelled");
    assert!(state.queue.claim(&WorkerId::new("w2")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_dashboard_counts() {
    let state = test_state().await;
    let app = create_router(state.clone());
    send(
        &app,
        Method::POST,
        "/tasks",
        Some(json!({"task_type": "code", "description": "x"})),
    )
    .await;

    let (status, body) = send(&app, Method::GET, "/dashboard", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["queued"], 1);
    assert_eq!(body["running"], 0);
    assert_eq!(body["total_completed"], 0);
    assert!(body["avg_execution_time_sec"].is_null());
    assert!(body["generated_at"].is_string());
}

#[tokio::test]
async fn test_health_reports_store_state() {
    let state = test_state().await;
    let app = create_router(state.clone());

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
    store.pool().close().await;
    let broken = AppState::new(
        Arc::new(store),
        Arc::new(StaticContext::default()),
        &Config::default(),
    );
    let (status, body) = send(&create_router(broken), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_metrics_content_type() {
    let app = create_router(test_state().await);
    let response = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/plain; version=0.0.4"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("taskrelay_tasks{status=\"pending\"} 0"));
}

#[tokio::test]
async fn test_session_delegate_audit_flow() {
    let state = test_state().await;
    let app = create_router(state.clone());

    let (status, created) = send(
        &app,
        Method::POST,
        "/sessions",
        Some(json!({"platform": "claude_code", "role": "planner"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["parent_missing"], false);
    assert!(created["landing_brief"]
        .as_str()
        .unwrap()
        .starts_with("=== LANDING BRIEF ==="));
    let session_id = created["session"]["session_id"].as_str().unwrap().to_string();

    let mut task_ids = Vec::new();
    for priority in [5, 9] {
        let (status, delegated) = send(
            &app,
            Method::POST,
            &format!("/sessions/{session_id}/delegations"),
            Some(json!({
                "description": format!("work at priority {priority}"),
                "task_type": "code",
                "target_role": "executor",
                "priority": priority,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        task_ids.push(delegated["task_id"].as_str().unwrap().to_string());
    }

    // Creation order wins over priority.
    let claimed = state.queue.claim(&WorkerId::new("w1")).await.unwrap().unwrap();
    assert_eq!(claimed.id, TaskId::new(task_ids[0].clone()));

    let (status, audited) = send(
        &app,
        Method::POST,
        &format!("/sessions/{session_id}/audits"),
        Some(json!({
            "task_id": task_ids[0],
            "verdict": "approved",
            "notes": "ok",
            "approved": true,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(audited["applied"], true);

    let (_, task) = send(&app, Method::GET, &format!("/tasks/{}", task_ids[0]), None).await;
    assert_eq!(task["status"], "completed");
    assert_eq!(task["output_data"]["approved"], true);

    let (status, summary) = send(
        &app,
        Method::GET,
        &format!("/sessions/{session_id}/summary"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total_tasks"], 2);
    assert_eq!(summary["task_counts_by_status"]["completed"], 1);
    assert_eq!(summary["task_counts_by_status"]["pending"], 1);
    assert_eq!(summary["task_counts_by_role"]["executor"], 2);
    assert_eq!(summary["action_count"], 3);

    let (status, history) = send(&app, Method::GET, &format!("/sessions/{session_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let actions = history["actions"].as_array().unwrap();
    assert_eq!(actions.len(), 3);
    assert_eq!(actions[0]["action_type"], "task_delegation");
    assert_eq!(actions[2]["action_type"], "task_audit");
    assert_eq!(actions[2]["task_id"], task_ids[0].as_str());

    let (status, trail) = send(
        &app,
        Method::GET,
        &format!("/tasks/{}/actions", task_ids[0]),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let trail = trail.as_array().unwrap();
    assert_eq!(trail.len(), 2);
    assert_eq!(trail[0]["action_type"], "task_delegation");
    assert_eq!(trail[1]["action_type"], "task_audit");

    let (status, recent) = send(
        &app,
        Method::GET,
        &format!("/sessions/{session_id}/actions?limit=1"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let recent = recent.as_array().unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0]["action_type"], "task_audit");

    let (_, all) = send(
        &app,
        Method::GET,
        &format!("/sessions/{session_id}/actions"),
        None,
    )
    .await;
    assert_eq!(all.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_session_routes_404_for_unknown_session() {
    let app = create_router(test_state().await);

    let (status, _) = send(&app, Method::GET, "/sessions/ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::GET, "/sessions/ghost/actions", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::POST,
        "/sessions/ghost/delegations",
        Some(json!({"description": "d", "task_type": "t", "target_role": "r"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::POST,
        "/sessions/ghost/actions",
        Some(json!({"description": "hello"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_child_session_with_missing_parent() {
    let app = create_router(test_state().await);

    let (status, created) = send(
        &app,
        Method::POST,
        "/sessions",
        Some(json!({"platform": "openai", "role": "executor", "parent_session_id": "gone"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["parent_missing"], true);
    assert_eq!(created["session"]["parent_session_id"], "gone");
}

#[tokio::test]
async fn test_record_action_defaults_to_agent_response() {
    let app = create_router(test_state().await);
    let (_, created) = send(
        &app,
        Method::POST,
        "/sessions",
        Some(json!({"platform": "claude_code", "role": "executor"})),
    )
    .await;
    let session_id = created["session"]["session_id"].as_str().unwrap();

    let (status, action) = send(
        &app,
        Method::POST,
        &format!("/sessions/{session_id}/actions"),
        Some(json!({"description": "Finished the survey", "execution_time_ms": 1500})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(action["action_type"], "agent_response");
    assert_eq!(action["success"], true);
    assert_eq!(action["execution_time_ms"], 1500);
    assert_eq!(action["session_id"], session_id);
}
