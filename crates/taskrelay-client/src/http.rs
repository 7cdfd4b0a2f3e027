//! HTTP client for REST endpoints.

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use taskrelay_api::{
    ActionResponse, AuditTaskRequest, AuditTaskResponse, CancelTaskResponse,
    CreateSessionRequest, CreateSessionResponse, CreateTaskRequest, DashboardResponse,
    DelegateTaskRequest, DelegateTaskResponse, ErrorResponse, HealthResponse, ListActionsQuery,
    ListTasksQuery, RecordActionRequest, SessionHistoryResponse, SessionSummaryResponse, TaskResponse,
};
use taskrelay_core::{SessionId, TaskId};

use crate::error::ClientError;

/// HTTP client for REST API endpoints.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    base_url: String,
}

impl HttpClient {
    /// Create a new HTTP client.
    pub fn new(base_url: &str) -> Self {
        Self {
            inner: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ========================================================================
    // Tasks
    // ========================================================================

    pub async fn create_task(&self, req: &CreateTaskRequest) -> Result<TaskResponse, ClientError> {
        self.post_json("/tasks", req).await
    }

    pub async fn get_task(&self, id: &TaskId) -> Result<TaskResponse, ClientError> {
        self.get_json(&format!("/tasks/{id}")).await
    }

    /// List tasks, newest first.
    pub async fn list_tasks(&self, query: &ListTasksQuery) -> Result<Vec<TaskResponse>, ClientError> {
        let url = self.url("/tasks");
        debug!(url = %url, query = ?query, "GET request");

        let response = self.inner.get(&url).query(query).send().await?;
        decode(response, "/tasks").await
    }

    /// Cancel a pending task. Non-pending tasks are left unchanged.
    pub async fn cancel_task(&self, id: &TaskId) -> Result<CancelTaskResponse, ClientError> {
        let path = format!("/tasks/{id}");
        let url = self.url(&path);
        debug!(url = %url, "DELETE request");

        let response = self.inner.delete(&url).send().await?;
        decode(response, &path).await
    }

    /// Audit-log entries that reference a task, oldest first.
    pub async fn task_actions(&self, id: &TaskId) -> Result<Vec<ActionResponse>, ClientError> {
        self.get_json(&format!("/tasks/{id}/actions")).await
    }

    pub async fn dashboard(&self) -> Result<DashboardResponse, ClientError> {
        self.get_json("/dashboard").await
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    pub async fn create_session(
        &self,
        req: &CreateSessionRequest,
    ) -> Result<CreateSessionResponse, ClientError> {
        self.post_json("/sessions", req).await
    }

    pub async fn get_session(&self, id: &SessionId) -> Result<SessionHistoryResponse, ClientError> {
        self.get_json(&format!("/sessions/{id}")).await
    }

    pub async fn delegate_task(
        &self,
        session_id: &SessionId,
        req: &DelegateTaskRequest,
    ) -> Result<DelegateTaskResponse, ClientError> {
        self.post_json(&format!("/sessions/{session_id}/delegations"), req)
            .await
    }

    pub async fn audit_task(
        &self,
        session_id: &SessionId,
        req: &AuditTaskRequest,
    ) -> Result<AuditTaskResponse, ClientError> {
        self.post_json(&format!("/sessions/{session_id}/audits"), req)
            .await
    }

    pub async fn session_summary(
        &self,
        session_id: &SessionId,
    ) -> Result<SessionSummaryResponse, ClientError> {
        self.get_json(&format!("/sessions/{session_id}/summary"))
            .await
    }

    /// A session's actions, oldest first. `limit` keeps the most recent entries.
    pub async fn session_actions(
        &self,
        session_id: &SessionId,
        limit: Option<u32>,
    ) -> Result<Vec<ActionResponse>, ClientError> {
        let path = format!("/sessions/{session_id}/actions");
        let url = self.url(&path);
        debug!(url = %url, limit = ?limit, "GET request");

        let response = self
            .inner
            .get(&url)
            .query(&ListActionsQuery { limit })
            .send()
            .await?;
        decode(response, &path).await
    }

    pub async fn record_action(
        &self,
        session_id: &SessionId,
        req: &RecordActionRequest,
    ) -> Result<ActionResponse, ClientError> {
        self.post_json(&format!("/sessions/{session_id}/actions"), req)
            .await
    }

    // ========================================================================
    // Observability
    // ========================================================================

    /// Check if the control plane is healthy.
    ///
    /// An unhealthy server answers 503 with a body; that is returned as a
    /// response, not an error.
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let url = self.url("/health");
        debug!(url = %url, "Checking health");

        let response = self.inner.get(&url).send().await?;
        if response.status() == StatusCode::SERVICE_UNAVAILABLE {
            return response
                .json()
                .await
                .map_err(|e| ClientError::Serialization(e.to_string()));
        }
        decode(response, "/health").await
    }

    /// Prometheus metrics text.
    pub async fn metrics(&self) -> Result<String, ClientError> {
        let url = self.url("/metrics");
        debug!(url = %url, "GET request");

        let response = self.inner.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response, "/metrics").await);
        }
        Ok(response.text().await?)
    }

    /// Get JSON from an endpoint.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.url(path);
        debug!(url = %url, "GET request");

        let response = self.inner.get(&url).send().await?;
        decode(response, path).await
    }

    /// Post a JSON body and decode the JSON reply.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        debug!(url = %url, "POST request");

        let response = self.inner.post(&url).json(body).send().await?;
        decode(response, path).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response, path: &str) -> Result<T, ClientError> {
    if !response.status().is_success() {
        return Err(api_error(response, path).await);
    }
    response
        .json()
        .await
        .map_err(|e| ClientError::Serialization(e.to_string()))
}

/// Turn a non-success response into an error, keeping the server's message.
async fn api_error(response: Response, path: &str) -> ClientError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.error)
        .unwrap_or_else(|_| if body.is_empty() { path.to_string() } else { body });

    if status == StatusCode::NOT_FOUND {
        ClientError::NotFound(message)
    } else {
        ClientError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;
    use taskrelay_control_plane::http::create_router;
    use taskrelay_control_plane::{AppState, Config, StaticContext};
    use taskrelay_core::TaskStatus;
    use taskrelay_store::SqliteStore;

    async fn spawn_server() -> HttpClient {
        let store = Arc::new(SqliteStore::connect("sqlite::memory:").await.unwrap());
        let state = AppState::new(store, Arc::new(StaticContext(json!({}))), &Config::default());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, create_router(state)).await.unwrap();
        });
        HttpClient::new(&format!("http://{addr}/"))
    }

    #[tokio::test]
    async fn test_task_round_trip_through_server() {
        let client = spawn_server().await;
        assert!(!client.base_url().ends_with('/'));

        let created = client
            .create_task(&CreateTaskRequest::new("research", "Read the logs"))
            .await
            .unwrap();
        assert_eq!(created.status, TaskStatus::Pending);

        let fetched = client.get_task(&created.task_id).await.unwrap();
        assert_eq!(fetched.description, "Read the logs");

        let listed = client
            .list_tasks(&ListTasksQuery {
                status: Some("pending".into()),
                ..ListTasksQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);

        let cancelled = client.cancel_task(&created.task_id).await.unwrap();
        assert!(cancelled.cancelled);
        assert_eq!(cancelled.status, TaskStatus::Cancelled);

        let dashboard = client.dashboard().await.unwrap();
        assert_eq!(dashboard.queued, 0);

        assert!(client.health().await.unwrap().is_healthy());
        assert!(client.metrics().await.unwrap().contains("taskrelay_tasks"));
    }

    #[tokio::test]
    async fn test_errors_carry_server_message() {
        let client = spawn_server().await;

        let err = client.get_task(&TaskId::new("missing")).await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound(ref m) if m.contains("missing")));

        let mut req = CreateTaskRequest::new("research", "x");
        req.priority = 42;
        let err = client.create_task(&req).await.unwrap_err();
        match err {
            ClientError::Api { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("priority"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_session_workflow() {
        let client = spawn_server().await;

        let created = client
            .create_session(&CreateSessionRequest {
                platform: "claude_code".into(),
                role: "planner".into(),
                parent_session_id: None,
            })
            .await
            .unwrap();
        let session_id = created.session.session_id;

        let delegated = client
            .delegate_task(
                &session_id,
                &DelegateTaskRequest {
                    description: "Write the release notes".into(),
                    task_type: "docs".into(),
                    target_role: "executor".into(),
                    priority: 5,
                    depends_on: Vec::new(),
                    context: json!({}),
                },
            )
            .await
            .unwrap();

        let audited = client
            .audit_task(
                &session_id,
                &AuditTaskRequest {
                    task_id: delegated.task_id.clone(),
                    verdict: "rejected".into(),
                    notes: "missing changelog".into(),
                    approved: false,
                },
            )
            .await
            .unwrap();
        assert!(audited.applied);

        let summary = client.session_summary(&session_id).await.unwrap();
        assert_eq!(summary.total_tasks, 1);
        assert_eq!(summary.task_counts_by_status["blocked"], 1);

        let history = client.get_session(&session_id).await.unwrap();
        assert_eq!(history.actions.len(), 2);

        let trail = client.task_actions(&delegated.task_id).await.unwrap();
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[1].action_type, "task_audit");

        let latest = client.session_actions(&session_id, Some(1)).await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].action_type, "task_audit");
    }
}
