//! Request and response bodies of the HTTP API.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use taskrelay_core::task::{DEFAULT_MAX_RETRIES, DEFAULT_PRIORITY, DEFAULT_TIMEOUT_SECONDS};
use taskrelay_core::{
    ActionId, CoreError, NewTask, SessionId, SessionStatus, TaskId, TaskStatus, WorkerId,
};

/// Accepted range for `priority`.
pub const PRIORITY_RANGE: std::ops::RangeInclusive<u8> = 1..=10;
/// Accepted range for `timeout_seconds` on the wire.
pub const TIMEOUT_RANGE: std::ops::RangeInclusive<u32> = 10..=3600;
/// Accepted range for `max_retries` on the wire.
pub const MAX_RETRIES_RANGE: std::ops::RangeInclusive<u32> = 0..=5;

fn default_priority() -> u8 {
    DEFAULT_PRIORITY
}

fn default_timeout() -> u32 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_action_type() -> String {
    taskrelay_core::action_kinds::AGENT_RESPONSE.to_string()
}

fn default_true() -> bool {
    true
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

// ============================================================================
// Tasks
// ============================================================================

/// Body of `POST /tasks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub task_type: String,
    pub description: String,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to_role: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<TaskId>,
    #[serde(default = "empty_object")]
    pub required_context: Value,
}

impl CreateTaskRequest {
    pub fn new(task_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            task_type: task_type.into(),
            description: description.into(),
            priority: DEFAULT_PRIORITY,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            max_retries: DEFAULT_MAX_RETRIES,
            session_id: None,
            assigned_to_role: None,
            depends_on: Vec::new(),
            required_context: empty_object(),
        }
    }

    /// Check the wire-level bounds.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !PRIORITY_RANGE.contains(&self.priority) {
            return Err(CoreError::InvalidInput(format!(
                "priority must be between 1 and 10, got {}",
                self.priority
            )));
        }
        if !TIMEOUT_RANGE.contains(&self.timeout_seconds) {
            return Err(CoreError::InvalidInput(format!(
                "timeout_seconds must be between 10 and 3600, got {}",
                self.timeout_seconds
            )));
        }
        if !MAX_RETRIES_RANGE.contains(&self.max_retries) {
            return Err(CoreError::InvalidInput(format!(
                "max_retries must be between 0 and 5, got {}",
                self.max_retries
            )));
        }
        Ok(())
    }

    /// Validate and convert into queue parameters.
    pub fn into_new_task(self) -> Result<NewTask, CoreError> {
        self.validate()?;
        let mut task = NewTask::new(self.task_type, self.description)
            .with_priority(self.priority)
            .with_timeout(self.timeout_seconds)
            .with_max_retries(self.max_retries)
            .with_dependencies(self.depends_on)
            .with_context(self.required_context);
        if let Some(session_id) = self.session_id {
            task = task.with_session(session_id);
        }
        if let Some(role) = self.assigned_to_role {
            task = task.with_role(role);
        }
        Ok(task)
    }
}

/// A task as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub task_id: TaskId,
    pub session_id: Option<SessionId>,
    pub task_type: String,
    pub description: String,
    pub priority: u8,
    pub status: TaskStatus,
    pub assigned_to_role: Option<String>,
    pub assigned_worker_id: Option<WorkerId>,
    pub depends_on: Vec<TaskId>,
    pub required_context: Value,
    pub timeout_seconds: u32,
    pub max_retries: u32,
    pub retry_count: u32,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub heartbeat_at: Option<DateTime<Utc>>,
    pub execution_time_ms: Option<i64>,
    pub output_data: Option<Value>,
    pub error_message: Option<String>,
}

/// Query string of `GET /tasks`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListTasksQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Body of `DELETE /tasks/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelTaskResponse {
    pub task_id: TaskId,
    /// False when the task was no longer pending.
    pub cancelled: bool,
    pub status: TaskStatus,
}

// ============================================================================
// Operations
// ============================================================================

/// Body of `GET /dashboard`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub queued: u64,
    pub running: u64,
    pub completed_last_hour: u64,
    pub failed_last_hour: u64,
    pub total_completed: u64,
    pub avg_execution_time_sec: Option<f64>,
    pub generated_at: DateTime<Utc>,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" or "unhealthy".
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            error: None,
        }
    }

    pub fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            status: "unhealthy".to_string(),
            error: Some(error.into()),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Error body returned with every non-2xx status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Sessions
// ============================================================================

/// Body of `POST /sessions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub platform: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_session_id: Option<SessionId>,
}

/// A session as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: SessionId,
    pub agent_platform: String,
    pub agent_role: String,
    pub parent_session_id: Option<SessionId>,
    pub landing_context: Value,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

/// Response of `POST /sessions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session: SessionResponse,
    pub landing_brief: String,
    /// True when the requested parent session does not exist.
    pub parent_missing: bool,
}

/// Response of `GET /sessions/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHistoryResponse {
    pub session: SessionResponse,
    pub tasks: Vec<TaskResponse>,
    pub actions: Vec<ActionResponse>,
}

/// Body of `POST /sessions/{id}/delegations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegateTaskRequest {
    pub description: String,
    pub task_type: String,
    pub target_role: String,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<TaskId>,
    #[serde(default = "empty_object")]
    pub context: Value,
}

/// Response of `POST /sessions/{id}/delegations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegateTaskResponse {
    pub task_id: TaskId,
}

/// Body of `POST /sessions/{id}/audits`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditTaskRequest {
    pub task_id: TaskId,
    pub verdict: String,
    #[serde(default)]
    pub notes: String,
    pub approved: bool,
}

/// Response of `POST /sessions/{id}/audits`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditTaskResponse {
    pub task_id: TaskId,
    /// Whether the task changed status.
    pub applied: bool,
}

/// Response of `GET /sessions/{id}/summary`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummaryResponse {
    pub session_id: SessionId,
    pub total_tasks: u64,
    pub task_counts_by_status: BTreeMap<String, u64>,
    pub task_counts_by_role: BTreeMap<String, u64>,
    pub action_count: u64,
    pub recent_tasks: Vec<TaskResponse>,
    pub recent_actions: Vec<ActionResponse>,
}

// ============================================================================
// Actions
// ============================================================================

/// Body of `POST /sessions/{id}/actions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordActionRequest {
    #[serde(default = "default_action_type")]
    pub action_type: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(default = "empty_object")]
    pub input_data: Value,
    #[serde(default = "empty_object")]
    pub output_data: Value,
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<i64>,
}

/// Query string of `GET /sessions/{id}/actions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListActionsQuery {
    /// Keep only the most recent N entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// An audit-log entry as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub action_id: ActionId,
    pub session_id: SessionId,
    pub task_id: Option<TaskId>,
    pub action_type: String,
    pub description: String,
    pub input_data: Value,
    pub output_data: Value,
    pub success: bool,
    pub execution_time_ms: Option<i64>,
    pub executed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_request_defaults() {
        let req: CreateTaskRequest =
            serde_json::from_value(json!({"task_type": "impl", "description": "do it"})).unwrap();
        assert_eq!(req.priority, 5);
        assert_eq!(req.timeout_seconds, 300);
        assert_eq!(req.max_retries, 3);
        assert!(req.required_context.is_object());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_create_request_bounds() {
        let mut req = CreateTaskRequest::new("impl", "x");
        req.timeout_seconds = 5;
        assert!(req.validate().is_err());

        let mut req = CreateTaskRequest::new("impl", "x");
        req.max_retries = 6;
        assert!(req.validate().is_err());

        let mut req = CreateTaskRequest::new("impl", "x");
        req.priority = 0;
        assert!(req.into_new_task().is_err());
    }

    #[test]
    fn test_record_action_defaults_to_agent_response() {
        let req: RecordActionRequest =
            serde_json::from_value(json!({"description": "answered"})).unwrap();
        assert_eq!(req.action_type, "agent_response");
        assert!(req.success);
        assert!(req.task_id.is_none());
    }

    #[test]
    fn test_health_response_omits_empty_error() {
        let body = serde_json::to_value(HealthResponse::healthy()).unwrap();
        assert_eq!(body, json!({"status": "healthy"}));
    }
}
