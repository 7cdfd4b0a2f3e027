//! Append-only audit log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ActionId, SessionId, TaskId};

/// Well-known action types. The field itself stays an open string.
pub mod kinds {
    pub const TASK_DELEGATION: &str = "task_delegation";
    pub const TASK_AUDIT: &str = "task_audit";
    pub const AGENT_RESPONSE: &str = "agent_response";
    pub const QUERY: &str = "query";
    pub const WRITE: &str = "write";
    pub const COMMAND: &str = "command";
}

/// One audit-log entry. Never mutated after it is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub session_id: SessionId,

    /// Absent for session-level actions.
    pub task_id: Option<TaskId>,

    pub action_type: String,
    pub description: String,
    pub input_data: Value,
    pub output_data: Value,
    pub success: bool,
    pub execution_time_ms: Option<i64>,
    pub executed_at: DateTime<Utc>,
}

impl Action {
    /// Create a successful action with empty payloads.
    pub fn new(
        session_id: SessionId,
        action_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: ActionId::generate(),
            session_id,
            task_id: None,
            action_type: action_type.into(),
            description: description.into(),
            input_data: Value::Object(Default::default()),
            output_data: Value::Object(Default::default()),
            success: true,
            execution_time_ms: None,
            executed_at: Utc::now(),
        }
    }

    pub fn for_task(mut self, task_id: TaskId) -> Self {
        self.task_id = Some(task_id);
        self
    }

    pub fn with_input(mut self, input: Value) -> Self {
        self.input_data = input;
        self
    }

    pub fn with_output(mut self, output: Value) -> Self {
        self.output_data = output;
        self
    }

    pub fn with_success(mut self, success: bool) -> Self {
        self.success = success;
        self
    }

    pub fn with_execution_time_ms(mut self, ms: i64) -> Self {
        self.execution_time_ms = Some(ms);
        self
    }
}
