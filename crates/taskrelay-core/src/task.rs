//! Task records and the requests that create and mutate them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{CoreError, SessionId, TaskId, TaskStatus, WorkerId};

/// Default wall-clock budget for one execution.
pub const DEFAULT_TIMEOUT_SECONDS: u32 = 300;

/// Default priority for new tasks.
pub const DEFAULT_PRIORITY: u8 = 5;

/// Default retry budget for new tasks.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// A Task represents one unit of delegated work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: TaskId,

    /// Session that created the task, if any.
    pub session_id: Option<SessionId>,

    /// Free-form classification used for routing.
    pub task_type: String,

    /// The work payload handed to the executor.
    pub description: String,

    /// Priority 1-10, 10 highest. Stored, not used for claim ordering.
    pub priority: u8,

    /// Current task status.
    pub status: TaskStatus,

    /// Role the task was delegated to.
    pub assigned_to_role: Option<String>,

    /// Worker holding the task while running.
    pub assigned_worker_id: Option<WorkerId>,

    /// Advisory dependencies; never enforced by the queue.
    pub depends_on: Vec<TaskId>,

    /// Extra context for the executor.
    pub required_context: Value,

    /// Hard execution timeout.
    pub timeout_seconds: u32,

    pub max_retries: u32,
    pub retry_count: u32,

    /// Progress percentage, 0-100.
    pub progress: u8,

    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    /// Last lease renewal by the assigned worker.
    pub heartbeat_at: Option<DateTime<Utc>>,

    /// Result or error detail.
    pub output_data: Option<Value>,

    pub error_message: Option<String>,
}

impl Task {
    /// Wall-clock time between start and completion, if both are known.
    pub fn execution_time_ms(&self) -> Option<i64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds().max(0)),
            _ => None,
        }
    }
}

/// Parameters for creating a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub session_id: Option<SessionId>,
    pub task_type: String,
    pub description: String,
    pub priority: u8,
    pub assigned_to_role: Option<String>,
    pub depends_on: Vec<TaskId>,
    pub required_context: Value,
    pub timeout_seconds: u32,
    pub max_retries: u32,
}

impl NewTask {
    /// Create task parameters with defaults for everything but type and payload.
    pub fn new(task_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            session_id: None,
            task_type: task_type.into(),
            description: description.into(),
            priority: DEFAULT_PRIORITY,
            assigned_to_role: None,
            depends_on: Vec::new(),
            required_context: Value::Object(Default::default()),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Builder method to link the task to its creating session.
    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Builder method to set the priority.
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Builder method to set the target role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.assigned_to_role = Some(role.into());
        self
    }

    /// Builder method to set advisory dependencies.
    pub fn with_dependencies(mut self, depends_on: Vec<TaskId>) -> Self {
        self.depends_on = depends_on;
        self
    }

    /// Builder method to attach context for the executor.
    pub fn with_context(mut self, context: Value) -> Self {
        self.required_context = context;
        self
    }

    /// Builder method to set the execution timeout.
    pub fn with_timeout(mut self, seconds: u32) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Builder method to set the retry budget.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Check the invariants a new task must satisfy.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.task_type.trim().is_empty() {
            return Err(CoreError::InvalidInput("task_type is required".to_string()));
        }
        if self.description.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "description is required".to_string(),
            ));
        }
        if !(1..=10).contains(&self.priority) {
            return Err(CoreError::InvalidInput(format!(
                "priority must be between 1 and 10, got {}",
                self.priority
            )));
        }
        if self.timeout_seconds == 0 {
            return Err(CoreError::InvalidInput(
                "timeout_seconds must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Materialize a pending task.
    pub fn into_task(self) -> Task {
        Task {
            id: TaskId::generate(),
            session_id: self.session_id,
            task_type: self.task_type,
            description: self.description,
            priority: self.priority,
            status: TaskStatus::Pending,
            assigned_to_role: self.assigned_to_role,
            assigned_worker_id: None,
            depends_on: self.depends_on,
            required_context: self.required_context,
            timeout_seconds: self.timeout_seconds,
            max_retries: self.max_retries,
            retry_count: 0,
            progress: 0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            heartbeat_at: None,
            output_data: None,
            error_message: None,
        }
    }
}

/// A partial status update.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskUpdate {
    pub status: TaskStatus,
    pub progress: Option<u8>,
    pub output_data: Option<Value>,
    pub error_message: Option<String>,
    /// When set, only apply while the task is running under this worker.
    pub worker: Option<WorkerId>,
}

impl TaskUpdate {
    /// Update to the given status with nothing else changed.
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status,
            progress: None,
            output_data: None,
            error_message: None,
            worker: None,
        }
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress.min(100));
        self
    }

    pub fn with_output(mut self, output: Value) -> Self {
        self.output_data = Some(output);
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Guard the update on the task still being held by `worker`.
    pub fn held_by(mut self, worker: WorkerId) -> Self {
        self.worker = Some(worker);
        self
    }

    /// Progress to persist: explicit value, or 100 on completion.
    pub fn effective_progress(&self) -> Option<u8> {
        match (self.progress, self.status) {
            (Some(p), _) => Some(p),
            (None, TaskStatus::Completed) => Some(100),
            (None, _) => None,
        }
    }
}

/// Filter for task listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub session_id: Option<SessionId>,
    pub limit: Option<u32>,
}

impl TaskFilter {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 1000;

    /// Limit to apply, clamped to `1..=MAX_LIMIT`.
    pub fn clamped_limit(&self) -> u32 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_defaults() {
        let task = NewTask::new("implementation", "Build feature X").into_task();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, DEFAULT_PRIORITY);
        assert_eq!(task.timeout_seconds, 300);
        assert_eq!(task.retry_count, 0);
        assert!(task.assigned_worker_id.is_none());
    }

    #[test]
    fn test_validate_rejects_out_of_range_priority() {
        assert!(NewTask::new("t", "d").with_priority(0).validate().is_err());
        assert!(NewTask::new("t", "d").with_priority(11).validate().is_err());
        assert!(NewTask::new("t", "d").with_priority(10).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_payload() {
        assert!(NewTask::new("t", "   ").validate().is_err());
        assert!(NewTask::new("", "d").validate().is_err());
        assert!(NewTask::new("t", "d").with_timeout(0).validate().is_err());
    }

    #[test]
    fn test_completion_defaults_progress_to_100() {
        let update = TaskUpdate::status(TaskStatus::Completed);
        assert_eq!(update.effective_progress(), Some(100));

        let update = TaskUpdate::status(TaskStatus::Completed).with_progress(80);
        assert_eq!(update.effective_progress(), Some(80));

        let update = TaskUpdate::status(TaskStatus::Failed);
        assert_eq!(update.effective_progress(), None);
    }

    #[test]
    fn test_filter_limit_is_clamped() {
        assert_eq!(TaskFilter::default().clamped_limit(), 20);
        let filter = TaskFilter {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(filter.clamped_limit(), 1);
        let filter = TaskFilter {
            limit: Some(50_000),
            ..Default::default()
        };
        assert_eq!(filter.clamped_limit(), 1000);
    }
}
