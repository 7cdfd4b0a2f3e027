//! Converters between domain types and wire types.

use chrono::{DateTime, Utc};
use taskrelay_core::{Action, Dashboard, Session, SessionHistory, SessionSummary, Task};

use crate::types::{
    ActionResponse, DashboardResponse, SessionHistoryResponse, SessionResponse,
    SessionSummaryResponse, TaskResponse,
};

// ============================================================================
// Task conversions
// ============================================================================

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        let execution_time_ms = task.execution_time_ms();
        Self {
            task_id: task.id,
            session_id: task.session_id,
            task_type: task.task_type,
            description: task.description,
            priority: task.priority,
            status: task.status,
            assigned_to_role: task.assigned_to_role,
            assigned_worker_id: task.assigned_worker_id,
            depends_on: task.depends_on,
            required_context: task.required_context,
            timeout_seconds: task.timeout_seconds,
            max_retries: task.max_retries,
            retry_count: task.retry_count,
            progress: task.progress,
            created_at: task.created_at,
            started_at: task.started_at,
            completed_at: task.completed_at,
            heartbeat_at: task.heartbeat_at,
            execution_time_ms,
            output_data: task.output_data,
            error_message: task.error_message,
        }
    }
}

// ============================================================================
// Session conversions
// ============================================================================

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            session_id: session.id,
            agent_platform: session.agent_platform,
            agent_role: session.agent_role,
            parent_session_id: session.parent_session_id,
            landing_context: session.landing_context,
            status: session.status,
            created_at: session.created_at,
            last_active: session.last_active,
        }
    }
}

impl From<SessionHistory> for SessionHistoryResponse {
    fn from(history: SessionHistory) -> Self {
        Self {
            session: history.session.into(),
            tasks: history.tasks.into_iter().map(Into::into).collect(),
            actions: history.actions.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<SessionSummary> for SessionSummaryResponse {
    fn from(summary: SessionSummary) -> Self {
        Self {
            session_id: summary.session_id,
            total_tasks: summary.total_tasks,
            task_counts_by_status: summary
                .task_counts_by_status
                .into_iter()
                .map(|(status, n)| (status.as_str().to_string(), n))
                .collect(),
            task_counts_by_role: summary.task_counts_by_role,
            action_count: summary.action_count,
            recent_tasks: summary.recent_tasks.into_iter().map(Into::into).collect(),
            recent_actions: summary.recent_actions.into_iter().map(Into::into).collect(),
        }
    }
}

// ============================================================================
// Action conversions
// ============================================================================

impl From<Action> for ActionResponse {
    fn from(action: Action) -> Self {
        Self {
            action_id: action.id,
            session_id: action.session_id,
            task_id: action.task_id,
            action_type: action.action_type,
            description: action.description,
            input_data: action.input_data,
            output_data: action.output_data,
            success: action.success,
            execution_time_ms: action.execution_time_ms,
            executed_at: action.executed_at,
        }
    }
}

// ============================================================================
// Dashboard conversions
// ============================================================================

impl DashboardResponse {
    /// Stamp queue counters with the time they were read.
    pub fn new(dashboard: Dashboard, generated_at: DateTime<Utc>) -> Self {
        Self {
            queued: dashboard.queued,
            running: dashboard.running,
            completed_last_hour: dashboard.completed_last_hour,
            failed_last_hour: dashboard.failed_last_hour,
            total_completed: dashboard.total_completed,
            avg_execution_time_sec: dashboard.avg_execution_time_sec,
            generated_at,
        }
    }
}
