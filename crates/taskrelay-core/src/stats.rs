//! Aggregate views over the queue and over sessions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Action, Session, SessionId, Task, TaskStatus};

/// Queue counters for the operator dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    /// Tasks waiting to be claimed.
    pub queued: u64,
    /// Tasks currently held by a worker.
    pub running: u64,
    pub completed_last_hour: u64,
    pub failed_last_hour: u64,
    pub total_completed: u64,
    /// Mean `completed_at - started_at` over tasks completed in the last hour.
    pub avg_execution_time_sec: Option<f64>,
}

/// Row counts across the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCounts {
    pub sessions: u64,
    pub tasks: u64,
    pub actions: u64,
}

/// Everything recorded for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHistory {
    pub session: Session,
    /// Newest first.
    pub tasks: Vec<Task>,
    /// In `executed_at` order.
    pub actions: Vec<Action>,
}

/// Read-only aggregation over a session's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub total_tasks: u64,
    pub task_counts_by_status: BTreeMap<TaskStatus, u64>,
    /// Tasks without a target role are counted under [`UNASSIGNED_ROLE`].
    pub task_counts_by_role: BTreeMap<String, u64>,
    pub action_count: u64,
    pub recent_tasks: Vec<Task>,
    pub recent_actions: Vec<Action>,
}

/// Role key for tasks delegated without a target role.
pub const UNASSIGNED_ROLE: &str = "unassigned";

impl SessionSummary {
    /// Number of tasks and actions kept in the `recent_*` lists.
    pub const RECENT: usize = 5;

    /// Summarise a session history.
    pub fn from_history(history: &SessionHistory) -> Self {
        let mut task_counts_by_status = BTreeMap::new();
        let mut task_counts_by_role = BTreeMap::new();
        for task in &history.tasks {
            *task_counts_by_status.entry(task.status).or_insert(0) += 1;
            let role = task
                .assigned_to_role
                .clone()
                .unwrap_or_else(|| UNASSIGNED_ROLE.to_string());
            *task_counts_by_role.entry(role).or_insert(0) += 1;
        }

        let recent_actions = history
            .actions
            .iter()
            .rev()
            .take(Self::RECENT)
            .cloned()
            .collect();

        Self {
            session_id: history.session.id.clone(),
            total_tasks: history.tasks.len() as u64,
            task_counts_by_status,
            task_counts_by_role,
            action_count: history.actions.len() as u64,
            recent_tasks: history.tasks.iter().take(Self::RECENT).cloned().collect(),
            recent_actions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NewTask;
    use serde_json::json;

    #[test]
    fn test_summary_counts_by_status_and_role() {
        let session = Session::new("claude_code", "planner", None, json!({}));
        let mut done = NewTask::new("impl", "a")
            .with_role("executor")
            .into_task();
        done.status = TaskStatus::Completed;
        let pending = NewTask::new("impl", "b").with_role("executor").into_task();
        let unrouted = NewTask::new("review", "c").into_task();

        let actions = (0..7)
            .map(|i| Action::new(session.id.clone(), "query", format!("q{i}")))
            .collect();
        let history = SessionHistory {
            session,
            tasks: vec![unrouted, pending, done],
            actions,
        };

        let summary = SessionSummary::from_history(&history);
        assert_eq!(summary.total_tasks, 3);
        assert_eq!(summary.task_counts_by_status[&TaskStatus::Pending], 2);
        assert_eq!(summary.task_counts_by_status[&TaskStatus::Completed], 1);
        assert_eq!(summary.task_counts_by_role["executor"], 2);
        assert_eq!(summary.task_counts_by_role[UNASSIGNED_ROLE], 1);
        assert_eq!(summary.action_count, 7);
        assert_eq!(summary.recent_actions.len(), 5);
        // Most recent first.
        assert_eq!(summary.recent_actions[0].description, "q6");
    }
}
