//! Append-only audit log.

use std::sync::Arc;

use tracing::debug;

use taskrelay_core::{Action, SessionId, TaskId};

use crate::store::{ActionFilter, Store};
use crate::StoreError;

/// Writes and reads [`Action`] records. There is no update or delete.
#[derive(Clone)]
pub struct AuditLog {
    store: Arc<dyn Store>,
}

impl AuditLog {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Persist one action and hand it back.
    pub async fn record(&self, action: Action) -> Result<Action, StoreError> {
        self.store.append_action(&action).await?;
        debug!(
            action_id = %action.id,
            session_id = %action.session_id,
            action_type = %action.action_type,
            success = action.success,
            "Action recorded"
        );
        Ok(action)
    }

    /// All actions of a session, oldest first.
    pub async fn for_session(&self, session_id: &SessionId) -> Result<Vec<Action>, StoreError> {
        self.store
            .list_actions(&ActionFilter::for_session(session_id.clone()))
            .await
    }

    /// The `limit` most recent actions of a session, oldest first.
    pub async fn recent_for_session(
        &self,
        session_id: &SessionId,
        limit: u32,
    ) -> Result<Vec<Action>, StoreError> {
        self.store
            .list_actions(&ActionFilter::for_session(session_id.clone()).most_recent(limit))
            .await
    }

    /// All actions referencing a task, oldest first.
    pub async fn for_task(&self, task_id: &TaskId) -> Result<Vec<Action>, StoreError> {
        self.store
            .list_actions(&ActionFilter::for_task(task_id.clone()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SqliteStore;
    use serde_json::json;
    use taskrelay_core::action_kinds;

    #[tokio::test]
    async fn test_records_are_readable_by_session_and_task() {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        let log = AuditLog::new(Arc::new(store));
        let session = SessionId::new("claude_code_planner_1");
        let task = TaskId::new("t1");

        log.record(
            Action::new(session.clone(), action_kinds::TASK_DELEGATION, "delegated")
                .for_task(task.clone())
                .with_input(json!({"task_type": "impl"})),
        )
        .await
        .unwrap();
        log.record(
            Action::new(session.clone(), action_kinds::AGENT_RESPONSE, "answered")
                .with_success(false)
                .with_execution_time_ms(120),
        )
        .await
        .unwrap();

        let by_session = log.for_session(&session).await.unwrap();
        assert_eq!(by_session.len(), 2);
        assert_eq!(by_session[0].action_type, "task_delegation");
        assert_eq!(by_session[0].input_data["task_type"], "impl");
        assert!(!by_session[1].success);
        assert_eq!(by_session[1].execution_time_ms, Some(120));

        let by_task = log.for_task(&task).await.unwrap();
        assert_eq!(by_task.len(), 1);
        assert_eq!(by_task[0].task_id, Some(task));

        let recent = log.recent_for_session(&session, 1).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].action_type, "agent_response");
    }
}
