//! Planner facade: one planning session that delegates tasks and audits results.

use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

use taskrelay_core::{
    action_kinds, Action, AuditVerdict, NewTask, OutputDocument, Session, SessionId,
    SessionSummary, TaskId, TaskStatus, TaskUpdate,
};
use taskrelay_store::{QueueError, StoreError, TaskQueue};

use crate::session::{CreatedSession, SessionError, SessionManager};

/// Role tag used for planner sessions.
pub const PLANNER_ROLE: &str = "planner";

/// Default platform tag for planner sessions.
pub const DEFAULT_PLATFORM: &str = "claude_code";

/// Errors from planner operations.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("No active planner session")]
    NoActiveSession,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A task handed from the planner to another role.
#[derive(Debug, Clone)]
pub struct Delegation {
    pub description: String,
    pub task_type: String,
    pub target_role: String,
    pub priority: u8,
    pub depends_on: Vec<TaskId>,
    pub context: Value,
}

impl Delegation {
    pub fn new(
        description: impl Into<String>,
        task_type: impl Into<String>,
        target_role: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            task_type: task_type.into(),
            target_role: target_role.into(),
            priority: 5,
            depends_on: Vec::new(),
            context: Value::Object(Default::default()),
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_dependencies(mut self, depends_on: Vec<TaskId>) -> Self {
        self.depends_on = depends_on;
        self
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }
}

/// Planner bound to at most one session.
///
/// Every delegation and audit is written to the audit log under that session.
pub struct Planner {
    sessions: SessionManager,
    queue: TaskQueue,
    platform: String,
    session_id: Option<SessionId>,
}

impl Planner {
    pub fn new(sessions: SessionManager, queue: TaskQueue) -> Self {
        Self {
            sessions,
            queue,
            platform: DEFAULT_PLATFORM.to_string(),
            session_id: None,
        }
    }

    /// Platform tag for sessions started by this planner.
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    /// Start a new planner session and bind to it.
    pub async fn start_session(&mut self) -> Result<CreatedSession, PlannerError> {
        let created = self
            .sessions
            .create_session(&self.platform, PLANNER_ROLE, None)
            .await?;
        self.session_id = Some(created.session.id.clone());
        Ok(created)
    }

    /// Bind to an existing session.
    pub async fn attach(&mut self, session_id: &SessionId) -> Result<Session, PlannerError> {
        let session = self.sessions.get_session(session_id).await?;
        self.session_id = Some(session.id.clone());
        Ok(session)
    }

    pub fn session_id(&self) -> Result<&SessionId, PlannerError> {
        self.session_id.as_ref().ok_or(PlannerError::NoActiveSession)
    }

    /// Enqueue a task on behalf of the session and log the delegation.
    pub async fn delegate_task(&self, delegation: Delegation) -> Result<TaskId, PlannerError> {
        let session_id = self.session_id()?.clone();

        let new_task = NewTask::new(&delegation.task_type, &delegation.description)
            .with_session(session_id.clone())
            .with_priority(delegation.priority)
            .with_role(&delegation.target_role)
            .with_dependencies(delegation.depends_on)
            .with_context(delegation.context);
        let task = self.queue.create(new_task).await?;

        let action = Action::new(
            session_id.clone(),
            action_kinds::TASK_DELEGATION,
            format!(
                "Delegated {} task to {}",
                delegation.task_type, delegation.target_role
            ),
        )
        .for_task(task.id.clone())
        .with_input(json!({
            "task_type": delegation.task_type,
            "target_role": delegation.target_role,
            "priority": delegation.priority,
        }))
        .with_output(json!({ "task_id": task.id }));
        self.sessions.record_action(action).await?;

        info!(
            session_id = %session_id,
            task_id = %task.id,
            target_role = %delegation.target_role,
            "Task delegated"
        );
        Ok(task.id)
    }

    /// Record a verdict on a task's result.
    ///
    /// Approval completes the task, rejection blocks it. The status change
    /// only applies to tasks that are not yet terminal; the audit action is
    /// logged either way and the return value says whether it applied.
    pub async fn audit_result(
        &self,
        task_id: &TaskId,
        verdict: &str,
        notes: &str,
        approved: bool,
    ) -> Result<bool, PlannerError> {
        let session_id = self.session_id()?.clone();
        let task = self.queue.get(task_id).await?;

        let target = if approved {
            TaskStatus::Completed
        } else {
            TaskStatus::Blocked
        };
        let document = AuditVerdict {
            verdict: verdict.to_string(),
            notes: notes.to_string(),
            approved,
            auditor: session_id.clone(),
        };

        let update = TaskUpdate::status(target).with_output(document.to_value());
        let (applied, resulting_status) = match self.queue.update_status(task_id, update).await {
            Ok(updated) => (true, updated.status),
            Err(QueueError::InvalidStateTransition { from, .. }) => {
                warn!(
                    task_id = %task_id,
                    status = %from,
                    "Audit not applied, task already terminal"
                );
                (false, from)
            }
            Err(e) => return Err(e.into()),
        };

        let action = Action::new(
            session_id.clone(),
            action_kinds::TASK_AUDIT,
            format!("Audited {} task: {}", task.task_type, verdict),
        )
        .for_task(task_id.clone())
        .with_input(json!({ "verdict": verdict, "approved": approved }))
        .with_output(json!({
            "status": resulting_status,
            "notes": notes,
            "applied": applied,
        }))
        .with_success(applied);
        self.sessions.record_action(action).await?;

        info!(
            session_id = %session_id,
            task_id = %task_id,
            approved,
            applied,
            "Task audited"
        );
        Ok(applied)
    }

    /// Aggregate view of the bound session.
    pub async fn summary(&self) -> Result<SessionSummary, PlannerError> {
        let history = self.sessions.get_session_history(self.session_id()?).await?;
        Ok(SessionSummary::from_history(&history))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StaticContext;
    use std::sync::Arc;
    use taskrelay_core::WorkerId;
    use taskrelay_store::{SqliteStore, Store};

    async fn planner() -> (Planner, TaskQueue, SessionManager) {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::connect("sqlite::memory:").await.unwrap());
        let sessions = SessionManager::new(store.clone(), Arc::new(StaticContext::default()));
        let queue = TaskQueue::new(store);
        (
            Planner::new(sessions.clone(), queue.clone()),
            queue,
            sessions,
        )
    }

    #[tokio::test]
    async fn test_operations_require_a_session() {
        let (planner, _, _) = planner().await;
        assert!(matches!(
            planner
                .delegate_task(Delegation::new("x", "research", "executor"))
                .await,
            Err(PlannerError::NoActiveSession)
        ));
        assert!(matches!(
            planner.summary().await,
            Err(PlannerError::NoActiveSession)
        ));
    }

    #[tokio::test]
    async fn test_start_session_uses_planner_role() {
        let (planner, _, _) = planner().await;
        let mut planner = planner.with_platform("openai");
        let created = planner.start_session().await.unwrap();

        assert_eq!(created.session.agent_role, PLANNER_ROLE);
        assert_eq!(created.session.agent_platform, "openai");
        assert_eq!(planner.session_id().unwrap(), &created.session.id);
    }

    #[tokio::test]
    async fn test_delegate_creates_task_and_logs_action() {
        let (mut planner, queue, sessions) = planner().await;
        let session_id = planner.start_session().await.unwrap().session.id;

        let task_id = planner
            .delegate_task(
                Delegation::new("Benchmark the parser", "research", "executor")
                    .with_priority(8)
                    .with_context(json!({"repo": "parser"})),
            )
            .await
            .unwrap();

        let task = queue.get(&task_id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.session_id, Some(session_id.clone()));
        assert_eq!(task.assigned_to_role.as_deref(), Some("executor"));
        assert_eq!(task.priority, 8);
        assert_eq!(task.required_context["repo"], "parser");

        let history = sessions.get_session_history(&session_id).await.unwrap();
        assert_eq!(history.actions.len(), 1);
        let action = &history.actions[0];
        assert_eq!(action.action_type, action_kinds::TASK_DELEGATION);
        assert_eq!(action.task_id, Some(task_id));
        assert_eq!(action.input_data["target_role"], "executor");
        assert_eq!(action.input_data["priority"], 8);
    }

    #[tokio::test]
    async fn test_invalid_delegation_logs_nothing() {
        let (mut planner, _, sessions) = planner().await;
        let session_id = planner.start_session().await.unwrap().session.id;

        let err = planner
            .delegate_task(Delegation::new("x", "research", "executor").with_priority(11))
            .await
            .unwrap_err();
        assert!(matches!(err, PlannerError::Queue(QueueError::InvalidInput(_))));

        let history = sessions.get_session_history(&session_id).await.unwrap();
        assert!(history.actions.is_empty());
        assert!(history.tasks.is_empty());
    }

    #[tokio::test]
    async fn test_approved_audit_completes_running_task() {
        let (mut planner, queue, _) = planner().await;
        let session_id = planner.start_session().await.unwrap().session.id;
        let task_id = planner
            .delegate_task(Delegation::new("Write docs", "docs", "executor"))
            .await
            .unwrap();
        queue.claim(&WorkerId::new("w1")).await.unwrap().unwrap();

        assert!(planner
            .audit_result(&task_id, "looks good", "ship it", true)
            .await
            .unwrap());

        let task = queue.get(&task_id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        let verdict = AuditVerdict::from_value(task.output_data.as_ref().unwrap()).unwrap();
        assert!(verdict.approved);
        assert_eq!(verdict.auditor, session_id);
    }

    #[tokio::test]
    async fn test_rejected_audit_blocks_pending_task() {
        let (mut planner, queue, _) = planner().await;
        planner.start_session().await.unwrap();
        let task_id = planner
            .delegate_task(Delegation::new("Refactor", "code", "executor"))
            .await
            .unwrap();

        assert!(planner
            .audit_result(&task_id, "wrong approach", "", false)
            .await
            .unwrap());
        assert_eq!(queue.get(&task_id).await.unwrap().status, TaskStatus::Blocked);
    }

    #[tokio::test]
    async fn test_audit_of_terminal_task_is_logged_but_not_applied() {
        let (mut planner, queue, sessions) = planner().await;
        let session_id = planner.start_session().await.unwrap().session.id;
        let task_id = planner
            .delegate_task(Delegation::new("Deploy", "ops", "executor"))
            .await
            .unwrap();
        assert!(queue.cancel(&task_id).await.unwrap());

        assert!(!planner
            .audit_result(&task_id, "late", "", true)
            .await
            .unwrap());
        assert_eq!(
            queue.get(&task_id).await.unwrap().status,
            TaskStatus::Cancelled
        );

        let history = sessions.get_session_history(&session_id).await.unwrap();
        let audit = history
            .actions
            .iter()
            .find(|a| a.action_type == action_kinds::TASK_AUDIT)
            .unwrap();
        assert!(!audit.success);
        assert_eq!(audit.output_data["status"], "cancelled");
    }

    #[tokio::test]
    async fn test_audit_unknown_task() {
        let (mut planner, _, _) = planner().await;
        planner.start_session().await.unwrap();
        let err = planner
            .audit_result(&TaskId::new("missing"), "?", "", true)
            .await
            .unwrap_err();
        assert!(matches!(err, PlannerError::Queue(QueueError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_summary_counts_by_status_and_role() {
        let (mut planner, queue, sessions) = planner().await;
        planner.start_session().await.unwrap();
        for role in ["executor", "executor", "reviewer"] {
            planner
                .delegate_task(Delegation::new("work", "code", role))
                .await
                .unwrap();
        }
        queue.claim(&WorkerId::new("w1")).await.unwrap().unwrap();

        let summary = planner.summary().await.unwrap();
        assert_eq!(summary.total_tasks, 3);
        assert_eq!(summary.task_counts_by_status[&TaskStatus::Pending], 2);
        assert_eq!(summary.task_counts_by_status[&TaskStatus::Running], 1);
        assert_eq!(summary.task_counts_by_role["executor"], 2);
        assert_eq!(summary.task_counts_by_role["reviewer"], 1);
        assert_eq!(summary.action_count, 3);

        let mut other = Planner::new(sessions, queue);
        other.attach(&summary.session_id).await.unwrap();
        assert_eq!(other.summary().await.unwrap().total_tasks, 3);
    }
}
