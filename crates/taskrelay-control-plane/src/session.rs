//! Session lifecycle and history.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

use taskrelay_core::{
    action_kinds, format_landing_brief, Action, Session, SessionHistory, SessionId, SessionStatus,
    TaskId,
};
use taskrelay_store::{AuditLog, Store, StoreError};

use crate::context::ContextProvider;

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A freshly created session.
#[derive(Debug, Clone)]
pub struct CreatedSession {
    pub session: Session,

    /// Rendered landing brief for the session's context snapshot.
    pub landing_brief: String,

    /// The requested parent session did not exist. The link is kept anyway.
    pub parent_missing: bool,
}

/// Ancestry of a session through `parent_session_id` links.
#[derive(Debug, Clone, Default)]
pub struct DelegationChain {
    /// The session itself, then its parent, up to the root.
    pub sessions: Vec<Session>,

    /// A parent id that could not be resolved.
    pub missing_parent: Option<SessionId>,

    /// The walk stopped because a session was seen twice.
    pub cycle: bool,
}

/// Creates sessions, tracks their activity and assembles their history.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn Store>,
    audit: AuditLog,
    context: Arc<dyn ContextProvider>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn Store>, context: Arc<dyn ContextProvider>) -> Self {
        Self {
            audit: AuditLog::new(store.clone()),
            store,
            context,
        }
    }

    /// Start a new active session with a landing context snapshot.
    pub async fn create_session(
        &self,
        platform: &str,
        role: &str,
        parent_session_id: Option<SessionId>,
    ) -> Result<CreatedSession, SessionError> {
        if platform.trim().is_empty() {
            return Err(SessionError::InvalidInput("platform must not be empty".into()));
        }
        if role.trim().is_empty() {
            return Err(SessionError::InvalidInput("role must not be empty".into()));
        }

        let parent_missing = match &parent_session_id {
            Some(parent) => self.store.get_session(parent).await?.is_none(),
            None => false,
        };
        if parent_missing {
            warn!(
                parent_session_id = ?parent_session_id,
                "Parent session not found, keeping the link"
            );
        }

        let snapshot = self.context.snapshot().await;
        let landing_brief = format_landing_brief(&snapshot);
        let session = Session::new(platform, role, parent_session_id, snapshot);
        self.store.insert_session(&session).await?;

        info!(
            session_id = %session.id,
            platform = %session.agent_platform,
            role = %session.agent_role,
            parent_session_id = ?session.parent_session_id,
            "Session created"
        );

        Ok(CreatedSession {
            session,
            landing_brief,
            parent_missing,
        })
    }

    pub async fn get_session(&self, id: &SessionId) -> Result<Session, SessionError> {
        self.store
            .get_session(id)
            .await?
            .ok_or_else(|| SessionError::NotFound(id.clone()))
    }

    /// The session with its tasks (newest first) and actions (oldest first).
    pub async fn get_session_history(&self, id: &SessionId) -> Result<SessionHistory, SessionError> {
        let session = self.get_session(id).await?;
        let tasks = self.store.tasks_for_session(id).await?;
        let actions = self.audit.for_session(id).await?;
        Ok(SessionHistory {
            session,
            tasks,
            actions,
        })
    }

    /// Record activity on a session.
    pub async fn touch(&self, id: &SessionId) -> Result<(), SessionError> {
        if self.store.touch_session(id, Utc::now()).await? {
            Ok(())
        } else {
            Err(SessionError::NotFound(id.clone()))
        }
    }

    /// Move an active session to `completed` or `abandoned`.
    ///
    /// Returns false if the session had already ended.
    pub async fn end_session(
        &self,
        id: &SessionId,
        status: SessionStatus,
    ) -> Result<bool, SessionError> {
        if status == SessionStatus::Active {
            return Err(SessionError::InvalidInput(
                "a session can only end as completed or abandoned".into(),
            ));
        }
        let session = self.get_session(id).await?;
        let ended = self.store.end_session(id, status, Utc::now()).await?;
        if ended {
            info!(session_id = %id, status = %status, "Session ended");
        } else {
            warn!(session_id = %id, status = %session.status, "Session already ended");
        }
        Ok(ended)
    }

    /// Walk `parent_session_id` links from `id` towards the root.
    pub async fn delegation_chain(&self, id: &SessionId) -> Result<DelegationChain, SessionError> {
        let mut chain = DelegationChain::default();
        let mut seen = HashSet::new();
        let mut next = Some(self.get_session(id).await?);

        while let Some(session) = next.take() {
            if !seen.insert(session.id.clone()) {
                chain.cycle = true;
                break;
            }
            let parent = session.parent_session_id.clone();
            chain.sessions.push(session);

            if let Some(parent) = parent {
                match self.store.get_session(&parent).await? {
                    Some(found) => next = Some(found),
                    None => chain.missing_parent = Some(parent),
                }
            }
        }
        Ok(chain)
    }

    /// Append an action to a session's audit trail and mark the session active.
    pub async fn record_action(&self, action: Action) -> Result<Action, SessionError> {
        self.touch(&action.session_id).await?;
        Ok(self.audit.record(action).await?)
    }

    /// Log an agent's reply, optionally tied to a task.
    pub async fn record_agent_response(
        &self,
        session_id: &SessionId,
        task_id: Option<TaskId>,
        response: &str,
        output: Value,
        execution_time_ms: Option<i64>,
    ) -> Result<Action, SessionError> {
        let mut action = Action::new(
            session_id.clone(),
            action_kinds::AGENT_RESPONSE,
            truncate(response, 200),
        )
        .with_input(json!({ "response_length": response.len() }))
        .with_output(output);
        if let Some(task_id) = task_id {
            action = action.for_task(task_id);
        }
        if let Some(ms) = execution_time_ms {
            action = action.with_execution_time_ms(ms);
        }
        self.record_action(action).await
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
