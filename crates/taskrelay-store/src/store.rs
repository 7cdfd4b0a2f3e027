//! The persistence seam.
//!
//! Every component reads and writes through a [`Store`]; none of them keeps an
//! authoritative copy of sessions, tasks or actions between calls.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use taskrelay_core::{
    Action, Dashboard, Session, SessionId, SessionStatus, StoreCounts, Task, TaskFilter, TaskId,
    TaskStatus, TaskUpdate, WorkerId,
};

use crate::StoreError;

/// Filter for audit-log reads.
#[derive(Debug, Clone, Default)]
pub struct ActionFilter {
    pub session_id: Option<SessionId>,
    pub task_id: Option<TaskId>,
    /// Keep only the most recent N entries.
    pub limit: Option<u32>,
}

impl ActionFilter {
    pub fn for_session(session_id: SessionId) -> Self {
        Self {
            session_id: Some(session_id),
            ..Default::default()
        }
    }

    pub fn for_task(task_id: TaskId) -> Self {
        Self {
            task_id: Some(task_id),
            ..Default::default()
        }
    }

    pub fn most_recent(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Outcome of one stale-lease sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaleSweep {
    /// Tasks put back to `pending`.
    pub requeued: Vec<TaskId>,
    /// Tasks failed because their retry budget was spent.
    pub failed: Vec<TaskId>,
}

impl StaleSweep {
    pub fn is_empty(&self) -> bool {
        self.requeued.is_empty() && self.failed.is_empty()
    }
}

/// Durable storage for sessions, tasks and actions.
#[async_trait]
pub trait Store: Send + Sync {
    /// One trivial round-trip read.
    async fn ping(&self) -> Result<(), StoreError>;

    // Sessions

    async fn insert_session(&self, session: &Session) -> Result<(), StoreError>;

    async fn get_session(&self, id: &SessionId) -> Result<Option<Session>, StoreError>;

    /// Bump `last_active`. Returns false if the session does not exist.
    async fn touch_session(&self, id: &SessionId, now: DateTime<Utc>)
        -> Result<bool, StoreError>;

    /// Move an active session to `status`. Returns false if it was not active.
    async fn end_session(
        &self,
        id: &SessionId,
        status: SessionStatus,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    // Tasks

    async fn insert_task(&self, task: &Task) -> Result<(), StoreError>;

    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError>;

    /// Tasks matching `filter`, newest first.
    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError>;

    /// Every task created by a session, newest first.
    async fn tasks_for_session(&self, session_id: &SessionId) -> Result<Vec<Task>, StoreError>;

    /// Atomically move the oldest pending task to `running` under `worker`.
    ///
    /// `None` means no task was available; it is not an error.
    async fn claim_next_task(
        &self,
        worker: &WorkerId,
        now: DateTime<Utc>,
    ) -> Result<Option<Task>, StoreError>;

    /// Apply `update` if the task's current status is one of `allowed_from`.
    ///
    /// Returns false when the row was not changed.
    async fn update_task(
        &self,
        id: &TaskId,
        update: &TaskUpdate,
        allowed_from: &[TaskStatus],
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Cancel a pending task. Returns false if it was not pending.
    async fn cancel_task(&self, id: &TaskId, now: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Renew the lease on a running task held by `worker`.
    async fn heartbeat_task(
        &self,
        id: &TaskId,
        worker: &WorkerId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Release running tasks whose lease was last renewed before `cutoff`.
    async fn requeue_stale(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<StaleSweep, StoreError>;

    async fn task_counts_by_status(&self) -> Result<BTreeMap<TaskStatus, u64>, StoreError>;

    async fn dashboard(&self, now: DateTime<Utc>) -> Result<Dashboard, StoreError>;

    async fn counts(&self) -> Result<StoreCounts, StoreError>;

    // Actions

    async fn append_action(&self, action: &Action) -> Result<(), StoreError>;

    /// Actions matching `filter`, in `executed_at` order.
    async fn list_actions(&self, filter: &ActionFilter) -> Result<Vec<Action>, StoreError>;
}
