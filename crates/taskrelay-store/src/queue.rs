//! Task queue: creation, the atomic claim, and status transitions.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use taskrelay_core::{
    CoreError, Dashboard, NewTask, Task, TaskFilter, TaskId, TaskStatus, TaskUpdate, WorkerId,
};

use crate::store::{StaleSweep, Store};
use crate::StoreError;

/// Errors returned by [`TaskQueue`] operations.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Task not found: {0}")]
    NotFound(TaskId),

    #[error("Invalid state transition for task {task_id}: {from} -> {to}")]
    InvalidStateTransition {
        task_id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },

    /// The task is no longer held by the worker attempting the update.
    #[error("Task {task_id} is not held by worker {worker}")]
    NotHeld { task_id: TaskId, worker: WorkerId },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<CoreError> for QueueError {
    fn from(err: CoreError) -> Self {
        let CoreError::InvalidInput(msg) = err;
        QueueError::InvalidInput(msg)
    }
}

/// Task lifecycle operations over a shared [`Store`].
#[derive(Clone)]
pub struct TaskQueue {
    store: Arc<dyn Store>,
}

impl TaskQueue {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Validate and persist a new `pending` task.
    pub async fn create(&self, new_task: NewTask) -> Result<Task, QueueError> {
        new_task.validate()?;
        let task = new_task.into_task();
        self.store.insert_task(&task).await?;

        info!(
            task_id = %task.id,
            task_type = %task.task_type,
            priority = task.priority,
            "Task created"
        );
        Ok(task)
    }

    pub async fn get(&self, id: &TaskId) -> Result<Task, QueueError> {
        self.store
            .get_task(id)
            .await?
            .ok_or_else(|| QueueError::NotFound(id.clone()))
    }

    pub async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, QueueError> {
        Ok(self.store.list_tasks(filter).await?)
    }

    /// Claim the oldest pending task for `worker`.
    ///
    /// `Ok(None)` is the normal empty-queue signal.
    pub async fn claim(&self, worker: &WorkerId) -> Result<Option<Task>, QueueError> {
        let claimed = self.store.claim_next_task(worker, Utc::now()).await?;
        if let Some(task) = &claimed {
            info!(task_id = %task.id, worker_id = %worker, "Task claimed");
        }
        Ok(claimed)
    }

    /// Apply a status update, enforcing the transition rules.
    pub async fn update_status(&self, id: &TaskId, update: TaskUpdate) -> Result<Task, QueueError> {
        let applied = self
            .store
            .update_task(id, &update, update.status.allowed_sources(), Utc::now())
            .await?;

        let task = self.get(id).await?;
        if applied {
            debug!(task_id = %id, status = %task.status, "Task status updated");
            return Ok(task);
        }

        if let Some(worker) = update.worker {
            if task.status.can_transition_to(update.status)
                && task.assigned_worker_id.as_ref() != Some(&worker)
            {
                warn!(
                    task_id = %id,
                    worker_id = %worker,
                    "Update from a worker that no longer holds the task"
                );
                return Err(QueueError::NotHeld {
                    task_id: id.clone(),
                    worker,
                });
            }
        }

        Err(QueueError::InvalidStateTransition {
            task_id: id.clone(),
            from: task.status,
            to: update.status,
        })
    }

    /// Cancel a task if it is still pending.
    ///
    /// Returns `Ok(false)` without changing anything when the task has
    /// already been claimed or finished.
    pub async fn cancel(&self, id: &TaskId) -> Result<bool, QueueError> {
        if self.store.cancel_task(id, Utc::now()).await? {
            info!(task_id = %id, "Task cancelled");
            return Ok(true);
        }
        // Distinguish "not pending" from "does not exist".
        let task = self.get(id).await?;
        debug!(task_id = %id, status = %task.status, "Cancel ignored, task not pending");
        Ok(false)
    }

    /// Renew the lease on a task held by `worker`.
    pub async fn heartbeat(&self, id: &TaskId, worker: &WorkerId) -> Result<bool, QueueError> {
        Ok(self.store.heartbeat_task(id, worker, Utc::now()).await?)
    }

    /// Release running tasks whose lease is older than `lease`.
    pub async fn requeue_stale(&self, lease: Duration) -> Result<StaleSweep, QueueError> {
        let lease = chrono::Duration::from_std(lease)
            .map_err(|e| QueueError::InvalidInput(format!("lease out of range: {e}")))?;
        let now = Utc::now();
        let sweep = self.store.requeue_stale(now - lease, now).await?;

        for id in &sweep.requeued {
            warn!(task_id = %id, "Lease expired, task requeued");
        }
        for id in &sweep.failed {
            warn!(task_id = %id, "Lease expired with no retries left, task failed");
        }
        Ok(sweep)
    }

    pub async fn dashboard(&self) -> Result<Dashboard, QueueError> {
        Ok(self.store.dashboard(Utc::now()).await?)
    }

    pub async fn counts_by_status(&self) -> Result<BTreeMap<TaskStatus, u64>, QueueError> {
        Ok(self.store.task_counts_by_status().await?)
    }
}
