//! Worker poll loop and task execution.

use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use taskrelay_core::{
    ExecutionFailure, ExecutionSuccess, FailureKind, OutputDocument, Task, TaskId, TaskStatus,
    TaskUpdate, WorkerId,
};
use taskrelay_executor::{ExecutionOutcome, ExecutorError, WorkExecutor};
use taskrelay_store::{QueueError, TaskQueue};

use crate::Config;

/// Attempts at writing a task's terminal status before giving up on it.
const RESULT_WRITE_ATTEMPTS: u32 = 5;

/// Process-local counters. Diagnostic only; the queue is authoritative.
#[derive(Debug, Default)]
pub struct WorkerStats {
    completed: AtomicU64,
    failed: AtomicU64,
}

impl WorkerStats {
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    fn record(&self, status: TaskStatus) {
        match status {
            TaskStatus::Completed => self.completed.fetch_add(1, Ordering::Relaxed),
            _ => self.failed.fetch_add(1, Ordering::Relaxed),
        };
    }
}

/// A worker bound to one queue and one executor.
pub struct Worker {
    config: Arc<Config>,
    queue: TaskQueue,
    executor: Arc<dyn WorkExecutor>,
    stats: Arc<WorkerStats>,
    active: Arc<AtomicU32>,
}

impl Worker {
    pub fn new(config: Config, queue: TaskQueue, executor: Arc<dyn WorkExecutor>) -> Self {
        Self {
            config: Arc::new(config),
            queue,
            executor,
            stats: Arc::new(WorkerStats::default()),
            active: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn id(&self) -> &WorkerId {
        &self.config.worker_id
    }

    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// Number of executions currently in flight.
    pub fn active_count(&self) -> u32 {
        self.active.load(Ordering::SeqCst)
    }

    /// Poll until `shutdown` is cancelled.
    ///
    /// Cancellation interrupts the poll sleep only; an execution in progress
    /// is allowed to finish and report its result first.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            worker_id = %self.config.worker_id,
            max_concurrent = self.config.max_concurrent,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "Worker started"
        );

        let mut idle_polls: u32 = 0;
        while !shutdown.is_cancelled() {
            if self.active_count() < self.config.max_concurrent {
                match self.poll_once().await {
                    Ok(true) => {
                        idle_polls = 0;
                        continue;
                    }
                    Ok(false) => {
                        idle_polls = idle_polls.saturating_add(1);
                        if self.config.status_every_idle_polls > 0
                            && idle_polls % self.config.status_every_idle_polls == 0
                        {
                            info!(
                                worker_id = %self.config.worker_id,
                                completed = self.stats.completed(),
                                failed = self.stats.failed(),
                                "Waiting for tasks"
                            );
                        }
                    }
                    Err(e) => {
                        error!(worker_id = %self.config.worker_id, error = %e, "Claim failed");
                    }
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        info!(
            worker_id = %self.config.worker_id,
            completed = self.stats.completed(),
            failed = self.stats.failed(),
            "Worker stopped"
        );
    }

    /// Claim and process at most one task.
    ///
    /// Returns `Ok(false)` when the queue had nothing to hand out.
    pub async fn poll_once(&self) -> Result<bool, QueueError> {
        let Some(task) = self.queue.claim(&self.config.worker_id).await? else {
            return Ok(false);
        };
        self.process(task).await;
        Ok(true)
    }

    /// Execute a claimed task and write its terminal status.
    async fn process(&self, task: Task) -> TaskStatus {
        self.active.fetch_add(1, Ordering::SeqCst);
        info!(
            task_id = %task.id,
            task_type = %task.task_type,
            timeout_secs = task.timeout_seconds,
            "Executing task"
        );

        let stop_lease = CancellationToken::new();
        let lease = tokio::spawn(renew_lease(
            self.queue.clone(),
            task.id.clone(),
            self.config.worker_id.clone(),
            self.config.heartbeat_interval,
            stop_lease.clone(),
        ));

        let started = Instant::now();
        let limit = Duration::from_secs(u64::from(task.timeout_seconds));
        let result = tokio::time::timeout(limit, self.executor.execute(&task.description)).await;
        let elapsed = started.elapsed();

        stop_lease.cancel();
        if let Err(e) = lease.await {
            warn!(task_id = %task.id, error = %e, "Lease task ended abnormally");
        }

        let update = match result {
            Ok(Ok(outcome)) if outcome.success() => self.success(&outcome, elapsed),
            Ok(Ok(outcome)) => self.process_error(&outcome, elapsed),
            Ok(Err(e)) => self.executor_error(&e, elapsed),
            Err(_) => self.timeout(&task, elapsed),
        };
        let status = update.status;
        let update = update.held_by(self.config.worker_id.clone());

        let written = retry_store_errors(RESULT_WRITE_ATTEMPTS, self.config.poll_interval, || {
            self.queue.update_status(&task.id, update.clone())
        })
        .await;
        match written {
            Ok(_) => match status {
                TaskStatus::Completed => info!(
                    task_id = %task.id,
                    execution_time_ms = elapsed.as_millis() as u64,
                    "Task completed"
                ),
                _ => warn!(
                    task_id = %task.id,
                    execution_time_ms = elapsed.as_millis() as u64,
                    "Task failed"
                ),
            },
            Err(e) => error!(task_id = %task.id, error = %e, "Failed to record task result"),
        }

        self.stats.record(status);
        self.active.fetch_sub(1, Ordering::SeqCst);
        status
    }

    fn success(&self, outcome: &ExecutionOutcome, elapsed: Duration) -> TaskUpdate {
        let output = ExecutionSuccess {
            raw_output: outcome.stdout.clone(),
            raw_stderr: outcome.stderr.clone(),
            exit_code: outcome.exit_code,
            execution_time: elapsed.as_secs_f64(),
            worker_id: self.config.worker_id.clone(),
            completed_at: Utc::now(),
        };
        TaskUpdate::status(TaskStatus::Completed).with_output(output.to_value())
    }

    fn process_error(&self, outcome: &ExecutionOutcome, elapsed: Duration) -> TaskUpdate {
        let error = match outcome.exit_code {
            Some(code) => format!("Executor exited with status {code}"),
            None => "Executor terminated by signal".to_string(),
        };
        self.failure(
            error,
            FailureKind::ProcessError,
            outcome.stderr.clone(),
            outcome.exit_code,
            elapsed,
        )
    }

    fn executor_error(&self, err: &ExecutorError, elapsed: Duration) -> TaskUpdate {
        let kind = match err {
            ExecutorError::NotFound(_) | ExecutorError::Spawn(_) => FailureKind::SpawnError,
            ExecutorError::Io(_) => FailureKind::ProcessError,
        };
        self.failure(err.to_string(), kind, String::new(), None, elapsed)
    }

    fn timeout(&self, task: &Task, elapsed: Duration) -> TaskUpdate {
        self.failure(
            format!("Execution timeout ({}s)", task.timeout_seconds),
            FailureKind::Timeout,
            String::new(),
            None,
            elapsed,
        )
    }

    fn failure(
        &self,
        error: String,
        error_kind: FailureKind,
        raw_stderr: String,
        exit_code: Option<i32>,
        elapsed: Duration,
    ) -> TaskUpdate {
        let output = ExecutionFailure {
            error: error.clone(),
            error_kind,
            raw_stderr,
            exit_code,
            execution_time: elapsed.as_secs_f64(),
            worker_id: self.config.worker_id.clone(),
            failed_at: Utc::now(),
        };
        TaskUpdate::status(TaskStatus::Failed)
            .with_output(output.to_value())
            .with_error(error)
    }
}

/// Run `op` until it succeeds, fails with a non-store error, or `attempts`
/// tries are spent. Tries are spaced by `delay`.
async fn retry_store_errors<T, F, Fut>(
    attempts: u32,
    delay: Duration,
    mut op: F,
) -> Result<T, QueueError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, QueueError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(QueueError::Store(e)) if attempt < attempts => {
                warn!(attempt, error = %e, "Store write failed, retrying");
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
            result => return result,
        }
    }
}

/// Renew the lease on `task_id` every `interval` until `stop` is cancelled.
///
/// A renewal in progress is never interrupted.
async fn renew_lease(
    queue: TaskQueue,
    task_id: TaskId,
    worker: WorkerId,
    interval: Duration,
    stop: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately; the claim already set the lease.
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = ticker.tick() => {}
        }
        match queue.heartbeat(&task_id, &worker).await {
            Ok(true) => debug!(task_id = %task_id, "Lease renewed"),
            Ok(false) => warn!(task_id = %task_id, "Lease lost, task no longer held"),
            Err(e) => warn!(task_id = %task_id, error = %e, "Lease renewal failed"),
        }
    }
}
