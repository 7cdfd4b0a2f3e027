//! Lease sweep: returns tasks held by vanished workers to the queue.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use taskrelay_store::{QueueError, StaleSweep, TaskQueue};

/// Periodically requeues running tasks whose lease has expired.
///
/// Tasks that have used up their retries are failed instead.
pub struct LeaseSweeper {
    queue: TaskQueue,
    lease: Duration,
    interval: Duration,
}

impl LeaseSweeper {
    pub fn new(queue: TaskQueue, lease: Duration, interval: Duration) -> Self {
        Self {
            queue,
            lease,
            interval,
        }
    }

    /// Run one sweep.
    pub async fn sweep_once(&self) -> Result<StaleSweep, QueueError> {
        self.queue.requeue_stale(self.lease).await
    }

    /// Sweep every `interval` until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            lease_secs = self.lease.as_secs(),
            interval_secs = self.interval.as_secs(),
            "Lease sweeper started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.sweep_once().await {
                Ok(sweep) if !sweep.is_empty() => {
                    info!(
                        requeued = sweep.requeued.len(),
                        failed = sweep.failed.len(),
                        "Lease sweep released tasks"
                    );
                }
                Ok(_) => {}
                Err(e) => error!(error = %e, "Lease sweep failed"),
            }
        }

        info!("Lease sweeper stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use taskrelay_core::{NewTask, TaskStatus, WorkerId};
    use taskrelay_store::SqliteStore;

    async fn queue() -> TaskQueue {
        TaskQueue::new(Arc::new(SqliteStore::connect("sqlite::memory:").await.unwrap()))
    }

    #[tokio::test]
    async fn test_sweep_requeues_expired_lease() {
        let queue = queue().await;
        let task = queue.create(NewTask::new("code", "work")).await.unwrap();
        queue.claim(&WorkerId::new("gone")).await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let sweeper = LeaseSweeper::new(queue.clone(), Duration::ZERO, Duration::from_secs(1));
        let sweep = sweeper.sweep_once().await.unwrap();

        assert_eq!(sweep.requeued, vec![task.id.clone()]);
        let task = queue.get(&task.id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.retry_count, 1);
        assert!(task.assigned_worker_id.is_none());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let sweeper = LeaseSweeper::new(
            queue().await,
            Duration::from_secs(60),
            Duration::from_millis(10),
        );
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(sweeper.run(shutdown.clone()));

        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
