//! Worker configuration.

use std::time::Duration;

use taskrelay_core::WorkerId;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Worker ID recorded on claimed tasks.
    pub worker_id: WorkerId,

    /// Upper bound on in-flight executions. Tasks still run one at a time.
    pub max_concurrent: u32,

    /// Sleep between claim attempts that found nothing.
    pub poll_interval: Duration,

    /// Lease renewal interval while a task is executing.
    pub heartbeat_interval: Duration,

    /// Log a status line after this many consecutive empty polls.
    pub status_every_idle_polls: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_id: WorkerId::from_hostname(),
            max_concurrent: 5,
            poll_interval: Duration::from_secs(1),
            heartbeat_interval: Duration::from_secs(15),
            status_every_idle_polls: 60,
        }
    }
}
