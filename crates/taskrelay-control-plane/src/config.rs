//! Control plane configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Control plane configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server bind address.
    pub http_bind_addr: String,

    /// Database URL shared with workers.
    pub database_url: String,

    /// Running tasks whose lease is older than this are requeued.
    /// Zero disables the sweep.
    pub lease_timeout_secs: u64,

    /// How often the lease sweep runs.
    pub sweep_interval_secs: u64,

    /// JSON inventory of nodes, services and knowledge sources for session
    /// landing context.
    pub inventory_path: Option<PathBuf>,

    /// Platform tag for planner sessions started by the control plane.
    pub planner_platform: String,
}

impl Config {
    /// Lease timeout, if the sweep is enabled.
    pub fn lease_timeout(&self) -> Option<Duration> {
        (self.lease_timeout_secs > 0).then(|| Duration::from_secs(self.lease_timeout_secs))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_bind_addr: "127.0.0.1:8765".to_string(),
            database_url: "sqlite://taskrelay.db".to_string(),
            lease_timeout_secs: 0,
            sweep_interval_secs: 30,
            inventory_path: None,
            planner_platform: "claude_code".to_string(),
        }
    }
}
