//! TaskRelay Worker Daemon

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use taskrelay_core::WorkerId;
use taskrelay_executor::CommandExecutor;
use taskrelay_store::{SqliteStore, TaskQueue};
use taskrelay_worker::{Config, Worker};

#[derive(Parser)]
#[command(name = "taskrelay-worker")]
#[command(about = "Claims and executes tasks from the TaskRelay queue", long_about = None)]
struct Args {
    /// Database shared with the control plane
    #[arg(long, env = "TASKRELAY_DATABASE_URL", default_value = "sqlite://taskrelay.db")]
    database_url: String,

    /// Worker identity (defaults to the hostname)
    #[arg(long, env = "TASKRELAY_WORKER_ID")]
    worker_id: Option<String>,

    /// Maximum in-flight executions
    #[arg(long, env = "MAX_CONCURRENT_AGENTS", default_value_t = 5)]
    max_concurrent: u32,

    /// Seconds between claim attempts on an empty queue
    #[arg(long, env = "POLL_INTERVAL", default_value_t = 1.0)]
    poll_interval: f64,

    /// Seconds between lease renewals while executing
    #[arg(long, env = "HEARTBEAT_INTERVAL", default_value_t = 15)]
    heartbeat_interval: u64,

    /// Executor program
    #[arg(long, env = "EXECUTOR_PATH", default_value = "claude")]
    executor: String,

    /// Arguments placed before the task description (default: -p)
    #[arg(long = "executor-arg", allow_hyphen_values = true)]
    executor_args: Vec<String>,
}

impl Args {
    fn into_config(self) -> Result<(Config, CommandExecutor, String), Box<dyn std::error::Error>> {
        let poll_interval = Duration::try_from_secs_f64(self.poll_interval)
            .map_err(|e| format!("invalid poll interval {}: {e}", self.poll_interval))?;

        let config = Config {
            worker_id: self
                .worker_id
                .map(WorkerId::new)
                .unwrap_or_else(WorkerId::from_hostname),
            max_concurrent: self.max_concurrent.max(1),
            poll_interval,
            heartbeat_interval: Duration::from_secs(self.heartbeat_interval.max(1)),
            ..Config::default()
        };

        let executor_args = if self.executor_args.is_empty() {
            vec!["-p".to_string()]
        } else {
            self.executor_args
        };
        let executor = CommandExecutor::new(self.executor).with_args(executor_args);

        Ok((config, executor, self.database_url))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load config
    let (config, executor, database_url) = Args::parse().into_config()?;

    info!(
        worker_id = %config.worker_id,
        executor = %executor.program(),
        database = %database_url,
        "Starting TaskRelay worker"
    );

    let store = SqliteStore::connect(&database_url).await?;
    let queue = TaskQueue::new(Arc::new(store));
    let worker = Worker::new(config, queue, Arc::new(executor));

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    worker.run(shutdown).await;
    Ok(())
}

/// Cancel `shutdown` on SIGINT or SIGTERM.
async fn wait_for_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown requested, finishing in-flight work");
    shutdown.cancel();
}
