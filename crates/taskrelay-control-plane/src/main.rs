//! TaskRelay Control Plane Server

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use taskrelay_control_plane::http::create_router;
use taskrelay_control_plane::{AppState, Config, LeaseSweeper, StoreContextProvider};
use taskrelay_store::{SqliteStore, Store};

#[derive(Parser)]
#[command(name = "taskrelay-control-plane")]
#[command(about = "HTTP API for the TaskRelay queue and sessions", long_about = None)]
struct Args {
    /// HTTP bind address
    #[arg(long, env = "TASKRELAY_HTTP_ADDR", default_value = "127.0.0.1:8765")]
    bind: String,

    /// Database shared with workers
    #[arg(long, env = "TASKRELAY_DATABASE_URL", default_value = "sqlite://taskrelay.db")]
    database_url: String,

    /// Requeue running tasks whose lease is older than this many seconds (0 disables)
    #[arg(long, env = "TASKRELAY_LEASE_TIMEOUT", default_value_t = 0)]
    lease_timeout: u64,

    /// Seconds between lease sweeps
    #[arg(long, env = "TASKRELAY_SWEEP_INTERVAL", default_value_t = 30)]
    sweep_interval: u64,

    /// JSON file listing nodes, services and knowledge sources
    #[arg(long, env = "TASKRELAY_INVENTORY")]
    inventory: Option<PathBuf>,

    /// Platform tag for planner sessions
    #[arg(long, env = "TASKRELAY_PLANNER_PLATFORM", default_value = "claude_code")]
    planner_platform: String,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            http_bind_addr: args.bind,
            database_url: args.database_url,
            lease_timeout_secs: args.lease_timeout,
            sweep_interval_secs: args.sweep_interval,
            inventory_path: args.inventory,
            planner_platform: args.planner_platform,
        }
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
    let config: Config = Args::parse().into();
    let http_addr: SocketAddr = config.http_bind_addr.parse()?;

    let store: Arc<dyn Store> = Arc::new(SqliteStore::connect(&config.database_url).await?);

    let mut context = StoreContextProvider::new(store.clone());
    if let Some(path) = &config.inventory_path {
        info!(inventory = %path.display(), "Using inventory file for landing context");
        context = context.with_inventory(path);
    }

    // Create shared state
    let state = AppState::new(store, Arc::new(context), &config);
    let shutdown = CancellationToken::new();

    let sweeper = match config.lease_timeout() {
        Some(lease) => {
            let sweeper = LeaseSweeper::new(state.queue.clone(), lease, config.sweep_interval());
            Some(tokio::spawn(sweeper.run(shutdown.clone())))
        }
        None => {
            info!("Lease sweep disabled");
            None
        }
    };

    info!(
        http_addr = %http_addr,
        database = %config.database_url,
        "Starting TaskRelay control plane"
    );

    let router = create_router(state);
    let listener = TcpListener::bind(http_addr).await?;
    info!("HTTP server listening on {}", http_addr);

    let signal = shutdown.clone();
    let result = axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            wait_for_signal().await;
            signal.cancel();
        })
        .await;

    shutdown.cancel();
    if let Some(handle) = sweeper {
        if let Err(e) = handle.await {
            error!(error = %e, "Lease sweeper task failed");
        }
    }

    if let Err(e) = result {
        error!(error = %e, "HTTP server error");
        return Err(e.into());
    }
    info!("Control plane stopped");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn wait_for_signal() {
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

    info!("Shutdown requested");
}
