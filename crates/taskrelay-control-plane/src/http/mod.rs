//! HTTP server for the control plane.
//!
//! Provides endpoints for:
//! - Task queue (`/tasks`, `/tasks/:id`, `/tasks/:id/actions`, `/dashboard`)
//! - Sessions, delegation and audit (`/sessions/...`)
//! - Health check (`/health`)
//! - Prometheus metrics (`/metrics`)

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod error;
mod handlers;

pub use error::ApiError;

/// Create the HTTP router.
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS layer for dashboard access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Task queue
        .route(
            "/tasks",
            post(handlers::create_task).get(handlers::list_tasks),
        )
        .route(
            "/tasks/:id",
            get(handlers::get_task).delete(handlers::cancel_task),
        )
        .route("/tasks/:id/actions", get(handlers::task_actions))
        .route("/dashboard", get(handlers::dashboard))
        // Sessions
        .route("/sessions", post(handlers::create_session))
        .route("/sessions/:id", get(handlers::get_session))
        .route("/sessions/:id/delegations", post(handlers::delegate_task))
        .route("/sessions/:id/audits", post(handlers::audit_task))
        .route("/sessions/:id/summary", get(handlers::session_summary))
        .route(
            "/sessions/:id/actions",
            get(handlers::session_actions).post(handlers::record_action),
        )
        // Observability routes
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests;
