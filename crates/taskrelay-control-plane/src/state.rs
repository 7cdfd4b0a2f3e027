//! Shared application state.

use std::sync::Arc;

use taskrelay_store::{AuditLog, Store, TaskQueue};

use crate::config::Config;
use crate::context::ContextProvider;
use crate::planner::Planner;
use crate::session::SessionManager;

/// Shared application state.
pub struct AppState {
    /// Durable store, shared with workers through the database.
    pub store: Arc<dyn Store>,

    /// Task lifecycle on top of the store.
    pub queue: TaskQueue,

    /// Append-only action log.
    pub audit: AuditLog,

    /// Session lifecycle and history.
    pub sessions: SessionManager,

    /// Platform tag for planner sessions.
    pub planner_platform: String,
}

impl AppState {
    /// Create a new AppState wrapped in Arc.
    pub fn new(
        store: Arc<dyn Store>,
        context: Arc<dyn ContextProvider>,
        config: &Config,
    ) -> Arc<Self> {
        Arc::new(Self {
            queue: TaskQueue::new(store.clone()),
            audit: AuditLog::new(store.clone()),
            sessions: SessionManager::new(store.clone(), context),
            store,
            planner_platform: config.planner_platform.clone(),
        })
    }

    /// A planner not yet bound to any session.
    pub fn planner(&self) -> Planner {
        Planner::new(self.sessions.clone(), self.queue.clone())
            .with_platform(&self.planner_platform)
    }
}
