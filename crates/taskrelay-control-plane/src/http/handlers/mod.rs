//! HTTP request handlers.

mod health;
mod sessions;
mod tasks;

pub use health::{health_check, metrics_handler};
pub use sessions::{
    audit_task, create_session, delegate_task, get_session, record_action, session_actions,
    session_summary,
};
pub use tasks::{cancel_task, create_task, dashboard, get_task, list_tasks, task_actions};
