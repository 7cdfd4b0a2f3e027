//! TaskRelay Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/HTTP
//! - Database
//! - Runtime specifics
//!
//! All types here represent the core business domain of TaskRelay:
//! tasks and their lifecycle, agent sessions, and audit-log actions.

pub mod action;
pub mod brief;
pub mod error;
pub mod ids;
pub mod output;
pub mod session;
pub mod stats;
pub mod status;
pub mod task;

// Re-export commonly used types
pub use action::{kinds as action_kinds, Action};
pub use brief::format_landing_brief;
pub use error::CoreError;
pub use ids::{ActionId, SessionId, TaskId, WorkerId};
pub use output::{AuditVerdict, ExecutionFailure, ExecutionSuccess, FailureKind, OutputDocument};
pub use session::Session;
pub use stats::{Dashboard, SessionHistory, SessionSummary, StoreCounts};
pub use status::{SessionStatus, TaskStatus};
pub use task::{NewTask, Task, TaskFilter, TaskUpdate};
