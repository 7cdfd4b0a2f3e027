//! TaskRelay durable store.
//!
//! - [`Store`]: the persistence seam every other component goes through
//! - [`SqliteStore`]: the sqlx/SQLite implementation
//! - [`TaskQueue`]: task lifecycle on top of a store, including the atomic claim
//! - [`AuditLog`]: append-only action records

pub mod audit;
pub mod error;
pub mod queue;
pub mod sqlite;
pub mod store;

pub use audit::AuditLog;
pub use error::StoreError;
pub use queue::{QueueError, TaskQueue};
pub use sqlite::SqliteStore;
pub use store::{ActionFilter, StaleSweep, Store};
