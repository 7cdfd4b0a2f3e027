//! TaskRelay worker runtime.
//!
//! A worker repeatedly claims the oldest pending task, runs it through a
//! [`taskrelay_executor::WorkExecutor`] under the task's timeout, and writes
//! the terminal status back to the queue.

pub mod config;
pub mod runtime;

pub use config::Config;
pub use runtime::{Worker, WorkerStats};
