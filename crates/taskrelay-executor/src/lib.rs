//! Work executors for TaskRelay
//!
//! A [`WorkExecutor`] takes a task's description and performs it, reporting
//! exit status, captured output and wall-clock duration. Executors are not
//! trusted to limit themselves: callers enforce timeouts by dropping the
//! returned future, which kills any child process.
//!
//! # Example
//!
//! ```rust,no_run
//! use taskrelay_executor::{CommandExecutor, WorkExecutor};
//!
//! async fn run() -> Result<(), Box<dyn std::error::Error>> {
//!     let executor = CommandExecutor::new("claude").with_args(["-p"]);
//!
//!     let outcome = executor.execute("What is 2 + 2?").await?;
//!
//!     println!("exit: {:?}, output: {}", outcome.exit_code, outcome.stdout);
//!     Ok(())
//! }
//! ```

mod error;
mod executor;

pub use error::ExecutorError;
pub use executor::{CommandExecutor, ExecutionOutcome, WorkExecutor};
