//! Subprocess executor for running task payloads through an external CLI.
//!
//! This module provides the `WorkExecutor` seam and `CommandExecutor`, which
//! runs `<program> <args...> <description>` and captures its output.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::error::ExecutorError;

/// Result of one execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Process exit code. `None` if the process was killed by a signal.
    pub exit_code: Option<i32>,

    /// Captured standard output.
    pub stdout: String,

    /// Captured standard error.
    pub stderr: String,

    /// Wall-clock duration of the execution.
    pub duration: Duration,
}

impl ExecutionOutcome {
    /// Whether the process exited with status zero.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Performs a task's payload.
#[async_trait]
pub trait WorkExecutor: Send + Sync {
    /// Run the payload. May never return; callers enforce timeouts.
    async fn execute(&self, input: &str) -> Result<ExecutionOutcome, ExecutorError>;
}

/// Executor that runs an external program with the task description as its
/// final argument.
///
/// # Example
///
/// ```rust,no_run
/// use taskrelay_executor::{CommandExecutor, WorkExecutor};
///
/// async fn run() -> Result<(), Box<dyn std::error::Error>> {
///     let executor = CommandExecutor::new("claude")
///         .with_args(["-p"])
///         .with_env("NO_COLOR", "1");
///
///     let outcome = executor.execute("Summarise the open tasks").await?;
///     println!("{}", outcome.stdout);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    /// Program to run. A bare name is resolved through PATH.
    program: String,

    /// Arguments placed before the task description.
    args: Vec<String>,

    /// Additional environment variables.
    env_vars: Vec<(String, String)>,

    /// Working directory (optional).
    working_dir: Option<PathBuf>,
}

impl CommandExecutor {
    /// Create a new executor for the given program.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env_vars: Vec::new(),
            working_dir: None,
        }
    }

    /// Executor for the `claude` CLI in print mode.
    pub fn claude(program: impl Into<String>) -> Self {
        Self::new(program).with_args(["-p"])
    }

    /// Set the arguments placed before the task description.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Add an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    /// Set the working directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// The configured program.
    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self, input: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }
        cmd
    }
}

#[async_trait]
impl WorkExecutor for CommandExecutor {
    async fn execute(&self, input: &str) -> Result<ExecutionOutcome, ExecutorError> {
        info!(
            program = %self.program,
            input_len = input.len(),
            "Spawning executor"
        );

        let started = Instant::now();
        let child = self.command(input).spawn().map_err(|e| {
            error!(program = %self.program, error = %e, "Failed to spawn executor");
            if e.kind() == ErrorKind::NotFound {
                ExecutorError::NotFound(self.program.clone())
            } else {
                ExecutorError::Spawn(e)
            }
        })?;

        // Dropping this future drops the child, which kills it.
        let output = child.wait_with_output().await?;
        let duration = started.elapsed();

        let outcome = ExecutionOutcome {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            duration,
        };

        debug!(
            program = %self.program,
            exit_code = ?outcome.exit_code,
            duration_ms = duration.as_millis() as u64,
            stdout_len = outcome.stdout.len(),
            stderr_len = outcome.stderr.len(),
            "Executor finished"
        );
        Ok(outcome)
    }
}
