//! TaskRelay CLI - Command line interface for the TaskRelay control plane.

use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;

use taskrelay_api::{
    AuditTaskRequest, CreateSessionRequest, CreateTaskRequest, DelegateTaskRequest,
    ListTasksQuery, SessionSummaryResponse, TaskResponse,
};
use taskrelay_client::HttpClient;
use taskrelay_core::{SessionId, TaskId};

/// TaskRelay CLI - Queue and session management tool
#[derive(Parser)]
#[command(name = "taskrelay")]
#[command(about = "CLI for the TaskRelay control plane", long_about = None)]
struct Cli {
    /// Control plane address
    #[arg(short, long, env = "TASKRELAY_URL", default_value = "http://127.0.0.1:8765")]
    url: String,

    /// Print raw JSON responses
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new task
    #[command(name = "create-task")]
    CreateTask {
        /// Routing tag, e.g. "research" or "code"
        #[arg(short = 't', long = "type")]
        task_type: String,

        /// What the executor should do
        #[arg(short, long)]
        description: String,

        /// Priority, 1 to 10
        #[arg(short, long, default_value_t = 5)]
        priority: u8,

        /// Timeout in seconds, 10 to 3600
        #[arg(long, default_value_t = 300)]
        timeout: u32,

        /// Retry budget for expired leases, 0 to 5
        #[arg(long, default_value_t = 3)]
        max_retries: u32,

        /// Session the task belongs to
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Get task status
    #[command(name = "get-task")]
    GetTask {
        /// Task ID
        id: String,
    },

    /// List tasks, newest first
    #[command(name = "list-tasks")]
    ListTasks {
        /// Only tasks with this status
        #[arg(long)]
        status: Option<String>,

        /// Only tasks of this session
        #[arg(long)]
        session: Option<String>,

        /// Maximum number of tasks
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Cancel a pending task
    #[command(name = "cancel-task")]
    CancelTask {
        /// Task ID to cancel
        id: String,
    },

    /// Show queue counters
    Dashboard,

    /// Check control plane health
    Health,

    /// Start a session and print its landing brief
    #[command(name = "start-session")]
    StartSession {
        /// Agent platform tag
        #[arg(long, default_value = "claude_code")]
        platform: String,

        /// Agent role tag
        #[arg(long, default_value = "planner")]
        role: String,

        /// Delegating session
        #[arg(long)]
        parent: Option<String>,
    },

    /// Show a session with its tasks and actions
    Session {
        /// Session ID
        id: String,
    },

    /// Delegate a task from a session
    Delegate {
        /// Delegating session
        #[arg(short, long)]
        session: String,

        /// Routing tag
        #[arg(short = 't', long = "type")]
        task_type: String,

        /// Role expected to pick the task up
        #[arg(short, long)]
        role: String,

        /// What the executor should do
        #[arg(short, long)]
        description: String,

        /// Priority, 1 to 10
        #[arg(short, long, default_value_t = 5)]
        priority: u8,

        /// Advisory dependency on another task
        #[arg(long = "depends-on")]
        depends_on: Vec<String>,

        /// Context as a JSON object
        #[arg(long)]
        context: Option<String>,
    },

    /// Approve or reject a task's result
    Audit {
        /// Auditing session
        #[arg(short, long)]
        session: String,

        /// Task ID
        #[arg(long)]
        task: String,

        /// Short verdict
        #[arg(short, long)]
        verdict: String,

        /// Free-form notes
        #[arg(short, long, default_value = "")]
        notes: String,

        /// Reject instead of approve
        #[arg(long)]
        reject: bool,
    },

    /// Summarise a session's tasks and actions
    Summary {
        /// Session ID
        id: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let client = HttpClient::new(&cli.url);

    match run(&client, cli.command, cli.json).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(
    client: &HttpClient,
    command: Commands,
    json: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match command {
        Commands::CreateTask {
            task_type,
            description,
            priority,
            timeout,
            max_retries,
            session,
        } => {
            let mut req = CreateTaskRequest::new(task_type, description);
            req.priority = priority;
            req.timeout_seconds = timeout;
            req.max_retries = max_retries;
            req.session_id = session.map(SessionId::new);

            let task = client.create_task(&req).await?;
            if json {
                print_json(&task)?;
            } else {
                println!("Task created:");
                print_task(&task);
            }
        }
        Commands::GetTask { id } => {
            let task = client.get_task(&TaskId::new(id)).await?;
            if json {
                print_json(&task)?;
            } else {
                print_task(&task);
            }
        }
        Commands::ListTasks {
            status,
            session,
            limit,
        } => {
            let query = ListTasksQuery {
                status,
                session_id: session,
                limit,
            };
            let tasks = client.list_tasks(&query).await?;
            if json {
                print_json(&tasks)?;
            } else {
                print_task_table(&tasks);
            }
        }
        Commands::CancelTask { id } => {
            let resp = client.cancel_task(&TaskId::new(id)).await?;
            if json {
                print_json(&resp)?;
            } else if resp.cancelled {
                println!("Task {} cancelled", resp.task_id);
            } else {
                println!("Task {} not cancelled (status: {})", resp.task_id, resp.status);
            }
        }
        Commands::Dashboard => {
            let dash = client.dashboard().await?;
            if json {
                print_json(&dash)?;
            } else {
                println!("Queued:              {}", dash.queued);
                println!("Running:             {}", dash.running);
                println!("Completed (1h):      {}", dash.completed_last_hour);
                println!("Failed (1h):         {}", dash.failed_last_hour);
                println!("Completed (total):   {}", dash.total_completed);
                match dash.avg_execution_time_sec {
                    Some(avg) => println!("Avg execution time:  {avg:.1}s"),
                    None => println!("Avg execution time:  -"),
                }
            }
        }
        Commands::Health => {
            let health = client.health().await?;
            if json {
                print_json(&health)?;
            } else {
                match &health.error {
                    Some(e) => println!("{}: {e}", health.status),
                    None => println!("{}", health.status),
                }
            }
            if !health.is_healthy() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::StartSession {
            platform,
            role,
            parent,
        } => {
            let created = client
                .create_session(&CreateSessionRequest {
                    platform,
                    role,
                    parent_session_id: parent.map(SessionId::new),
                })
                .await?;
            if json {
                print_json(&created)?;
            } else {
                println!("Session: {}", created.session.session_id);
                if created.parent_missing {
                    println!("Warning: parent session not found");
                }
                println!();
                println!("{}", created.landing_brief);
            }
        }
        Commands::Session { id } => {
            let history = client.get_session(&SessionId::new(id)).await?;
            if json {
                print_json(&history)?;
            } else {
                let s = &history.session;
                println!("  ID:         {}", s.session_id);
                println!("  Platform:   {}", s.agent_platform);
                println!("  Role:       {}", s.agent_role);
                println!("  Status:     {}", s.status);
                if let Some(parent) = &s.parent_session_id {
                    println!("  Parent:     {parent}");
                }
                println!("  Created:    {}", format_timestamp(s.created_at));
                println!("  Active:     {}", format_timestamp(s.last_active));
                println!();
                print_task_table(&history.tasks);
                println!();
                println!("Actions ({}):", history.actions.len());
                for action in &history.actions {
                    let mark = if action.success { "ok" } else { "FAIL" };
                    println!(
                        "  {}  {:<16}  {:<4}  {}",
                        format_timestamp(action.executed_at),
                        action.action_type,
                        mark,
                        action.description
                    );
                }
            }
        }
        Commands::Delegate {
            session,
            task_type,
            role,
            description,
            priority,
            depends_on,
            context,
        } => {
            let context = match context {
                Some(raw) => serde_json::from_str(&raw)?,
                None => serde_json::json!({}),
            };
            let resp = client
                .delegate_task(
                    &SessionId::new(session),
                    &DelegateTaskRequest {
                        description,
                        task_type,
                        target_role: role,
                        priority,
                        depends_on: depends_on.into_iter().map(TaskId::new).collect(),
                        context,
                    },
                )
                .await?;
            if json {
                print_json(&resp)?;
            } else {
                println!("Delegated task {}", resp.task_id);
            }
        }
        Commands::Audit {
            session,
            task,
            verdict,
            notes,
            reject,
        } => {
            let resp = client
                .audit_task(
                    &SessionId::new(session),
                    &AuditTaskRequest {
                        task_id: TaskId::new(task),
                        verdict,
                        notes,
                        approved: !reject,
                    },
                )
                .await?;
            if json {
                print_json(&resp)?;
            } else if resp.applied {
                println!("Audit applied to task {}", resp.task_id);
            } else {
                println!("Audit recorded; task {} was already finished", resp.task_id);
            }
        }
        Commands::Summary { id } => {
            let summary = client.session_summary(&SessionId::new(id)).await?;
            if json {
                print_json(&summary)?;
            } else {
                print_summary(&summary);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_task(task: &TaskResponse) {
    println!("  ID:         {}", task.task_id);
    println!("  Type:       {}", task.task_type);
    println!("  Status:     {}", task.status);
    println!("  Priority:   {}", task.priority);
    if let Some(role) = &task.assigned_to_role {
        println!("  Role:       {role}");
    }
    if let Some(worker) = &task.assigned_worker_id {
        println!("  Worker:     {worker}");
    }
    println!("  Created:    {}", format_timestamp(task.created_at));
    if let Some(ms) = task.execution_time_ms {
        println!("  Duration:   {:.1}s", ms as f64 / 1000.0);
    }
    println!("  Description: {}", task.description);
    if let Some(error) = &task.error_message {
        println!("  Error:      {error}");
    }
    if let Some(output) = &task.output_data {
        println!("  Output:");
        println!("{}", serde_json::to_string_pretty(output).unwrap_or_default());
    }
}

fn print_task_table(tasks: &[TaskResponse]) {
    println!("Tasks ({}):", tasks.len());
    println!(
        "{:<36}  {:<10}  {:<12}  {:<3}  {}",
        "ID", "STATUS", "TYPE", "PRI", "CREATED"
    );
    println!("{}", "-".repeat(84));

    for task in tasks {
        println!(
            "{:<36}  {:<10}  {:<12}  {:<3}  {}",
            task.task_id,
            task.status,
            task.task_type,
            task.priority,
            format_timestamp(task.created_at)
        );
    }
}

fn print_summary(summary: &SessionSummaryResponse) {
    println!("Session {}", summary.session_id);
    println!("  Tasks:    {}", summary.total_tasks);
    for (status, count) in &summary.task_counts_by_status {
        println!("    {status:<10} {count}");
    }
    println!("  By role:");
    for (role, count) in &summary.task_counts_by_role {
        println!("    {role:<10} {count}");
    }
    println!("  Actions:  {}", summary.action_count);

    if !summary.recent_actions.is_empty() {
        println!("  Recent actions:");
        for action in &summary.recent_actions {
            println!("    - [{}] {}", action.action_type, action.description);
        }
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_audit_defaults_to_approve() {
        let cli = Cli::parse_from([
            "taskrelay", "audit", "--session", "s1", "--task", "t1", "--verdict", "ok",
        ]);
        match cli.command {
            Commands::Audit { reject, notes, .. } => {
                assert!(!reject);
                assert_eq!(notes, "");
            }
            _ => panic!("expected audit"),
        }
    }

    #[test]
    fn test_delegate_collects_dependencies() {
        let cli = Cli::parse_from([
            "taskrelay",
            "--json",
            "delegate",
            "-s",
            "s1",
            "-t",
            "code",
            "-r",
            "executor",
            "-d",
            "Fix it",
            "--depends-on",
            "a",
            "--depends-on",
            "b",
        ]);
        assert!(cli.json);
        match cli.command {
            Commands::Delegate {
                depends_on,
                priority,
                ..
            } => {
                assert_eq!(depends_on, vec!["a", "b"]);
                assert_eq!(priority, 5);
            }
            _ => panic!("expected delegate"),
        }
    }
}
