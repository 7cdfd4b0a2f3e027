//! SQLite implementation of [`Store`].
//!
//! Timestamps are stored as fixed-width RFC 3339 text (microseconds, `Z`) so
//! that string order equals time order. JSON documents are stored as text.
//!
//! The claim relies on SQLite serialising writers: the claiming `UPDATE`
//! takes the write lock before it reads, so two claimants can never select
//! the same pending row. Concurrent processes wait on the lock through the
//! busy timeout instead of failing.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use taskrelay_core::{
    Action, ActionId, Dashboard, Session, SessionId, SessionStatus, StoreCounts, Task,
    TaskFilter, TaskId, TaskStatus, TaskUpdate, WorkerId,
};

use crate::store::{ActionFilter, StaleSweep, Store};
use crate::StoreError;

/// Error message written on tasks failed by the stale-lease sweep.
pub const LEASE_EXPIRED: &str = "lease expired";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const TASK_COLUMNS: &str = "id, session_id, task_type, description, priority, status, \
     assigned_to_role, assigned_worker_id, depends_on, required_context, timeout_seconds, \
     max_retries, retry_count, progress, created_at, started_at, completed_at, heartbeat_at, \
     output_data, error_message";

const SESSION_COLUMNS: &str = "id, agent_platform, agent_role, parent_session_id, \
     landing_context, status, created_at, last_active";

const ACTION_COLUMNS: &str = "id, session_id, task_id, action_type, description, input_data, \
     output_data, success, execution_time_ms, executed_at";

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS sessions (
        id TEXT PRIMARY KEY,
        agent_platform TEXT NOT NULL,
        agent_role TEXT NOT NULL,
        parent_session_id TEXT,
        landing_context TEXT NOT NULL DEFAULT '{}',
        status TEXT NOT NULL DEFAULT 'active',
        created_at TEXT NOT NULL,
        last_active TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS tasks (
        id TEXT PRIMARY KEY,
        session_id TEXT,
        task_type TEXT NOT NULL,
        description TEXT NOT NULL,
        priority INTEGER NOT NULL DEFAULT 5,
        status TEXT NOT NULL DEFAULT 'pending',
        assigned_to_role TEXT,
        assigned_worker_id TEXT,
        depends_on TEXT NOT NULL DEFAULT '[]',
        required_context TEXT NOT NULL DEFAULT '{}',
        timeout_seconds INTEGER NOT NULL DEFAULT 300,
        max_retries INTEGER NOT NULL DEFAULT 3,
        retry_count INTEGER NOT NULL DEFAULT 0,
        progress INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        started_at TEXT,
        completed_at TEXT,
        heartbeat_at TEXT,
        output_data TEXT,
        error_message TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_tasks_status_created ON tasks(status, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_tasks_session ON tasks(session_id)",
    "CREATE TABLE IF NOT EXISTS actions (
        id TEXT PRIMARY KEY,
        session_id TEXT NOT NULL,
        task_id TEXT,
        action_type TEXT NOT NULL,
        description TEXT NOT NULL,
        input_data TEXT NOT NULL DEFAULT '{}',
        output_data TEXT NOT NULL DEFAULT '{}',
        success INTEGER NOT NULL DEFAULT 1,
        execution_time_ms INTEGER,
        executed_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_actions_session ON actions(session_id, executed_at)",
    "CREATE INDEX IF NOT EXISTS idx_actions_task ON actions(task_id)",
];

/// sqlx-backed SQLite store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `url` and apply the schema.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let in_memory = url.contains(":memory:");
        let mut opts = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .busy_timeout(BUSY_TIMEOUT);
        if !in_memory {
            opts = opts.journal_mode(SqliteJournalMode::Wal);
        }

        // Every in-memory connection is its own database.
        let pool = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(opts)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(opts)
                .await?
        };

        info!(url = %url, "Opened task store");
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool and apply the schema.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Get the underlying database pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("Store schema ready");
        Ok(())
    }
}

fn ts(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| StoreError::Decode(format!("timestamp {raw:?}: {e}")))
}

fn parse_opt_ts(raw: Option<String>) -> Result<Option<DateTime<Utc>>, StoreError> {
    raw.as_deref().map(parse_ts).transpose()
}

fn int<T: TryFrom<i64>>(row: &SqliteRow, column: &str) -> Result<T, StoreError> {
    let raw: i64 = row.try_get(column)?;
    T::try_from(raw).map_err(|_| StoreError::Decode(format!("{column} out of range: {raw}")))
}

fn task_from_row(row: &SqliteRow) -> Result<Task, StoreError> {
    let status: String = row.try_get("status")?;
    let depends_on: String = row.try_get("depends_on")?;
    let required_context: String = row.try_get("required_context")?;
    let output_data: Option<String> = row.try_get("output_data")?;

    Ok(Task {
        id: TaskId::new(row.try_get::<String, _>("id")?),
        session_id: row
            .try_get::<Option<String>, _>("session_id")?
            .map(SessionId::new),
        task_type: row.try_get("task_type")?,
        description: row.try_get("description")?,
        priority: int(row, "priority")?,
        status: TaskStatus::from_str(&status).map_err(|e| StoreError::Decode(e.to_string()))?,
        assigned_to_role: row.try_get("assigned_to_role")?,
        assigned_worker_id: row
            .try_get::<Option<String>, _>("assigned_worker_id")?
            .map(WorkerId::new),
        depends_on: serde_json::from_str(&depends_on)?,
        required_context: serde_json::from_str(&required_context)?,
        timeout_seconds: int(row, "timeout_seconds")?,
        max_retries: int(row, "max_retries")?,
        retry_count: int(row, "retry_count")?,
        progress: int(row, "progress")?,
        created_at: parse_ts(&row.try_get::<String, _>("created_at")?)?,
        started_at: parse_opt_ts(row.try_get("started_at")?)?,
        completed_at: parse_opt_ts(row.try_get("completed_at")?)?,
        heartbeat_at: parse_opt_ts(row.try_get("heartbeat_at")?)?,
        output_data: output_data
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?,
        error_message: row.try_get("error_message")?,
    })
}

fn task_ids(rows: &[SqliteRow]) -> Result<Vec<TaskId>, StoreError> {
    rows.iter()
        .map(|row| {
            row.try_get::<String, _>("id")
                .map(TaskId::new)
                .map_err(StoreError::from)
        })
        .collect()
}

fn session_from_row(row: &SqliteRow) -> Result<Session, StoreError> {
    let status: String = row.try_get("status")?;
    let landing_context: String = row.try_get("landing_context")?;

    Ok(Session {
        id: SessionId::new(row.try_get::<String, _>("id")?),
        agent_platform: row.try_get("agent_platform")?,
        agent_role: row.try_get("agent_role")?,
        parent_session_id: row
            .try_get::<Option<String>, _>("parent_session_id")?
            .map(SessionId::new),
        landing_context: serde_json::from_str(&landing_context)?,
        status: SessionStatus::from_str(&status)
            .map_err(|e| StoreError::Decode(e.to_string()))?,
        created_at: parse_ts(&row.try_get::<String, _>("created_at")?)?,
        last_active: parse_ts(&row.try_get::<String, _>("last_active")?)?,
    })
}

fn action_from_row(row: &SqliteRow) -> Result<Action, StoreError> {
    let input_data: String = row.try_get("input_data")?;
    let output_data: String = row.try_get("output_data")?;

    Ok(Action {
        id: ActionId::new(row.try_get::<String, _>("id")?),
        session_id: SessionId::new(row.try_get::<String, _>("session_id")?),
        task_id: row.try_get::<Option<String>, _>("task_id")?.map(TaskId::new),
        action_type: row.try_get("action_type")?,
        description: row.try_get("description")?,
        input_data: serde_json::from_str(&input_data)?,
        output_data: serde_json::from_str(&output_data)?,
        success: row.try_get("success")?,
        execution_time_ms: row.try_get("execution_time_ms")?,
        executed_at: parse_ts(&row.try_get::<String, _>("executed_at")?)?,
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    async fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO sessions (id, agent_platform, agent_role, parent_session_id, \
             landing_context, status, created_at, last_active) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(session.id.as_str())
        .bind(&session.agent_platform)
        .bind(&session.agent_role)
        .bind(session.parent_session_id.as_ref().map(SessionId::as_str))
        .bind(serde_json::to_string(&session.landing_context)?)
        .bind(session.status.as_str())
        .bind(ts(session.created_at))
        .bind(ts(session.last_active))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(session_from_row).transpose()
    }

    async fn touch_session(
        &self,
        id: &SessionId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE sessions SET last_active = ? WHERE id = ?")
            .bind(ts(now))
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn end_session(
        &self,
        id: &SessionId,
        status: SessionStatus,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE sessions SET status = ?, last_active = ? WHERE id = ? AND status = 'active'",
        )
        .bind(status.as_str())
        .bind(ts(now))
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_task(&self, task: &Task) -> Result<(), StoreError> {
        let output_data = task
            .output_data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            "INSERT INTO tasks (id, session_id, task_type, description, priority, status, \
             assigned_to_role, assigned_worker_id, depends_on, required_context, \
             timeout_seconds, max_retries, retry_count, progress, created_at, started_at, \
             completed_at, heartbeat_at, output_data, error_message) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(task.id.as_str())
        .bind(task.session_id.as_ref().map(SessionId::as_str))
        .bind(&task.task_type)
        .bind(&task.description)
        .bind(i64::from(task.priority))
        .bind(task.status.as_str())
        .bind(task.assigned_to_role.as_deref())
        .bind(task.assigned_worker_id.as_ref().map(WorkerId::as_str))
        .bind(serde_json::to_string(&task.depends_on)?)
        .bind(serde_json::to_string(&task.required_context)?)
        .bind(i64::from(task.timeout_seconds))
        .bind(i64::from(task.max_retries))
        .bind(i64::from(task.retry_count))
        .bind(i64::from(task.progress))
        .bind(ts(task.created_at))
        .bind(task.started_at.map(ts))
        .bind(task.completed_at.map(ts))
        .bind(task.heartbeat_at.map(ts))
        .bind(output_data)
        .bind(task.error_message.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(task_from_row).transpose()
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        let mut sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE 1 = 1");
        if filter.status.is_some() {
            sql.push_str(" AND status = ?");
        }
        if filter.session_id.is_some() {
            sql.push_str(" AND session_id = ?");
        }
        sql.push_str(" ORDER BY created_at DESC, rowid DESC LIMIT ?");

        let mut query = sqlx::query(&sql);
        if let Some(status) = filter.status {
            query = query.bind(status.as_str());
        }
        if let Some(session_id) = &filter.session_id {
            query = query.bind(session_id.as_str());
        }
        let rows = query
            .bind(i64::from(filter.clamped_limit()))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(task_from_row).collect()
    }

    async fn tasks_for_session(&self, session_id: &SessionId) -> Result<Vec<Task>, StoreError> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE session_id = ? \
             ORDER BY created_at DESC, rowid DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(session_id.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(task_from_row).collect()
    }

    async fn claim_next_task(
        &self,
        worker: &WorkerId,
        now: DateTime<Utc>,
    ) -> Result<Option<Task>, StoreError> {
        let sql = format!(
            "UPDATE tasks SET status = 'running', assigned_worker_id = ?, started_at = ?, \
             heartbeat_at = ? \
             WHERE id = (SELECT id FROM tasks WHERE status = 'pending' \
                         ORDER BY created_at, rowid LIMIT 1) \
               AND status = 'pending' \
             RETURNING {TASK_COLUMNS}"
        );
        let now = ts(now);

        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(&sql)
            .bind(worker.as_str())
            .bind(&now)
            .bind(&now)
            .fetch_optional(&mut *tx)
            .await?;
        tx.commit().await?;

        row.as_ref().map(task_from_row).transpose()
    }

    async fn update_task(
        &self,
        id: &TaskId,
        update: &TaskUpdate,
        allowed_from: &[TaskStatus],
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        if allowed_from.is_empty() {
            return Ok(false);
        }
        let sources = allowed_from
            .iter()
            .map(|status| format!("'{}'", status.as_str()))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!(
            "UPDATE tasks SET status = ?, \
             progress = COALESCE(?, progress), \
             output_data = COALESCE(?, output_data), \
             error_message = COALESCE(?, error_message), \
             started_at = COALESCE(started_at, ?), \
             completed_at = COALESCE(?, completed_at) \
             WHERE id = ? AND status IN ({sources})"
        );
        if update.worker.is_some() {
            sql.push_str(" AND status = 'running' AND assigned_worker_id = ?");
        }

        let output_data = update
            .output_data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let started_at = (update.status == TaskStatus::Running).then(|| ts(now));
        let completed_at = update.status.is_terminal().then(|| ts(now));

        let mut query = sqlx::query(&sql)
            .bind(update.status.as_str())
            .bind(update.effective_progress().map(i64::from))
            .bind(output_data)
            .bind(update.error_message.as_deref())
            .bind(started_at)
            .bind(completed_at)
            .bind(id.as_str());
        if let Some(worker) = &update.worker {
            query = query.bind(worker.as_str());
        }

        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn cancel_task(&self, id: &TaskId, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE tasks SET status = 'cancelled', completed_at = ? \
             WHERE id = ? AND status = 'pending'",
        )
        .bind(ts(now))
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn heartbeat_task(
        &self,
        id: &TaskId,
        worker: &WorkerId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE tasks SET heartbeat_at = ? \
             WHERE id = ? AND status = 'running' AND assigned_worker_id = ?",
        )
        .bind(ts(now))
        .bind(id.as_str())
        .bind(worker.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn requeue_stale(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<StaleSweep, StoreError> {
        let cutoff = ts(cutoff);
        let mut tx = self.pool.begin().await?;

        let failed = sqlx::query(
            "UPDATE tasks SET status = 'failed', completed_at = ?, error_message = ? \
             WHERE status = 'running' AND COALESCE(heartbeat_at, started_at) < ? \
               AND retry_count >= max_retries \
             RETURNING id",
        )
        .bind(ts(now))
        .bind(LEASE_EXPIRED)
        .bind(&cutoff)
        .fetch_all(&mut *tx)
        .await?;

        let requeued = sqlx::query(
            "UPDATE tasks SET status = 'pending', assigned_worker_id = NULL, started_at = NULL, \
             heartbeat_at = NULL, progress = 0, retry_count = retry_count + 1 \
             WHERE status = 'running' AND COALESCE(heartbeat_at, started_at) < ? \
             RETURNING id",
        )
        .bind(&cutoff)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(StaleSweep {
            requeued: task_ids(&requeued)?,
            failed: task_ids(&failed)?,
        })
    }

    async fn task_counts_by_status(&self) -> Result<BTreeMap<TaskStatus, u64>, StoreError> {
        let mut counts: BTreeMap<TaskStatus, u64> =
            TaskStatus::ALL.iter().map(|status| (*status, 0)).collect();

        let rows = sqlx::query("SELECT status, COUNT(*) AS n FROM tasks GROUP BY status")
            .fetch_all(&self.pool)
            .await?;
        for row in rows {
            let status: String = row.try_get("status")?;
            let status =
                TaskStatus::from_str(&status).map_err(|e| StoreError::Decode(e.to_string()))?;
            counts.insert(status, int(&row, "n")?);
        }
        Ok(counts)
    }

    async fn dashboard(&self, now: DateTime<Utc>) -> Result<Dashboard, StoreError> {
        let hour_ago = ts(now - chrono::Duration::hours(1));

        let row = sqlx::query(
            "SELECT \
               COALESCE(SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END), 0) AS queued, \
               COALESCE(SUM(CASE WHEN status = 'running' THEN 1 ELSE 0 END), 0) AS running, \
               COALESCE(SUM(CASE WHEN status = 'completed' AND completed_at >= ? \
                            THEN 1 ELSE 0 END), 0) AS completed_last_hour, \
               COALESCE(SUM(CASE WHEN status = 'failed' AND completed_at >= ? \
                            THEN 1 ELSE 0 END), 0) AS failed_last_hour, \
               COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0) \
                 AS total_completed \
             FROM tasks",
        )
        .bind(&hour_ago)
        .bind(&hour_ago)
        .fetch_one(&self.pool)
        .await?;

        let durations = sqlx::query(
            "SELECT started_at, completed_at FROM tasks \
             WHERE status = 'completed' AND completed_at >= ? AND started_at IS NOT NULL",
        )
        .bind(&hour_ago)
        .fetch_all(&self.pool)
        .await?;

        let mut total_secs = 0.0;
        for duration in &durations {
            let started = parse_ts(&duration.try_get::<String, _>("started_at")?)?;
            let completed = parse_ts(&duration.try_get::<String, _>("completed_at")?)?;
            total_secs += (completed - started).num_milliseconds().max(0) as f64 / 1000.0;
        }
        let avg_execution_time_sec =
            (!durations.is_empty()).then(|| total_secs / durations.len() as f64);

        Ok(Dashboard {
            queued: int(&row, "queued")?,
            running: int(&row, "running")?,
            completed_last_hour: int(&row, "completed_last_hour")?,
            failed_last_hour: int(&row, "failed_last_hour")?,
            total_completed: int(&row, "total_completed")?,
            avg_execution_time_sec,
        })
    }

    async fn counts(&self) -> Result<StoreCounts, StoreError> {
        let row = sqlx::query(
            "SELECT (SELECT COUNT(*) FROM sessions) AS sessions, \
                    (SELECT COUNT(*) FROM tasks) AS tasks, \
                    (SELECT COUNT(*) FROM actions) AS actions",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StoreCounts {
            sessions: int(&row, "sessions")?,
            tasks: int(&row, "tasks")?,
            actions: int(&row, "actions")?,
        })
    }

    async fn append_action(&self, action: &Action) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO actions (id, session_id, task_id, action_type, description, \
             input_data, output_data, success, execution_time_ms, executed_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(action.id.as_str())
        .bind(action.session_id.as_str())
        .bind(action.task_id.as_ref().map(TaskId::as_str))
        .bind(&action.action_type)
        .bind(&action.description)
        .bind(serde_json::to_string(&action.input_data)?)
        .bind(serde_json::to_string(&action.output_data)?)
        .bind(action.success)
        .bind(action.execution_time_ms)
        .bind(ts(action.executed_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_actions(&self, filter: &ActionFilter) -> Result<Vec<Action>, StoreError> {
        let mut sql = format!("SELECT {ACTION_COLUMNS} FROM actions WHERE 1 = 1");
        if filter.session_id.is_some() {
            sql.push_str(" AND session_id = ?");
        }
        if filter.task_id.is_some() {
            sql.push_str(" AND task_id = ?");
        }
        sql.push_str(" ORDER BY executed_at DESC, rowid DESC LIMIT ?");

        let mut query = sqlx::query(&sql);
        if let Some(session_id) = &filter.session_id {
            query = query.bind(session_id.as_str());
        }
        if let Some(task_id) = &filter.task_id {
            query = query.bind(task_id.as_str());
        }
        // A negative LIMIT is unbounded in SQLite.
        let limit = filter.limit.map(i64::from).unwrap_or(-1);
        let rows = query.bind(limit).fetch_all(&self.pool).await?;

        let mut actions = rows
            .iter()
            .map(action_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        actions.reverse();
        Ok(actions)
    }
}
