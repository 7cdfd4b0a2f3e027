//! Prometheus metrics collection and formatting.
//!
//! This module provides metrics in Prometheus text exposition format.

use std::fmt::Write;
use std::sync::Arc;

use tracing::warn;

use taskrelay_core::TaskStatus;

use crate::state::AppState;

/// Collect all metrics from the store and format as Prometheus text.
///
/// Sections whose query fails are skipped.
pub async fn collect_metrics(state: &Arc<AppState>) -> String {
    let mut output = String::new();

    collect_task_metrics(state, &mut output).await;
    collect_dashboard_metrics(state, &mut output).await;
    collect_store_metrics(state, &mut output).await;

    output
}

/// Collect task metrics by status.
async fn collect_task_metrics(state: &Arc<AppState>, output: &mut String) {
    let counts = match state.queue.counts_by_status().await {
        Ok(counts) => counts,
        Err(e) => {
            warn!(error = %e, "Failed to collect task metrics");
            return;
        }
    };

    writeln!(output, "# HELP taskrelay_tasks Number of tasks by status").ok();
    writeln!(output, "# TYPE taskrelay_tasks gauge").ok();
    for status in TaskStatus::ALL {
        let count = counts.get(&status).copied().unwrap_or(0);
        writeln!(output, "taskrelay_tasks{{status=\"{status}\"}} {count}").ok();
    }
}

/// Collect throughput over the last hour.
async fn collect_dashboard_metrics(state: &Arc<AppState>, output: &mut String) {
    let dashboard = match state.queue.dashboard().await {
        Ok(dashboard) => dashboard,
        Err(e) => {
            warn!(error = %e, "Failed to collect dashboard metrics");
            return;
        }
    };

    writeln!(
        output,
        "# HELP taskrelay_tasks_finished_last_hour Tasks that finished in the last hour by outcome"
    )
    .ok();
    writeln!(output, "# TYPE taskrelay_tasks_finished_last_hour gauge").ok();
    writeln!(
        output,
        "taskrelay_tasks_finished_last_hour{{outcome=\"completed\"}} {}",
        dashboard.completed_last_hour
    )
    .ok();
    writeln!(
        output,
        "taskrelay_tasks_finished_last_hour{{outcome=\"failed\"}} {}",
        dashboard.failed_last_hour
    )
    .ok();

    if let Some(avg) = dashboard.avg_execution_time_sec {
        writeln!(
            output,
            "# HELP taskrelay_task_execution_seconds_avg Mean execution time of completed tasks"
        )
        .ok();
        writeln!(output, "# TYPE taskrelay_task_execution_seconds_avg gauge").ok();
        writeln!(output, "taskrelay_task_execution_seconds_avg {avg:.3}").ok();
    }
}

/// Collect row counts.
async fn collect_store_metrics(state: &Arc<AppState>, output: &mut String) {
    let counts = match state.store.counts().await {
        Ok(counts) => counts,
        Err(e) => {
            warn!(error = %e, "Failed to collect store metrics");
            return;
        }
    };

    writeln!(output, "# HELP taskrelay_sessions_total Sessions ever created").ok();
    writeln!(output, "# TYPE taskrelay_sessions_total counter").ok();
    writeln!(output, "taskrelay_sessions_total {}", counts.sessions).ok();

    writeln!(output, "# HELP taskrelay_actions_total Actions in the audit log").ok();
    writeln!(output, "# TYPE taskrelay_actions_total counter").ok();
    writeln!(output, "taskrelay_actions_total {}", counts.actions).ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::context::StaticContext;
    use taskrelay_core::NewTask;
    use taskrelay_store::SqliteStore;

    #[tokio::test]
    async fn test_metrics_list_every_status() {
        let store = Arc::new(SqliteStore::connect("sqlite::memory:").await.unwrap());
        let state = AppState::new(store, Arc::new(StaticContext::default()), &Config::default());
        state.queue.create(NewTask::new("code", "a")).await.unwrap();
        state.queue.create(NewTask::new("code", "b")).await.unwrap();

        let output = collect_metrics(&state).await;

        assert!(output.contains("# TYPE taskrelay_tasks gauge"));
        assert!(output.contains("taskrelay_tasks{status=\"pending\"} 2"));
        assert!(output.contains("taskrelay_tasks{status=\"blocked\"} 0"));
        assert!(output.contains("taskrelay_tasks_finished_last_hour{outcome=\"completed\"} 0"));
        assert!(output.contains("taskrelay_sessions_total 0"));
        assert!(!output.contains("taskrelay_task_execution_seconds_avg"));
    }
}
