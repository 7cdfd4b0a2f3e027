//! Task queue handlers.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::Utc;

use taskrelay_api::{
    ActionResponse, CancelTaskResponse, CreateTaskRequest, DashboardResponse, ListTasksQuery,
    TaskResponse,
};
use taskrelay_core::{SessionId, TaskFilter, TaskId, TaskStatus};

use crate::http::ApiError;
use crate::state::AppState;

/// Enqueue a new task.
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskResponse>), ApiError> {
    let Json(req) = body?;
    let new_task = req.into_new_task()?;
    let task = state.queue.create(new_task).await?;
    Ok((StatusCode::CREATED, Json(task.into())))
}

pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TaskResponse>, ApiError> {
    let task = state.queue.get(&TaskId::new(id)).await?;
    Ok(Json(task.into()))
}

/// Audit-log entries that reference a task, oldest first.
pub async fn task_actions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ActionResponse>>, ApiError> {
    let task = state.queue.get(&TaskId::new(id)).await?;
    let actions = state.audit.for_task(&task.id).await?;
    Ok(Json(actions.into_iter().map(Into::into).collect()))
}

/// List tasks, newest first.
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListTasksQuery>, QueryRejection>,
) -> Result<Json<Vec<TaskResponse>>, ApiError> {
    let Query(query) = query?;
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::parse::<TaskStatus>)
        .transpose()?;

    let filter = TaskFilter {
        status,
        session_id: query.session_id.map(SessionId::new),
        limit: query.limit,
    };
    let tasks = state.queue.list(&filter).await?;
    Ok(Json(tasks.into_iter().map(Into::into).collect()))
}

/// Cancel a task if it is still pending. Otherwise a no-op.
pub async fn cancel_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CancelTaskResponse>, ApiError> {
    let id = TaskId::new(id);
    let cancelled = state.queue.cancel(&id).await?;
    let task = state.queue.get(&id).await?;
    Ok(Json(CancelTaskResponse {
        task_id: task.id,
        cancelled,
        status: task.status,
    }))
}

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let dashboard = state.queue.dashboard().await?;
    Ok(Json(DashboardResponse::new(dashboard, Utc::now())))
}
