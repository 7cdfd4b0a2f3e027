//! Session, delegation and audit handlers.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};

use taskrelay_api::{
    ActionResponse, AuditTaskRequest, AuditTaskResponse, CreateSessionRequest,
    CreateSessionResponse, DelegateTaskRequest, DelegateTaskResponse, ListActionsQuery,
    RecordActionRequest, SessionHistoryResponse, SessionSummaryResponse,
};
use taskrelay_core::{Action, SessionId};

use crate::http::ApiError;
use crate::planner::{Delegation, Planner};
use crate::state::AppState;

/// Start a session and return its landing brief.
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), ApiError> {
    let Json(req) = body?;
    let created = state
        .sessions
        .create_session(&req.platform, &req.role, req.parent_session_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session: created.session.into(),
            landing_brief: created.landing_brief,
            parent_missing: created.parent_missing,
        }),
    ))
}

/// Session with its tasks and actions.
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionHistoryResponse>, ApiError> {
    let history = state
        .sessions
        .get_session_history(&SessionId::new(id))
        .await?;
    Ok(Json(history.into()))
}

pub async fn delegate_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<DelegateTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DelegateTaskResponse>), ApiError> {
    let Json(req) = body?;
    let planner = attached_planner(&state, id).await?;
    let delegation = Delegation::new(req.description, req.task_type, req.target_role)
        .with_priority(req.priority)
        .with_dependencies(req.depends_on)
        .with_context(req.context);

    let task_id = planner.delegate_task(delegation).await?;
    Ok((StatusCode::CREATED, Json(DelegateTaskResponse { task_id })))
}

pub async fn audit_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<AuditTaskRequest>, JsonRejection>,
) -> Result<Json<AuditTaskResponse>, ApiError> {
    let Json(req) = body?;
    let planner = attached_planner(&state, id).await?;
    let applied = planner
        .audit_result(&req.task_id, &req.verdict, &req.notes, req.approved)
        .await?;
    Ok(Json(AuditTaskResponse {
        task_id: req.task_id,
        applied,
    }))
}

pub async fn session_summary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionSummaryResponse>, ApiError> {
    let planner = attached_planner(&state, id).await?;
    let summary = planner.summary().await?;
    Ok(Json(summary.into()))
}

/// A session's audit trail, oldest first. `limit` keeps the most recent entries.
pub async fn session_actions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    query: Result<Query<ListActionsQuery>, QueryRejection>,
) -> Result<Json<Vec<ActionResponse>>, ApiError> {
    let Query(query) = query?;
    let session = state.sessions.get_session(&SessionId::new(id)).await?;
    let actions = match query.limit {
        Some(limit) => state.audit.recent_for_session(&session.id, limit).await?,
        None => state.audit.for_session(&session.id).await?,
    };
    Ok(Json(actions.into_iter().map(Into::into).collect()))
}

/// Append an action to a session's audit trail.
pub async fn record_action(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<RecordActionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ActionResponse>), ApiError> {
    let Json(req) = body?;
    if req.action_type.trim().is_empty() {
        return Err(ApiError::BadRequest("action_type must not be empty".into()));
    }

    let mut action = Action::new(SessionId::new(id), req.action_type, req.description)
        .with_input(req.input_data)
        .with_output(req.output_data)
        .with_success(req.success);
    if let Some(task_id) = req.task_id {
        action = action.for_task(task_id);
    }
    if let Some(ms) = req.execution_time_ms {
        action = action.with_execution_time_ms(ms);
    }

    let action = state.sessions.record_action(action).await?;
    Ok((StatusCode::CREATED, Json(action.into())))
}

async fn attached_planner(state: &AppState, id: String) -> Result<Planner, ApiError> {
    let mut planner = state.planner();
    planner.attach(&SessionId::new(id)).await?;
    Ok(planner)
}
