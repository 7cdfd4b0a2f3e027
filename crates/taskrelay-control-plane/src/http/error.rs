//! Mapping of domain errors onto HTTP responses.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

use taskrelay_api::ErrorResponse;
use taskrelay_core::CoreError;
use taskrelay_store::{QueueError, StoreError};

use crate::planner::PlannerError;
use crate::session::SessionError;

/// Error returned by HTTP handlers.
///
/// Every variant renders as `{ "error": "..." }`.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(self) -> String {
        match self {
            Self::NotFound(m)
            | Self::BadRequest(m)
            | Self::Conflict(m)
            | Self::Internal(m) => m,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let Self::Internal(message) = &self {
            error!(error = %message, "Request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection, "Invalid JSON in request body");
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        warn!(error = %rejection, "Invalid query string");
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueueError> for ApiError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::NotFound(_) => Self::NotFound(e.to_string()),
            QueueError::InvalidInput(_) => Self::BadRequest(e.to_string()),
            QueueError::InvalidStateTransition { .. } | QueueError::NotHeld { .. } => {
                Self::Conflict(e.to_string())
            }
            QueueError::Store(e) => e.into(),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotFound(_) => Self::NotFound(e.to_string()),
            SessionError::InvalidInput(_) => Self::BadRequest(e.to_string()),
            SessionError::Store(e) => e.into(),
        }
    }
}

impl From<PlannerError> for ApiError {
    fn from(e: PlannerError) -> Self {
        match e {
            PlannerError::NoActiveSession => Self::BadRequest(e.to_string()),
            PlannerError::Session(e) => e.into(),
            PlannerError::Queue(e) => e.into(),
            PlannerError::Store(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskrelay_core::{SessionId, TaskId, TaskStatus};

    #[test]
    fn test_error_status_mapping() {
        let not_found: ApiError = QueueError::NotFound(TaskId::new("t")).into();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let conflict: ApiError = QueueError::InvalidStateTransition {
            task_id: TaskId::new("t"),
            from: TaskStatus::Completed,
            to: TaskStatus::Failed,
        }
        .into();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let missing_session: ApiError =
            PlannerError::Session(SessionError::NotFound(SessionId::new("s"))).into();
        assert_eq!(missing_session.status(), StatusCode::NOT_FOUND);

        let bad: ApiError = CoreError::InvalidInput("priority".into()).into();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let store: ApiError = StoreError::Decode("bad row".into()).into();
        assert_eq!(store.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
