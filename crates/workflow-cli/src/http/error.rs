//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use uuid::Uuid;
use workflow_core::workflow::debug::SessionError;
use workflow_core::workflow::planner::PlanError;
use workflow_types::error::LoadError;

use super::response::ApiMeta;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// The request body did not hold a usable workflow or task definition.
    Load(LoadError),
    Session(SessionError),
    Plan(PlanError),
    BadRequest(String),
}

impl From<LoadError> for AppError {
    fn from(e: LoadError) -> Self {
        AppError::Load(e)
    }
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Plan(plan) => AppError::Plan(plan),
            other => AppError::Session(other),
        }
    }
}

impl From<PlanError> for AppError {
    fn from(e: PlanError) -> Self {
        AppError::Plan(e)
    }
}

impl AppError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Load(_) => (StatusCode::BAD_REQUEST, "INVALID_WORKFLOW"),
            AppError::Session(SessionError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND")
            }
            AppError::Session(SessionError::UnknownBreakpoint(_)) => {
                (StatusCode::NOT_FOUND, "BREAKPOINT_NOT_FOUND")
            }
            AppError::Session(SessionError::InvalidState { .. }) => {
                (StatusCode::CONFLICT, "INVALID_SESSION_STATE")
            }
            AppError::Session(SessionError::InvalidContextPath(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_CONTEXT_PATH")
            }
            AppError::Session(SessionError::Plan(_)) | AppError::Plan(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "CIRCULAR_DEPENDENCY")
            }
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Load(e) => e.to_string(),
            AppError::Session(e) => e.to_string(),
            AppError::Plan(e) => e.to_string(),
            AppError::BadRequest(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = self.message();

        tracing::debug!(code, error = %message, "request rejected");

        let body = json!({
            "data": null,
            "meta": ApiMeta::new(Uuid::now_v7().to_string(), 0),
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use workflow_types::debug::SessionState;

    #[test]
    fn test_session_errors_map_to_status_codes() {
        let not_found: AppError = SessionError::NotFound(Uuid::nil()).into();
        assert_eq!(not_found.status_and_code().0, StatusCode::NOT_FOUND);

        let conflict: AppError = SessionError::InvalidState {
            operation: "step",
            state: SessionState::Completed,
        }
        .into();
        assert_eq!(conflict.status_and_code().0, StatusCode::CONFLICT);

        let cyclic: AppError = SessionError::Plan(PlanError::CycleDetected {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        })
        .into();
        assert!(matches!(cyclic, AppError::Plan(_)));
        assert_eq!(cyclic.status_and_code().0, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_load_errors_are_bad_requests() {
        let err: AppError = LoadError::InvalidJsonInput("nope".into()).into();
        assert_eq!(err.status_and_code(), (StatusCode::BAD_REQUEST, "INVALID_WORKFLOW"));
    }
}
