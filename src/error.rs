use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::db::store::StoreError;
use crate::utils::api_response::ApiResponse;
use crate::workflow::TransitionDenied;

/// Errors surfaced to callers of the service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("transition not permitted: {0}")]
    TransitionDenied(TransitionDenied),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("dependency failure: {0}")]
    Dependency(String),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::TransitionDenied(_) | ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Dependency(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Stable machine-readable tag, rendered as `errors.kind`.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::TransitionDenied(_) => "transition_not_permitted",
            ServiceError::Forbidden(_) => "forbidden",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::Unauthorized(_) => "unauthorized",
            ServiceError::Dependency(_) => "dependency_failure",
        }
    }
}

impl From<TransitionDenied> for ServiceError {
    fn from(denied: TransitionDenied) -> Self {
        if denied.is_payload_problem() {
            ServiceError::Validation(denied.to_string())
        } else {
            ServiceError::TransitionDenied(denied)
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RevisionMismatch { .. } => ServiceError::Conflict(
                "the store was modified concurrently; reload and try again".to_string(),
            ),
            other => ServiceError::Dependency(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        ServiceError::Validation(format!("invalid request body: {}", rejection.body_text()))
    }
}

impl From<ServiceError> for ApiResponse<()> {
    fn from(err: ServiceError) -> Self {
        ApiResponse::error(
            err.status_code(),
            err.to_string(),
            Some(json!({ "kind": err.kind() })),
        )
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        ApiResponse::<()>::from(self).into_response()
    }
}
