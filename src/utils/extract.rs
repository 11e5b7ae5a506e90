use axum::extract::FromRequest;

use crate::error::ServiceError;

/// `axum::Json`, but malformed bodies are answered through the error
/// envelope as `validation` failures.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ServiceError))]
pub struct ValidJson<T>(pub T);
