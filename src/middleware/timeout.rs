use std::time::Duration;

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::error::ServiceError;

/// Bounds the whole request. A request that runs past `limit` is answered
/// with a `dependency_failure` envelope.
pub async fn enforce_timeout(State(limit): State<Duration>, req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match tokio::time::timeout(limit, next.run(req)).await {
        Ok(response) => response,
        Err(_) => {
            warn!(%method, %path, ?limit, "request timed out");
            ServiceError::Dependency(format!("request timed out after {}s", limit.as_secs())).into_response()
        }
    }
}
