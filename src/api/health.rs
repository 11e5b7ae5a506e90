use axum::{extract::State, routing::get, Json, Router};
use serde_json::json;

use crate::app_state::AppState;
use crate::utils::api_response::ApiResponse;

/// Defines health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health/live", get(liveness_check)) // ✅ Liveness check
        .route("/health/ready", get(readiness_check)) // ✅ Readiness check
}

/// **Liveness Check (Basic Check)**
/// - ✅ Verifies that the API is running
/// - ❌ Does NOT touch the store
async fn liveness_check() -> Json<serde_json::Value> {
    Json(json!({ "success": true, "message": "API is live" }))
}

/// **Readiness Check (Store Connectivity Check)**
/// - ✅ Loads the document through the configured backend
/// - ❌ Returns `503` if the store is unreachable or times out
async fn readiness_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiResponse<()>> {
    state.store.ping().await?;
    Ok(Json(json!({
        "success": true,
        "message": "API is ready",
        "store": state.store.backend(),
    })))
}
