use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::app_state::AppState;
use crate::db::queries::requests::*;

pub fn request_routes() -> Router<AppState> {
    Router::new()
        .route("/requests", post(create_request))
        .route("/requests", get(list_requests))
        .route("/requests/all", get(list_all_requests))
        .route("/requests/{id}", get(get_request))
        .route("/requests/{id}", patch(update_request_status))
}
