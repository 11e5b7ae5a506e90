//! Municipal service-order backend.
//!
//! Workers photograph a problem, the inspector approves or rejects it, the
//! contractor executes it and the worker closes it with a final photo.

pub mod api;
pub mod app_state;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod utils;
pub mod workflow;

use axum::extract::DefaultBodyLimit;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::Router;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::auth::AuthDoc;
use crate::app_state::AppState;
use crate::db::queries::requests::RequestDoc;
use crate::db::queries::user::UserDoc;
use crate::middleware::auth::jwt_middleware;
use crate::middleware::request_logger::log_requests;
use crate::middleware::timeout::enforce_timeout;

/// Merged OpenAPI document served at `/api-docs/openapi.json`.
pub fn api_doc() -> utoipa::openapi::OpenApi {
    AuthDoc::openapi()
        .merge_from(UserDoc::openapi())
        .merge_from(RequestDoc::openapi())
}

pub fn build_router(state: AppState) -> Router {
    // Public routes
    let public_routes = Router::new().merge(api::auth::auth_routes());

    // Private routes
    let private_routes = Router::new()
        .merge(api::user::user_routes())
        .merge(api::requests::request_routes())
        .route_layer(from_fn_with_state(state.clone(), jwt_middleware));

    Router::new()
        .merge(api::health::health_routes())
        .merge(public_routes)
        .merge(private_routes)
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", api_doc()))
        .layer(DefaultBodyLimit::max(state.config.body_limit()))
        .layer(from_fn_with_state(state.config.request_timeout, enforce_timeout))
        .layer(CorsLayer::permissive())
        .layer(from_fn(log_requests))
        .with_state(state)
}
