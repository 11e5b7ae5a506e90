use axum::{
    routing::{delete, get},
    Router,
};

use crate::app_state::AppState;
use crate::db::queries::user::*;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/me", get(get_current_user))
        .route("/users/me", delete(delete_current_user))
}
