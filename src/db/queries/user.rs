use axum::extract::{Extension, State};
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::db::models::user::{Role, User};
use crate::middleware::auth::UserPermissions;
use crate::utils::api_response::ApiResponse;

/// Get the current user's account.
#[utoipa::path(
    get,
    path = "/users/me",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 404, description = "Account no longer exists")
    ),
    tag = "Users",
    security(("bearerAuth" = []))
)]
pub async fn get_current_user(
    State(state): State<AppState>,
    Extension(user): Extension<UserPermissions>,
) -> Result<ApiResponse<User>, ApiResponse<()>> {
    let account = state.users.get(user.user_id).await?;
    Ok(ApiResponse::ok("User retrieved", account))
}

/// Delete the caller's own worker account.
///
/// Requests the worker submitted are kept.
#[utoipa::path(
    delete,
    path = "/users/me",
    responses(
        (status = 200, description = "Account deleted", body = User),
        (status = 403, description = "Fixed accounts cannot be deleted"),
        (status = 404, description = "Account no longer exists")
    ),
    tag = "Users",
    security(("bearerAuth" = []))
)]
pub async fn delete_current_user(
    State(state): State<AppState>,
    Extension(user): Extension<UserPermissions>,
) -> Result<ApiResponse<User>, ApiResponse<()>> {
    user.require(&[Role::Worker], "Only worker accounts can be deleted")?;
    let removed = state.users.remove(user.user_id).await?;
    Ok(ApiResponse::ok("Account deleted", removed))
}

/// List all accounts (inspectors and contractors only).
#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "All accounts", body = [User]),
        (status = 403, description = "Caller is a worker")
    ),
    tag = "Users",
    security(("bearerAuth" = []))
)]
pub async fn list_users(
    State(state): State<AppState>,
    Extension(user): Extension<UserPermissions>,
) -> Result<ApiResponse<Vec<User>>, ApiResponse<()>> {
    user.require(&[Role::Inspector, Role::Contractor], "Only staff can list accounts")?;
    let users = state.users.list().await?;
    Ok(ApiResponse::ok("Users retrieved", users))
}

#[derive(OpenApi)]
#[openapi(
    paths(get_current_user, delete_current_user, list_users),
    components(schemas(User, Role)),
    tags(
        (name = "Users", description = "Account endpoints")
    )
)]
pub struct UserDoc;
