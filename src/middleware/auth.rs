use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use tracing::{debug, warn};

use crate::api::auth::Claims;
use crate::app_state::AppState;
use crate::db::models::user::{Role, User};
use crate::error::ServiceError;
use crate::workflow::Viewer;

/// ✅ **JWT Middleware** (Handles Token Authentication)
///
/// On success the request carries both the raw [`Claims`] and the derived
/// [`UserPermissions`] as extensions.
pub async fn jwt_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let unauthorized = |message: &str| {
        warn!("{message}");
        ServiceError::Unauthorized(message.to_string()).into_response()
    };

    // Step 1: Extract Authorization header
    let auth_header = req
        .headers()
        .get("Authorization")
        .ok_or_else(|| unauthorized("Missing Authorization header"))?;

    // Step 2: Convert header to string and strip "Bearer "
    let token = auth_header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| unauthorized("Invalid Authorization header format"))?;

    // Step 3: Decode the JWT token
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| unauthorized(&format!("Invalid token: {e}")))?;

    // Step 4: The account must still exist; role and name come from the store
    let user_id = token_data.claims.user_id().map_err(|e| e.into_response())?;
    let account = match state.users.resolve(user_id).await {
        Ok(account) => account,
        Err(ServiceError::NotFound(_)) => {
            return Err(unauthorized("Account no longer exists"));
        }
        Err(e) => return Err(e.into_response()),
    };
    let permissions = UserPermissions::from_user(&account);

    // Step 5: Insert claims into request extensions
    debug!(user_id = permissions.user_id, role = %permissions.role, "JWT decoded");
    req.extensions_mut().insert(token_data.claims);
    req.extensions_mut().insert(permissions);

    Ok(next.run(req).await)
}

/// ✅ **Authenticated caller**, resolved from the token.
#[derive(Debug, Clone)]
pub struct UserPermissions {
    pub user_id: i32,
    pub name: String,
    pub role: Role,
}

impl UserPermissions {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            name: user.name.clone(),
            role: user.role,
        }
    }

    pub fn is_worker(&self) -> bool {
        self.role == Role::Worker
    }

    /// Fails with `Forbidden` unless the caller has one of `roles`.
    pub fn require(&self, roles: &[Role], message: &str) -> Result<(), ServiceError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            warn!(user_id = self.user_id, role = %self.role, "{message}");
            Err(ServiceError::Forbidden(message.to_string()))
        }
    }

    pub fn viewer(&self) -> Viewer {
        Viewer {
            id: self.user_id,
            role: self.role,
        }
    }
}
