use axum::{extract::State, routing::post, Router};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::config::Config;
use crate::db::models::user::{Role, User};
use crate::db::repository::NewAccount;
use crate::error::ServiceError;
use crate::utils::api_response::ApiResponse;
use crate::utils::extract::ValidJson;

/// Represents a request to register a new worker account.
#[derive(Deserialize, Serialize, ToSchema)]
pub struct RegisterRequest {
    /// Display name
    pub name: String,
    /// Login email, unique across accounts
    pub email: String,
    /// Plain-text password, hashed before storage
    pub password: String,
}

/// JWT Claims used for authentication.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject - User ID as String
    pub sub: String,
    /// Display name, recorded as the actor in request history
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Expiration timestamp (UNIX TIME)
    pub exp: usize,
}

impl Claims {
    pub fn for_user(user: &User, ttl_secs: i64) -> Self {
        Claims {
            sub: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            exp: (chrono::Utc::now().timestamp() + ttl_secs).max(0) as usize,
        }
    }

    /// Converts `sub` (user ID) to `i32`.
    pub fn user_id(&self) -> Result<i32, ServiceError> {
        self.sub
            .parse::<i32>()
            .map_err(|_| ServiceError::Unauthorized("Invalid user ID format in token".to_string()))
    }
}

/// Represents a request to log in
#[derive(Serialize, Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Represents a successful login response returning the jwt token.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

pub fn issue_token(config: &Config, user: &User) -> Result<String, ServiceError> {
    let claims = Claims::for_user(user, config.token_ttl_secs);
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| {
        error!("❌ Token generation failed: {}", e);
        ServiceError::Dependency(format!("Token generation failed: {e}"))
    })
}

/// Handles user login
///
/// # Returns
/// * `200 OK` - Returns a JWT token and the account if authentication is successful.
/// * `401 Unauthorized` - If credentials are incorrect.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Authentication",
    request_body(
        content = LoginRequest,
        description = "User login details",
    ),
    responses(
        (status = 200, description = "Successful login", body = LoginResponse),
        (status = 401, description = "Invalid email or password"),
        (status = 503, description = "Store unavailable")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> Result<ApiResponse<LoginResponse>, ApiResponse<()>> {
    let user = state.users.authenticate(&payload.email, &payload.password).await?;
    let token = issue_token(&state.config, &user)?;

    info!("✅ Login successful for user: {}", user.email);
    Ok(ApiResponse::ok("Login successful", LoginResponse { token, user }))
}

/// Handles worker self-registration.
///
/// Inspector and Contractor accounts are fixed and cannot be registered.
///
/// # Returns
/// * `201 Created` - If registration is successful.
/// * `409 Conflict` - If the email is already taken
/// * `422 Unprocessable Entity` - If a field is blank
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    tag = "Authentication",
    responses(
        (status = 201, description = "Successful Register", body = User),
        (status = 409, description = "Email already taken"),
        (status = 422, description = "Missing name, email or password")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<RegisterRequest>,
) -> Result<ApiResponse<User>, ApiResponse<()>> {
    let user = state
        .users
        .register(NewAccount {
            name: payload.name,
            email: payload.email,
            password: payload.password,
        })
        .await?;

    Ok(ApiResponse::created("User registered", user))
}

/// Registers the public authentication routes for the API.
///
/// # Routes
/// - `POST /auth/register` → Register a new worker.
/// - `POST /auth/login` → Authenticate and return a JWT token.
///
/// # Example Usage
/// ```sh
/// curl -X POST http://localhost:3000/auth/login -H "Content-Type: application/json" -d '{"email": "inspector", "password": "inspector"}'
/// ```
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::openapi::Components;
use utoipa::Modify;
use utoipa::OpenApi;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let mut components = openapi.components.clone().unwrap_or(Components::default());

        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );

        openapi.components = Some(components);
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(login, register),
    components(schemas(LoginRequest, LoginResponse, RegisterRequest, User, Role)),
    tags(
        (name = "Authentication", description = "User Auth Endpoints")
    ),
    modifiers(&SecurityAddon)
)]
pub struct AuthDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    #[test]
    fn claims_round_trip_through_a_token() {
        let user = User {
            id: 7,
            name: "Ana".into(),
            email: "ana@example.com".into(),
            role: Role::Worker,
        };
        let claims = Claims::for_user(&user, 600);
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"s3cret")).unwrap();

        let decoded = decode::<Claims>(&token, &DecodingKey::from_secret(b"s3cret"), &Validation::default())
            .unwrap()
            .claims;
        assert_eq!(decoded.user_id().unwrap(), 7);
        assert_eq!(decoded.role, Role::Worker);
        assert_eq!(decoded.name, "Ana");
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let user = User {
            id: 1,
            name: "Ana".into(),
            email: "ana@example.com".into(),
            role: Role::Worker,
        };
        let claims = Claims::for_user(&user, -3_600);
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"s3cret")).unwrap();

        assert!(decode::<Claims>(&token, &DecodingKey::from_secret(b"s3cret"), &Validation::default()).is_err());
    }

    #[test]
    fn non_numeric_subject_is_unauthorized() {
        let claims = Claims {
            sub: "ana".into(),
            name: "Ana".into(),
            email: "ana@example.com".into(),
            role: Role::Worker,
            exp: 0,
        };
        assert!(matches!(claims.user_id(), Err(ServiceError::Unauthorized(_))));
    }
}
