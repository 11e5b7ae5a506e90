use axum::extract::{Extension, Path, State};
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::db::models::history::HistoryEntry;
use crate::db::models::requests::{
    CreateServiceRequest, NewServiceRequest, ServiceRequest, Status, TransitionCommand, UpdateStatus,
};
use crate::db::models::user::Role;
use crate::error::ServiceError;
use crate::middleware::auth::UserPermissions;
use crate::utils::api_response::ApiResponse;
use crate::utils::extract::ValidJson;
use crate::utils::geocode::resolve_address;
use crate::utils::photo::validate_photo;
use crate::workflow::visible_requests;

fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), ServiceError> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(ServiceError::Validation(
            "latitude must be between -90 and 90".to_string(),
        ));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(ServiceError::Validation(
            "longitude must be between -180 and 180".to_string(),
        ));
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Submit a new service request (workers only).
///
/// The address is reverse-geocoded from the coordinates when the body omits it.
#[utoipa::path(
    post,
    path = "/requests",
    request_body = CreateServiceRequest,
    responses(
        (status = 201, description = "Service request created", body = ServiceRequest),
        (status = 403, description = "Caller is not a worker"),
        (status = 422, description = "Invalid photo or coordinates"),
        (status = 503, description = "Store unavailable")
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn create_request(
    State(state): State<AppState>,
    Extension(user): Extension<UserPermissions>,
    ValidJson(payload): ValidJson<CreateServiceRequest>,
) -> Result<ApiResponse<ServiceRequest>, ApiResponse<()>> {
    user.require(&[Role::Worker], "Only workers can submit service requests")?;

    let photo = validate_photo("photo", &payload.photo, state.config.max_photo_bytes)?;
    validate_coordinates(payload.latitude, payload.longitude)?;

    let address = match non_blank(payload.address) {
        Some(address) => address,
        None => resolve_address(state.geocoder.as_ref(), payload.latitude, payload.longitude).await,
    };

    let request = state
        .requests
        .create(NewServiceRequest {
            requester_id: user.user_id,
            requester_name: user.name.clone(),
            initial_photo: photo,
            latitude: payload.latitude,
            longitude: payload.longitude,
            address,
            note: non_blank(payload.note),
        })
        .await?;

    Ok(ApiResponse::created("Service request created", request))
}

/// List the requests on the caller's dashboard, newest first.
///
/// Workers see their own requests. Inspectors see requests awaiting
/// inspection or the final photo, plus completed ones. Contractors see
/// everything from approval onwards.
#[utoipa::path(
    get,
    path = "/requests",
    responses(
        (status = 200, description = "Requests visible to the caller", body = [ServiceRequest]),
        (status = 503, description = "Store unavailable")
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn list_requests(
    State(state): State<AppState>,
    Extension(user): Extension<UserPermissions>,
) -> Result<ApiResponse<Vec<ServiceRequest>>, ApiResponse<()>> {
    let requests = visible_requests(&user.viewer(), state.requests.list().await?);
    Ok(ApiResponse::ok("Requests retrieved", requests))
}

/// List every request regardless of role, oldest first.
#[utoipa::path(
    get,
    path = "/requests/all",
    responses(
        (status = 200, description = "All requests", body = [ServiceRequest]),
        (status = 503, description = "Store unavailable")
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn list_all_requests(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<ServiceRequest>>, ApiResponse<()>> {
    let requests = state.requests.list().await?;
    Ok(ApiResponse::ok("Requests retrieved", requests))
}

#[utoipa::path(
    get,
    path = "/requests/{id}",
    params(("id" = i32, Path, description = "Service request ID")),
    responses(
        (status = 200, description = "Service request found", body = ServiceRequest),
        (status = 404, description = "Unknown request"),
        (status = 503, description = "Store unavailable")
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<ServiceRequest>, ApiResponse<()>> {
    let request = state.requests.get(id).await?;
    Ok(ApiResponse::ok("Request retrieved", request))
}

/// Move a request to a new status.
///
/// The caller's role decides which targets are allowed. Completing requires
/// `final_photo`; workers may only complete their own requests. When
/// `expected_version` is given and the request has moved on, nothing is
/// written and `409` is returned.
#[utoipa::path(
    patch,
    path = "/requests/{id}",
    params(("id" = i32, Path, description = "Service request ID")),
    request_body = UpdateStatus,
    responses(
        (status = 200, description = "Status updated", body = ServiceRequest),
        (status = 403, description = "Transition not permitted for this role and status"),
        (status = 404, description = "Unknown request"),
        (status = 409, description = "Request was modified concurrently"),
        (status = 422, description = "Final photo missing, unexpected or invalid"),
        (status = 503, description = "Store unavailable")
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn update_request_status(
    State(state): State<AppState>,
    Extension(user): Extension<UserPermissions>,
    Path(id): Path<i32>,
    ValidJson(payload): ValidJson<UpdateStatus>,
) -> Result<ApiResponse<ServiceRequest>, ApiResponse<()>> {
    let final_photo = match non_blank(payload.final_photo) {
        Some(photo) => Some(validate_photo("final_photo", &photo, state.config.max_photo_bytes)?),
        None => None,
    };

    if user.is_worker() && payload.status == Status::Completed {
        let request = state.requests.get(id).await?;
        if request.requester_id != user.user_id {
            return Err(ServiceError::Forbidden(
                "Workers can only complete their own requests".to_string(),
            )
            .into());
        }
    }

    let updated = state
        .requests
        .apply_transition(
            id,
            TransitionCommand {
                status: payload.status,
                actor_name: user.name.clone(),
                actor_role: user.role,
                final_photo,
                expected_version: payload.expected_version,
            },
        )
        .await?;

    Ok(ApiResponse::ok("Status updated", updated))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        create_request,
        list_requests,
        list_all_requests,
        get_request,
        update_request_status,
    ),
    components(schemas(
        ServiceRequest,
        CreateServiceRequest,
        UpdateStatus,
        Status,
        HistoryEntry,
    )),
    tags(
        (name = "Requests", description = "Service request workflow")
    )
)]
pub struct RequestDoc;
