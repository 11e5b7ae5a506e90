use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use service_orders::app_state::AppState;
use service_orders::build_router;
use service_orders::config::{Config, FixedAccount, StoreBackend};
use service_orders::db::store::MemoryStore;
use service_orders::utils::geocode::{GeocodeError, ReverseGeocoder, ADDRESS_NOT_FOUND};

const PHOTO: &str = "data:image/jpeg;base64,aGVsbG8gd29ybGQ=";
const FINAL_PHOTO: &str = "data:image/png;base64,ZG9uZSE=";

struct FixedGeocoder(Option<&'static str>);

#[async_trait]
impl ReverseGeocoder for FixedGeocoder {
    async fn reverse(&self, _latitude: f64, _longitude: f64) -> Result<String, GeocodeError> {
        self.0.map(str::to_string).ok_or(GeocodeError::NoMatch)
    }
}

fn account(name: &str, login: &str) -> FixedAccount {
    FixedAccount {
        name: name.to_string(),
        email: login.to_string(),
        password: format!("{login}-pass"),
    }
}

fn test_config() -> Config {
    Config {
        bind_addr: "127.0.0.1:0".parse().expect("addr"),
        store_backend: StoreBackend::Memory,
        store_path: "unused.json".into(),
        database_url: None,
        store_timeout: Duration::from_secs(5),
        request_timeout: Duration::from_secs(30),
        jwt_secret: "integration-secret".to_string(),
        token_ttl_secs: 3_600,
        bcrypt_cost: 4,
        geocoder_url: "http://127.0.0.1:9".to_string(),
        geocoder_timeout: Duration::from_secs(1),
        max_photo_bytes: 64 * 1024,
        inspector: account("Municipal Inspector", "inspector"),
        contractor: account("Contractor Company", "contractor"),
        log_dir: "logs".into(),
    }
}

async fn app_with(geocoder: FixedGeocoder) -> Router {
    let state = AppState::new(test_config(), Arc::new(MemoryStore::new()), Arc::new(geocoder));
    state.seed_fixed_accounts().await.expect("seed");
    build_router(state)
}

async fn app() -> Router {
    app_with(FixedGeocoder(Some("Rua das Flores, 10"))).await
}

async fn call(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("req"),
        None => builder.body(Body::empty()).expect("req"),
    };

    let response = app.clone().oneshot(request).await.expect("call");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn login(app: &Router, email: &str, password: &str) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["data"]["token"].as_str().expect("token").to_string()
}

async fn register_worker(app: &Router, name: &str, email: &str) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "name": name, "email": email, "password": "worker-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    assert_eq!(body["data"]["role"], "worker");
    login(app, email, "worker-pass").await
}

async fn submit(app: &Router, token: &str) -> Value {
    let (status, body) = call(
        app,
        Method::POST,
        "/requests",
        Some(token),
        Some(json!({ "photo": PHOTO, "latitude": -23.55, "longitude": -46.63, "note": "  pothole  " })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "submit failed: {body}");
    body["data"].clone()
}

async fn patch_status(app: &Router, token: &str, id: i64, body: Value) -> (StatusCode, Value) {
    call(app, Method::PATCH, &format!("/requests/{id}"), Some(token), Some(body)).await
}

#[tokio::test]
async fn health_endpoints_report_the_store() {
    let app = app().await;

    let (status, body) = call(&app, Method::GET, "/health/live", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = call(&app, Method::GET, "/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["store"], "memory");
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let app = app().await;

    let (status, body) = call(&app, Method::GET, "/requests", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["errors"]["kind"], "unauthorized");

    let (status, _) = call(&app, Method::GET, "/users/me", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn registration_and_login_rules() {
    let app = app().await;
    let token = register_worker(&app, "Ana", "ana@example.com").await;

    let (status, body) = call(&app, Method::GET, "/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Ana");
    assert!(body["data"].get("password_hash").is_none());

    let (status, body) = call(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "name": "Other", "email": "ANA@example.com", "password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["errors"]["kind"], "conflict");

    let (status, body) = call(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "name": "  ", "email": "blank@example.com", "password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["kind"], "validation");

    let (status, _) = call(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "ana@example.com", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn request_lifecycle_end_to_end() {
    let app = app().await;
    let worker = register_worker(&app, "Ana", "ana@example.com").await;
    let inspector = login(&app, "inspector", "inspector-pass").await;
    let contractor = login(&app, "contractor", "contractor-pass").await;

    let created = submit(&app, &worker).await;
    let id = created["id"].as_i64().expect("id");
    assert_eq!(created["status"], "sent_to_inspector");
    assert_eq!(created["address"], "Rua das Flores, 10");
    assert_eq!(created["note"], "pothole");
    assert_eq!(created["requester_name"], "Ana");
    assert_eq!(created["history"].as_array().map(Vec::len), Some(1));

    let (status, body) = patch_status(&app, &inspector, id, json!({ "status": "sent_to_contractor" })).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = patch_status(&app, &contractor, id, json!({ "status": "pending" })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "pending");

    let (status, body) = patch_status(&app, &contractor, id, json!({ "status": "awaiting_final_photo" })).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = patch_status(&app, &worker, id, json!({ "status": "completed" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["kind"], "validation");

    let (status, body) = patch_status(
        &app,
        &worker,
        id,
        json!({ "status": "completed", "final_photo": FINAL_PHOTO }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let done = &body["data"];
    assert_eq!(done["status"], "completed");
    assert_eq!(done["final_photo"], FINAL_PHOTO);

    let history = done["history"].as_array().expect("history");
    let statuses: Vec<&str> = history.iter().filter_map(|h| h["status"].as_str()).collect();
    assert_eq!(
        statuses,
        ["sent_to_inspector", "sent_to_contractor", "pending", "awaiting_final_photo", "completed"]
    );
    assert_eq!(history[1]["actor"], "Municipal Inspector");
    assert_eq!(history[4]["actor"], "Ana");

    let (status, body) = patch_status(&app, &contractor, id, json!({ "status": "pending" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errors"]["kind"], "transition_not_permitted");
}

#[tokio::test]
async fn denied_transitions_leave_the_request_untouched() {
    let app = app().await;
    let worker = register_worker(&app, "Ana", "ana@example.com").await;
    let inspector = login(&app, "inspector", "inspector-pass").await;
    let contractor = login(&app, "contractor", "contractor-pass").await;

    let id = submit(&app, &worker).await["id"].as_i64().expect("id");

    let (status, body) = patch_status(&app, &contractor, id, json!({ "status": "pending" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errors"]["kind"], "transition_not_permitted");

    let (status, body) = patch_status(
        &app,
        &worker,
        id,
        json!({ "status": "completed", "final_photo": FINAL_PHOTO }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errors"]["kind"], "transition_not_permitted");

    let (status, body) = patch_status(&app, &inspector, 999, json!({ "status": "rejected" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errors"]["kind"], "not_found");

    let (status, body) = call(&app, Method::GET, &format!("/requests/{id}"), Some(&inspector), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "sent_to_inspector");
    assert_eq!(body["data"]["version"], 1);
    assert_eq!(body["data"]["history"].as_array().map(Vec::len), Some(1));

    let (status, _) = patch_status(&app, &inspector, id, json!({ "status": "rejected" })).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = patch_status(&app, &inspector, id, json!({ "status": "sent_to_contractor" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errors"]["kind"], "transition_not_permitted");
}

#[tokio::test]
async fn stale_versions_conflict() {
    let app = app().await;
    let worker = register_worker(&app, "Ana", "ana@example.com").await;
    let inspector = login(&app, "inspector", "inspector-pass").await;
    let id = submit(&app, &worker).await["id"].as_i64().expect("id");

    let (status, _) = patch_status(
        &app,
        &inspector,
        id,
        json!({ "status": "sent_to_contractor", "expected_version": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = patch_status(
        &app,
        &inspector,
        id,
        json!({ "status": "rejected", "expected_version": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["errors"]["kind"], "conflict");
}

#[tokio::test]
async fn only_the_requester_completes() {
    let app = app().await;
    let ana = register_worker(&app, "Ana", "ana@example.com").await;
    let bruno = register_worker(&app, "Bruno", "bruno@example.com").await;
    let inspector = login(&app, "inspector", "inspector-pass").await;
    let contractor = login(&app, "contractor", "contractor-pass").await;

    let id = submit(&app, &ana).await["id"].as_i64().expect("id");
    patch_status(&app, &inspector, id, json!({ "status": "sent_to_contractor" })).await;
    patch_status(&app, &contractor, id, json!({ "status": "awaiting_final_photo" })).await;

    let (status, body) = patch_status(
        &app,
        &bruno,
        id,
        json!({ "status": "completed", "final_photo": FINAL_PHOTO }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errors"]["kind"], "forbidden");
}

#[tokio::test]
async fn submissions_are_validated() {
    let app = app().await;
    let worker = register_worker(&app, "Ana", "ana@example.com").await;
    let inspector = login(&app, "inspector", "inspector-pass").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/requests",
        Some(&inspector),
        Some(json!({ "photo": PHOTO, "latitude": 0.0, "longitude": 0.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errors"]["kind"], "forbidden");

    for bad in [
        json!({ "photo": "data:text/plain;base64,aGVsbG8=", "latitude": 0.0, "longitude": 0.0 }),
        json!({ "photo": "%%%", "latitude": 0.0, "longitude": 0.0 }),
        json!({ "photo": PHOTO, "latitude": 95.0, "longitude": 0.0 }),
    ] {
        let (status, body) = call(&app, Method::POST, "/requests", Some(&worker), Some(bad)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["errors"]["kind"], "validation");
    }

    let (status, body) = call(
        &app,
        Method::POST,
        "/requests",
        Some(&worker),
        Some(json!({ "photo": PHOTO, "latitude": 1.0, "longitude": 2.0, "address": " Av. Central, 5 " })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["address"], "Av. Central, 5");
    assert!(body["data"].get("note").is_none());
}

#[tokio::test]
async fn unreadable_bodies_use_the_error_envelope() {
    let app = app().await;
    let worker = register_worker(&app, "Ana", "ana@example.com").await;
    let inspector = login(&app, "inspector", "inspector-pass").await;
    let id = submit(&app, &worker).await["id"].as_i64().expect("id");

    let (status, body) = call(
        &app,
        Method::POST,
        "/requests",
        Some(&worker),
        Some(json!({ "latitude": 0.0, "longitude": 0.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(body["errors"]["kind"], "validation");
    assert!(body["message"].as_str().expect("message").contains("photo"));

    let (status, body) = patch_status(&app, &inspector, id, json!({ "status": "finished" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["kind"], "validation");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header("Content-Type", "application/json")
        .body(Body::from("{\"email\": "))
        .expect("req");
    let response = app.clone().oneshot(request).await.expect("call");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let body: Value = serde_json::from_slice(&bytes).expect("envelope");
    assert_eq!(body["errors"]["kind"], "validation");

    let (_, body) = call(&app, Method::GET, &format!("/requests/{id}"), Some(&inspector), None).await;
    assert_eq!(body["data"]["status"], "sent_to_inspector");
}

#[tokio::test]
async fn deleted_accounts_lose_their_tokens() {
    let app = app().await;
    let ana = register_worker(&app, "Ana", "ana@example.com").await;
    let ana_request = submit(&app, &ana).await;

    let (status, _) = call(&app, Method::DELETE, "/users/me", Some(&ana), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        Method::POST,
        "/requests",
        Some(&ana),
        Some(json!({ "photo": PHOTO, "latitude": 0.0, "longitude": 0.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errors"]["kind"], "unauthorized");

    let bruno = register_worker(&app, "Bruno", "bruno@example.com").await;
    let (status, body) = call(&app, Method::GET, "/users/me", Some(&bruno), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(body["data"]["id"], ana_request["requester_id"]);

    let (_, body) = call(&app, Method::GET, "/requests", Some(&bruno), None).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn geocoder_failure_falls_back_to_placeholder() {
    let app = app_with(FixedGeocoder(None)).await;
    let worker = register_worker(&app, "Ana", "ana@example.com").await;

    let created = submit(&app, &worker).await;
    assert_eq!(created["address"], ADDRESS_NOT_FOUND);
}

#[tokio::test]
async fn dashboards_are_scoped_by_role() {
    let app = app().await;
    let ana = register_worker(&app, "Ana", "ana@example.com").await;
    let bruno = register_worker(&app, "Bruno", "bruno@example.com").await;
    let inspector = login(&app, "inspector", "inspector-pass").await;
    let contractor = login(&app, "contractor", "contractor-pass").await;

    let first = submit(&app, &ana).await["id"].as_i64().expect("id");
    let second = submit(&app, &ana).await["id"].as_i64().expect("id");
    patch_status(&app, &inspector, second, json!({ "status": "sent_to_contractor" })).await;

    let ids = |body: &Value| -> Vec<i64> {
        body["data"]
            .as_array()
            .expect("list")
            .iter()
            .filter_map(|r| r["id"].as_i64())
            .collect()
    };

    let (_, body) = call(&app, Method::GET, "/requests", Some(&ana), None).await;
    assert_eq!(ids(&body), vec![second, first]);

    let (_, body) = call(&app, Method::GET, "/requests", Some(&bruno), None).await;
    assert!(ids(&body).is_empty());

    let (_, body) = call(&app, Method::GET, "/requests", Some(&inspector), None).await;
    assert_eq!(ids(&body), vec![first]);

    let (_, body) = call(&app, Method::GET, "/requests", Some(&contractor), None).await;
    assert_eq!(ids(&body), vec![second]);

    let (_, body) = call(&app, Method::GET, "/requests/all", Some(&bruno), None).await;
    assert_eq!(ids(&body).len(), 2);
}

#[tokio::test]
async fn account_listing_and_deletion() {
    let app = app().await;
    let worker = register_worker(&app, "Ana", "ana@example.com").await;
    let inspector = login(&app, "inspector", "inspector-pass").await;
    let id = submit(&app, &worker).await["id"].as_i64().expect("id");

    let (status, _) = call(&app, Method::GET, "/users", Some(&worker), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(&app, Method::GET, "/users", Some(&inspector), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(3));

    let (status, _) = call(&app, Method::DELETE, "/users/me", Some(&inspector), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, Method::DELETE, "/users/me", Some(&worker), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, Method::GET, "/users/me", Some(&worker), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errors"]["kind"], "unauthorized");

    let (status, body) = call(&app, Method::GET, &format!("/requests/{id}"), Some(&inspector), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["requester_name"], "Ana");
}

#[tokio::test]
async fn openapi_document_lists_the_workflow() {
    let app = app().await;
    let (status, body) = call(&app, Method::GET, "/api-docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/requests/{id}"]["patch"].is_object());
    assert!(body["components"]["securitySchemes"]["bearerAuth"].is_object());
}
