//! Authentication integration tests.
//!
//! Tests verify:
//! - Bearer API key gating on the conversion endpoint
//! - Admin token gating on the diagnostic log endpoint
//! - Public health endpoint
//! - Exact 403 error messages

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use imgpress::server::{create_router, AppState, RouterConfig};

use super::test_utils::{
    body_json, convert_request, convert_request_with_token, default_state, png_image, FakeProbe,
    MultipartForm,
};

const API_KEY: &str = "test-api-key";
const ADMIN_TOKEN: &str = "test-admin-token";

fn secured_router(state: AppState<FakeProbe>) -> Router {
    create_router(
        state,
        RouterConfig::new(API_KEY)
            .with_admin_token(ADMIN_TOKEN)
            .with_tracing(false),
    )
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

fn simple_form() -> MultipartForm {
    MultipartForm::new()
        .text("format", "png")
        .file("files", "a.png", "image/png", &png_image(8, 8))
}

// =============================================================================
// API Key
// =============================================================================

#[tokio::test]
async fn test_convert_requires_auth_header() {
    let router = secured_router(default_state());

    let response = router.oneshot(convert_request(simple_form())).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_authorization_header");
    assert_eq!(json["message"], "Forbidden: Invalid Authorization Header");
}

#[tokio::test]
async fn test_convert_rejects_wrong_key() {
    let router = secured_router(default_state());

    let request = convert_request_with_token(simple_form(), "wrong-key");
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_api_key");
    assert_eq!(json["message"], "Forbidden: Invalid API Key");
}

#[tokio::test]
async fn test_convert_rejects_non_bearer_scheme() {
    let router = secured_router(default_state());

    let (content_type, body) = simple_form().build();
    let request = Request::builder()
        .method("POST")
        .uri("/convert/images")
        .header(header::CONTENT_TYPE, content_type)
        .header(header::AUTHORIZATION, format!("Basic {API_KEY}"))
        .body(Body::from(body))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_authorization_header");
}

#[tokio::test]
async fn test_convert_accepts_valid_key() {
    let router = secured_router(default_state());

    let request = convert_request_with_token(simple_form(), API_KEY);
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Health Endpoints
// =============================================================================

#[tokio::test]
async fn test_health_is_public() {
    let router = secured_router(default_state());

    let response = router.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["resource"]["total_mb"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_health_log_rejects_api_key() {
    let router = secured_router(default_state());

    // The conversion key does not unlock the diagnostic endpoint.
    let response = router
        .oneshot(get_with_token("/health/log", API_KEY))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_admin_token");
    assert_eq!(json["message"], "Forbidden: Invalid Admin Access Token");
}

#[tokio::test]
async fn test_health_log_accepts_admin_token() {
    let dir = tempfile::tempdir().unwrap();
    let state = default_state().with_log_dir(dir.path());
    let router = secured_router(state);

    let response = router
        .oneshot(get_with_token("/health/log", ADMIN_TOKEN))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let message = json["message"].as_str().unwrap();
    assert!(message.starts_with("Logs saved to "), "got {message:?}");

    // The file actually exists on disk.
    let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(files.len(), 1);
}

#[tokio::test]
async fn test_health_log_locked_without_configured_token() {
    // Auth enabled, no admin token: the endpoint fails closed.
    let router = create_router(
        default_state(),
        RouterConfig::new(API_KEY).with_tracing(false),
    );

    let response = router
        .oneshot(get_with_token("/health/log", API_KEY))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// =============================================================================
// Auth Disabled
// =============================================================================

#[tokio::test]
async fn test_auth_disabled_allows_everything() {
    let dir = tempfile::tempdir().unwrap();
    let state = default_state().with_log_dir(dir.path());
    let router = create_router(state, RouterConfig::without_auth().with_tracing(false));

    let response = router
        .clone()
        .oneshot(convert_request(simple_form()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router.oneshot(get("/health/log")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
