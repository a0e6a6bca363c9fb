//! Router-level tests
//!
//! These cover request handling that completes before any database access:
//! caller extraction, path and body parsing, and the public certificate
//! lookup's malformed-id branch.

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use serde_json::json;
use uuid::Uuid;

mod common;

use common::{get, lazy_app, send};

#[tokio::test]
async fn test_me_requires_caller() {
    let app = lazy_app();

    let (status, body) = send(&app, get("/api/v1/accounts/me")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_malformed_caller_header_is_unauthenticated() {
    let app = lazy_app();
    let request = Request::builder()
        .uri("/api/v1/notifications")
        .header("x-user-id", "not-a-uuid")
        .body(Body::empty())
        .unwrap();

    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_gated_writes_require_caller() {
    let app = lazy_app();
    let id = Uuid::new_v4();

    for uri in [
        format!("/api/v1/lessons/{}/toggle", id),
        format!("/api/v1/lessons/{}/complete", id),
        format!("/api/v1/courses/{}/enroll", id),
        "/api/v1/notifications/read-all".to_string(),
    ] {
        let request = Request::builder()
            .method(Method::POST)
            .uri(&uri)
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
    }
}

#[tokio::test]
async fn test_certificate_verify_without_id() {
    let app = lazy_app();

    let (status, body) = send(&app, get("/api/v1/certificates/verify")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["found"], false);
}

#[tokio::test]
async fn test_certificate_verify_with_malformed_id() {
    let app = lazy_app();

    let (status, body) = send(&app, get("/api/v1/certificates/verify?id=cert-123")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["found"], false);
}

#[tokio::test]
async fn test_invalid_path_id_is_rejected() {
    let app = lazy_app();
    let request = Request::builder()
        .uri("/api/v1/lessons/not-a-uuid")
        .header("x-user-id", Uuid::new_v4().to_string())
        .body(Body::empty())
        .unwrap();

    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_rejects_malformed_body() {
    let app = lazy_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/accounts")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "email": "ada@example.com" }).to_string()))
        .unwrap();

    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_register_validates_before_database() {
    let app = lazy_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/accounts")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "email": "not-an-email", "username": "ada" }).to_string(),
        ))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_unknown_route() {
    let app = lazy_app();

    let (status, _) = send(&app, get("/api/v1/no-such-resource")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
