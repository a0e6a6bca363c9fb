//! Shared setup for integration tests

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use lms_server::{
    api,
    config::{CorsConfig, GatewayConfig},
    features::{quizzes::grading::AttemptPolicy, FeatureState, Settings},
    gateway::PaystackGateway,
    mail::MemoryMailer,
    storage::LocalStorage,
};

pub fn gateway_config(base_url: &str) -> GatewayConfig {
    GatewayConfig {
        secret_key: "sk_test_secret".to_string(),
        base_url: base_url.to_string(),
        timeout_secs: 2,
        max_retries: 2,
    }
}

/// Router over a pool that never connects; only requests answered before
/// any database access can be exercised with it.
pub fn lazy_app() -> Router {
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://localhost/lms_unused")
        .expect("lazy pool");

    let gateway = PaystackGateway::new(&gateway_config("http://127.0.0.1:9")).expect("gateway");

    let state = FeatureState {
        db: pool,
        storage: Arc::new(LocalStorage::new(
            std::env::temp_dir().join(format!("lms-it-{}", Uuid::new_v4())),
        )),
        mailer: Arc::new(MemoryMailer::new()),
        gateway: Arc::new(gateway),
        settings: Arc::new(Settings {
            public_base_url: "https://apilearn.com".to_string(),
            from_email: "no-reply@apilearn.com".to_string(),
            attempt_policy: AttemptPolicy::unlimited(),
        }),
    };

    let cors = CorsConfig {
        allowed_origins: vec!["*".to_string()],
        allow_credentials: false,
    };
    api::create_router(state, &cors)
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.expect("router answered");
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}
