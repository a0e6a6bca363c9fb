//! HTTP middleware layers
//!
//! - CORS, allowing the `x-user-id` caller header
//! - Request logging with tracing

use axum::http::{header, HeaderName, Method};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::CorsConfig;
use crate::features::shared::auth::CALLER_HEADER;

/// Create CORS layer from configuration
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let mut cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ACCEPT,
            header::ACCEPT_LANGUAGE,
            header::CONTENT_LANGUAGE,
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(CALLER_HEADER),
        ])
        .max_age(Duration::from_secs(3600));

    // Credentials cannot be combined with a wildcard origin
    if allows_any_origin(config) {
        return cors.allow_origin(Any);
    }

    let origins: Vec<_> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    cors = cors.allow_origin(origins);

    if config.allow_credentials {
        cors = cors.allow_credentials(true);
    }

    cors
}

fn allows_any_origin(config: &CorsConfig) -> bool {
    config.allowed_origins.is_empty() || config.allowed_origins.iter().any(|o| o == "*")
}

/// Create tracing/logging layer
pub fn tracing_layer(
) -> TraceLayer<tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>>
{
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(tower_http::LatencyUnit::Micros),
        )
}
