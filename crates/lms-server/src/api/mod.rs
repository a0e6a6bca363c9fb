//! HTTP surface
//!
//! `/health` at the root, every feature under `/api/v1`.

pub mod response;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tracing::info;

use crate::config::{Config, CorsConfig};
use crate::db;
use crate::features::{self, FeatureState};
use crate::middleware;

/// Bind and serve until Ctrl-C or SIGTERM
pub async fn serve(config: &Config, state: FeatureState) -> anyhow::Result<()> {
    let app = create_router(state, &config.cors);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

/// Build the application router with all routes and middleware
pub fn create_router(state: FeatureState, cors: &CorsConfig) -> Router {
    let health_routes = Router::new()
        .route("/health", get(health_check))
        .with_state(state.db.clone());

    Router::new()
        .merge(health_routes)
        .nest("/api/v1", features::router(state))
        // Apply layers from innermost to outermost
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(cors))
}

async fn health_check(State(pool): State<sqlx::PgPool>) -> impl IntoResponse {
    match db::health_check(&pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected"
            })),
        ),
        Err(e) => {
            tracing::error!("Database health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "database": "unreachable"
                })),
            )
        },
    }
}

async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    // Give ongoing requests time to complete
    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
