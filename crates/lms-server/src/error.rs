//! Server-wide error type
//!
//! Feature slices define their own error enums; `AppError` covers what sits
//! outside them, such as request extraction.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::response::ErrorResponse;

/// Result type alias for server operations
pub type AppResult<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "A database error occurred".to_string(),
                )
            },
            AppError::Unauthorized(ref message) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message.clone())
            },
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}
