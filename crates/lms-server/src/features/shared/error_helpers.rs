//! Error handling utilities shared by the feature routes
//!
//! Provides constraint-violation checks for sqlx errors and the standard
//! error responses every `routes.rs` builds on.

use axum::{http::StatusCode, response::Response};
use sqlx::Error as SqlxError;
use std::fmt::Display;

use super::auth::AuthError;
use crate::api::response::ErrorResponse;

/// Check if the error is a unique constraint violation
pub fn is_unique_violation(error: &SqlxError) -> bool {
    if let SqlxError::Database(db_err) = error {
        return db_err.is_unique_violation();
    }
    false
}

/// Check if the error is a foreign key violation
pub fn is_foreign_key_violation(error: &SqlxError) -> bool {
    if let SqlxError::Database(db_err) = error {
        return db_err.is_foreign_key_violation();
    }
    false
}

/// Return `unique_error` on a unique violation, otherwise wrap the error
pub fn map_unique_violation<E, F>(error: SqlxError, unique_error: E, default_wrapper: F) -> E
where
    F: FnOnce(SqlxError) -> E,
{
    if is_unique_violation(&error) {
        unique_error
    } else {
        default_wrapper(error)
    }
}

pub fn validation_error(message: impl Into<String>) -> Response {
    ErrorResponse::new("VALIDATION_ERROR", message).into_response_with(StatusCode::BAD_REQUEST)
}

pub fn not_found(message: impl Into<String>) -> Response {
    ErrorResponse::new("NOT_FOUND", message).into_response_with(StatusCode::NOT_FOUND)
}

pub fn conflict(message: impl Into<String>) -> Response {
    ErrorResponse::new("CONFLICT", message).into_response_with(StatusCode::CONFLICT)
}

pub fn permission_denied() -> Response {
    ErrorResponse::new("FORBIDDEN", "Permission denied").into_response_with(StatusCode::FORBIDDEN)
}

/// Log the underlying error and answer with a generic 500
pub fn internal_error(context: &str, error: &dyn Display) -> Response {
    tracing::error!("{}: {}", context, error);
    ErrorResponse::new("INTERNAL_ERROR", "An internal error occurred")
        .into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Standard mapping for identity and role failures
pub fn auth_error_response(error: &AuthError) -> Response {
    match error {
        AuthError::Unauthenticated => ErrorResponse::new("UNAUTHORIZED", "Authentication required")
            .into_response_with(StatusCode::UNAUTHORIZED),
        AuthError::PermissionDenied => permission_denied(),
        AuthError::Database(e) => internal_error("Database error while resolving caller", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_not_violations() {
        let err = SqlxError::RowNotFound;
        assert!(!is_unique_violation(&err));
        assert!(!is_foreign_key_violation(&err));
    }

    #[test]
    fn test_map_unique_violation_falls_through() {
        let mapped = map_unique_violation(SqlxError::RowNotFound, "duplicate", |_| "other");
        assert_eq!(mapped, "other");
    }

    #[test]
    fn test_auth_error_statuses() {
        assert_eq!(
            auth_error_response(&AuthError::Unauthenticated).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            auth_error_response(&AuthError::PermissionDenied).status(),
            StatusCode::FORBIDDEN
        );
    }
}
