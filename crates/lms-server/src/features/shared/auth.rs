//! Caller identity and role checks
//!
//! Authentication happens upstream; the authenticated account id arrives in
//! the `x-user-id` header. Handlers resolve it with [`require_account`],
//! which also rejects unknown and inactive accounts.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Account, ACCOUNT_COLUMNS};

pub const CALLER_HEADER: &str = "x-user-id";

/// Account id supplied by the authentication layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .map(Caller)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Fetch an account by id regardless of state
pub async fn find_account<'e, E>(executor: E, id: Uuid) -> Result<Option<Account>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Account>(&format!(
        "SELECT {} FROM accounts WHERE id = $1",
        ACCOUNT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Resolve the caller to an active account
pub async fn require_account<'e, E>(executor: E, id: Uuid) -> Result<Account, AuthError>
where
    E: Executor<'e, Database = Postgres>,
{
    match find_account(executor, id).await? {
        Some(account) if account.is_active => Ok(account),
        _ => Err(AuthError::Unauthenticated),
    }
}

/// Deny unless the account is an instructor
pub fn require_instructor(account: &Account) -> Result<(), AuthError> {
    if account.is_instructor() {
        Ok(())
    } else {
        Err(AuthError::PermissionDenied)
    }
}

/// Deny unless the account carries the administrator flag
pub fn require_admin(account: &Account) -> Result<(), AuthError> {
    if account.is_admin {
        Ok(())
    } else {
        Err(AuthError::PermissionDenied)
    }
}
