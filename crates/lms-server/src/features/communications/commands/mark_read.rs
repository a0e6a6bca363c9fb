//! Mark notifications as read

use mediator::Request;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::shared::{require_account, AuthError};

#[derive(Debug, Clone)]
pub struct MarkReadCommand {
    pub caller_id: Uuid,
    pub notification_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct MarkAllReadCommand {
    pub caller_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarkReadResponse {
    pub updated: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum MarkReadError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Notification '{0}' not found")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<MarkReadResponse, MarkReadError>> for MarkReadCommand {}

impl crate::cqrs::middleware::Command for MarkReadCommand {}

impl Request<Result<MarkReadResponse, MarkReadError>> for MarkAllReadCommand {}

impl crate::cqrs::middleware::Command for MarkAllReadCommand {}

/// Someone else's notification looks exactly like a missing one
#[tracing::instrument(skip(pool, command), fields(notification_id = %command.notification_id))]
pub async fn handle(pool: PgPool, command: MarkReadCommand) -> Result<MarkReadResponse, MarkReadError> {
    let caller = require_account(&pool, command.caller_id).await?;

    let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
        .bind(command.notification_id)
        .bind(caller.id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(MarkReadError::NotFound(command.notification_id));
    }

    Ok(MarkReadResponse { updated: 1 })
}

#[tracing::instrument(skip(pool, command), fields(caller_id = %command.caller_id))]
pub async fn handle_all(pool: PgPool, command: MarkAllReadCommand) -> Result<MarkReadResponse, MarkReadError> {
    let caller = require_account(&pool, command.caller_id).await?;

    let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND NOT is_read")
        .bind(caller.id)
        .execute(&pool)
        .await?;

    Ok(MarkReadResponse {
        updated: result.rows_affected(),
    })
}
