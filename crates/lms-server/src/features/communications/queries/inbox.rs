//! The caller's notifications, newest first

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::shared::{require_account, AuthError, PaginationMetadata, PaginationParams};
use crate::models::Notification;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InboxQuery {
    #[serde(skip)]
    pub caller_id: Uuid,

    #[serde(default)]
    pub page: Option<i64>,

    #[serde(default)]
    pub per_page: Option<i64>,

    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InboxResponse {
    pub items: Vec<Notification>,
    pub unread: i64,
    pub pagination: PaginationMetadata,
}

#[derive(Debug, thiserror::Error)]
pub enum InboxError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<InboxResponse, InboxError>> for InboxQuery {}

impl crate::cqrs::middleware::Query for InboxQuery {}

impl InboxQuery {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams::new(self.page, self.per_page)
    }
}

#[tracing::instrument(skip(pool, query), fields(caller_id = %query.caller_id))]
pub async fn handle(pool: PgPool, query: InboxQuery) -> Result<InboxResponse, InboxError> {
    let caller = require_account(&pool, query.caller_id).await?;
    let params = query.pagination();

    let items = sqlx::query_as::<_, Notification>(
        r#"
        SELECT id, user_id, message, link, is_read, created_at
        FROM notifications
        WHERE user_id = $1 AND (NOT $2 OR NOT is_read)
        ORDER BY created_at DESC, id
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(caller.id)
    .bind(query.unread_only)
    .bind(params.per_page())
    .bind(params.offset())
    .fetch_all(&pool)
    .await?;

    let (total, unread): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FILTER (WHERE NOT $2 OR NOT is_read),
               COUNT(*) FILTER (WHERE NOT is_read)
        FROM notifications
        WHERE user_id = $1
        "#,
    )
    .bind(caller.id)
    .bind(query.unread_only)
    .fetch_one(&pool)
    .await?;

    Ok(InboxResponse {
        items,
        unread,
        pagination: PaginationMetadata::new(params.page(), params.per_page(), total),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::TestAccount;

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore] // Requires database
    async fn test_inbox_newest_first(pool: PgPool) -> sqlx::Result<()> {
        let account = TestAccount::new("stu").create(&pool).await?;
        for (message, age) in [("old", "2 hours"), ("new", "1 minute")] {
            sqlx::query(
                "INSERT INTO notifications (user_id, message, created_at) VALUES ($1, $2, NOW() - $3::interval)",
            )
            .bind(account.id)
            .bind(message)
            .bind(age)
            .execute(&pool)
            .await?;
        }

        let inbox = handle(
            pool,
            InboxQuery {
                caller_id: account.id,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(inbox.items.len(), 2);
        assert_eq!(inbox.items[0].message, "new");
        assert_eq!(inbox.unread, 2);
        Ok(())
    }
}
