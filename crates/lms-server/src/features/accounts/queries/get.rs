//! Account details with profile

use mediator::Request;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::features::shared::auth::find_account;
use crate::features::shared::{require_account, AuthError};
use crate::models::{Account, Profile};

#[derive(Debug, Clone)]
pub struct GetAccountQuery {
    pub caller_id: Uuid,
    /// `None` for the caller's own account
    pub account_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    #[serde(flatten)]
    pub account: Account,
    pub display_name: String,
    pub profile: Option<Profile>,
}

#[derive(Debug, thiserror::Error)]
pub enum GetAccountError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Account '{0}' not found")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<AccountView, GetAccountError>> for GetAccountQuery {}

impl crate::cqrs::middleware::Query for GetAccountQuery {}

pub(crate) async fn load_view(conn: &mut PgConnection, account_id: Uuid) -> Result<AccountView, sqlx::Error> {
    let account = find_account(&mut *conn, account_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    let profile = sqlx::query_as::<_, Profile>(
        "SELECT account_id, bio, avatar_url, updated_at FROM profiles WHERE account_id = $1",
    )
    .bind(account_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(AccountView {
        display_name: account.display_name().to_string(),
        account,
        profile,
    })
}

#[tracing::instrument(skip(pool, query), fields(caller_id = %query.caller_id))]
pub async fn handle(pool: PgPool, query: GetAccountQuery) -> Result<AccountView, GetAccountError> {
    let caller = require_account(&pool, query.caller_id).await?;
    let target = query.account_id.unwrap_or(caller.id);

    if target != caller.id && !caller.is_admin {
        return Err(AuthError::PermissionDenied.into());
    }

    let mut conn = pool.acquire().await?;
    load_view(&mut conn, target).await.map_err(|e| match e {
        sqlx::Error::RowNotFound => GetAccountError::NotFound(target),
        other => GetAccountError::Database(other),
    })
}
