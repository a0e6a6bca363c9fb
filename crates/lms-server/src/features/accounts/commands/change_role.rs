//! Administrative role change

use mediator::Request;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::events::{self, DomainEvent, Effects, EventError};
use crate::features::shared::auth::{find_account, require_admin};
use crate::features::shared::{require_account, AuthError};
use crate::features::FeatureState;
use crate::models::{Account, Role, ACCOUNT_COLUMNS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRoleCommand {
    #[serde(skip)]
    pub caller_id: Uuid,

    #[serde(skip)]
    pub account_id: Uuid,

    pub role: Role,
}

#[derive(Debug, thiserror::Error)]
pub enum ChangeRoleError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Account '{0}' not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<Account, ChangeRoleError>> for ChangeRoleCommand {}

impl crate::cqrs::middleware::Command for ChangeRoleCommand {}

#[tracing::instrument(
    skip(state, command),
    fields(caller_id = %command.caller_id, account_id = %command.account_id, role = %command.role)
)]
pub async fn handle(state: FeatureState, command: ChangeRoleCommand) -> Result<Account, ChangeRoleError> {
    let mut tx = state.db.begin().await?;

    let caller = require_account(&mut *tx, command.caller_id).await?;
    require_admin(&caller)?;

    let target = find_account(&mut *tx, command.account_id)
        .await?
        .ok_or(ChangeRoleError::NotFound(command.account_id))?;

    if target.role == command.role {
        tx.commit().await?;
        return Ok(target);
    }

    let updated = sqlx::query_as::<_, Account>(&format!(
        "UPDATE accounts SET role = $2 WHERE id = $1 RETURNING {}",
        ACCOUNT_COLUMNS
    ))
    .bind(target.id)
    .bind(command.role)
    .fetch_one(&mut *tx)
    .await?;

    let effects: Effects = events::dispatch(
        &mut tx,
        &state,
        DomainEvent::RoleChanged {
            account_id: updated.id,
            role: updated.role,
        },
    )
    .await?;

    tx.commit().await?;
    tracing::info!(from = %target.role, to = %updated.role, "Account role changed");
    effects.flush(state.mailer.as_ref()).await;

    Ok(updated)
}
