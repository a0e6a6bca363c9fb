//! Account activation by emailed token

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::register::hash_token;
use crate::models::{Account, ACCOUNT_COLUMNS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivateAccountCommand {
    pub account_id: Uuid,
    pub token: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ActivateAccountError {
    /// Unknown account, wrong token and already-used token look the same
    #[error("Invalid activation link")]
    InvalidLink,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<Account, ActivateAccountError>> for ActivateAccountCommand {}

impl crate::cqrs::middleware::Command for ActivateAccountCommand {}

#[tracing::instrument(skip(pool, command), fields(account_id = %command.account_id))]
pub async fn handle(pool: PgPool, command: ActivateAccountCommand) -> Result<Account, ActivateAccountError> {
    let token = command.token.trim();
    if token.is_empty() {
        return Err(ActivateAccountError::InvalidLink);
    }

    let account = sqlx::query_as::<_, Account>(&format!(
        r#"
        UPDATE accounts
        SET is_active = TRUE, activation_token_hash = NULL
        WHERE id = $1 AND activation_token_hash = $2
        RETURNING {}
        "#,
        ACCOUNT_COLUMNS
    ))
    .bind(command.account_id)
    .bind(hash_token(token))
    .fetch_optional(&pool)
    .await?
    .ok_or(ActivateAccountError::InvalidLink)?;

    tracing::info!("Account activated");
    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::accounts::commands::register::{self, RegisterAccountCommand};
    use crate::features::shared::test_helpers::test_state;
    use crate::models::Role;

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore] // Requires database
    async fn test_activation_round_trip(pool: PgPool) -> sqlx::Result<()> {
        let (state, mailer) = test_state(pool.clone());
        let account = register::handle(
            state,
            RegisterAccountCommand {
                email: "grace@example.com".to_string(),
                username: "grace".to_string(),
                full_name: String::new(),
                role: Role::Instructor,
            },
        )
        .await
        .unwrap();

        let body = mailer.sent()[0].body.clone();
        let token = body
            .split("token=")
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .unwrap()
            .to_string();

        let wrong = handle(
            pool.clone(),
            ActivateAccountCommand {
                account_id: account.id,
                token: "nope".to_string(),
            },
        )
        .await;
        assert!(matches!(wrong, Err(ActivateAccountError::InvalidLink)));

        let command = ActivateAccountCommand {
            account_id: account.id,
            token,
        };
        let activated = handle(pool.clone(), command.clone()).await.unwrap();
        assert!(activated.is_active);

        // single use
        assert!(matches!(
            handle(pool, command).await,
            Err(ActivateAccountError::InvalidLink)
        ));
        Ok(())
    }
}
