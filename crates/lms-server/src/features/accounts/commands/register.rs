//! Account registration
//!
//! New accounts start inactive. A one-time activation token is mailed to
//! the address; only its SHA-256 digest is stored.

use mediator::Request;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::events::{self, DomainEvent, EventError};
use crate::features::shared::error_helpers::is_unique_violation;
use crate::features::shared::validation::{
    validate_email, validate_name, validate_username, EmailValidationError, NameValidationError,
    UsernameValidationError,
};
use crate::features::FeatureState;
use crate::models::{Account, Role, ACCOUNT_COLUMNS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterAccountCommand {
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Student
}

#[derive(Debug, thiserror::Error)]
pub enum RegisterAccountError {
    #[error("Email validation failed: {0}")]
    EmailValidation(#[from] EmailValidationError),

    #[error("Username validation failed: {0}")]
    UsernameValidation(#[from] UsernameValidationError),

    #[error("Full name validation failed: {0}")]
    NameValidation(#[from] NameValidationError),

    #[error("An account with this email or username already exists")]
    Duplicate,

    #[error(transparent)]
    Event(#[from] EventError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<Account, RegisterAccountError>> for RegisterAccountCommand {}

impl crate::cqrs::middleware::Command for RegisterAccountCommand {}

impl RegisterAccountCommand {
    #[tracing::instrument(skip(self), fields(username = %self.username))]
    pub fn validate(&self) -> Result<(), RegisterAccountError> {
        validate_email(&self.email)?;
        validate_username(&self.username, 150)?;
        if !self.full_name.is_empty() {
            validate_name(&self.full_name, 150)?;
        }
        Ok(())
    }
}

/// Random 64-character hex token
pub fn generate_activation_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[tracing::instrument(skip(state, command), fields(username = %command.username, role = %command.role))]
pub async fn handle(state: FeatureState, command: RegisterAccountCommand) -> Result<Account, RegisterAccountError> {
    command.validate()?;

    let token = generate_activation_token();
    let mut tx = state.db.begin().await?;

    let account = sqlx::query_as::<_, Account>(&format!(
        r#"
        INSERT INTO accounts (email, username, full_name, role, activation_token_hash)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {}
        "#,
        ACCOUNT_COLUMNS
    ))
    .bind(command.email.trim().to_lowercase())
    .bind(&command.username)
    .bind(command.full_name.trim())
    .bind(command.role)
    .bind(hash_token(&token))
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            RegisterAccountError::Duplicate
        } else {
            RegisterAccountError::Database(e)
        }
    })?;

    let effects = events::dispatch(
        &mut tx,
        &state,
        DomainEvent::AccountRegistered {
            account_id: account.id,
            activation_token: token,
        },
    )
    .await?;

    tx.commit().await?;
    tracing::info!(account_id = %account.id, "Account registered");
    effects.flush(state.mailer.as_ref()).await;

    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::test_state;
    use sqlx::PgPool;

    fn command(email: &str, username: &str) -> RegisterAccountCommand {
        RegisterAccountCommand {
            email: email.to_string(),
            username: username.to_string(),
            full_name: "Ada Lovelace".to_string(),
            role: Role::Student,
        }
    }

    #[test]
    fn test_validation() {
        assert!(command("ada@example.com", "ada").validate().is_ok());
        assert!(matches!(
            command("ada.example.com", "ada").validate(),
            Err(RegisterAccountError::EmailValidation(_))
        ));
        assert!(matches!(
            command("ada@example.com", "a d").validate(),
            Err(RegisterAccountError::UsernameValidation(_))
        ));
    }

    #[test]
    fn test_role_defaults_to_student() {
        let command: RegisterAccountCommand =
            serde_json::from_str(r#"{"email": "a@b.co", "username": "abc"}"#).unwrap();
        assert_eq!(command.role, Role::Student);
    }

    #[test]
    fn test_token_hash() {
        let token = generate_activation_token();
        assert_eq!(token.len(), 64);
        assert_eq!(hash_token(&token).len(), 64);
        assert_ne!(hash_token(&token), token);
        assert_eq!(hash_token(&token), hash_token(&token));
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore] // Requires database
    async fn test_register_creates_inactive_account_with_profile(pool: PgPool) -> sqlx::Result<()> {
        let (state, mailer) = test_state(pool.clone());
        let account = handle(state.clone(), command("ada@example.com", "ada")).await.unwrap();
        assert!(!account.is_active);

        let profiles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles WHERE account_id = $1")
            .bind(account.id)
            .fetch_one(&pool)
            .await?;
        assert_eq!(profiles, 1);
        assert_eq!(mailer.sent().len(), 1);

        let duplicate = handle(state, command("ADA@example.com", "other")).await;
        assert!(matches!(duplicate, Err(RegisterAccountError::Duplicate)));
        Ok(())
    }
}
