//! Update the caller's own profile

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::accounts::queries::get::{load_view, AccountView};
use crate::features::shared::validation::{
    validate_name, validate_optional_url, NameValidationError, UrlValidationError,
};
use crate::features::shared::{require_account, AuthError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileCommand {
    #[serde(skip)]
    pub caller_id: Uuid,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum UpdateProfileError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Full name validation failed: {0}")]
    NameValidation(#[from] NameValidationError),

    #[error("URL validation failed: {0}")]
    UrlValidation(#[from] UrlValidationError),

    #[error("Bio must be at most 2000 characters")]
    BioLength,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<AccountView, UpdateProfileError>> for UpdateProfileCommand {}

impl crate::cqrs::middleware::Command for UpdateProfileCommand {}

impl UpdateProfileCommand {
    pub fn validate(&self) -> Result<(), UpdateProfileError> {
        if let Some(name) = &self.full_name {
            validate_name(name, 150)?;
        }
        if self.bio.as_ref().is_some_and(|b| b.chars().count() > 2000) {
            return Err(UpdateProfileError::BioLength);
        }
        validate_optional_url(self.avatar_url.as_deref(), "avatar_url")?;
        Ok(())
    }
}

#[tracing::instrument(skip(pool, command), fields(caller_id = %command.caller_id))]
pub async fn handle(pool: PgPool, command: UpdateProfileCommand) -> Result<AccountView, UpdateProfileError> {
    command.validate()?;

    let mut tx = pool.begin().await?;
    let caller = require_account(&mut *tx, command.caller_id).await?;

    if let Some(full_name) = &command.full_name {
        sqlx::query("UPDATE accounts SET full_name = $2 WHERE id = $1")
            .bind(caller.id)
            .bind(full_name.trim())
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query(
        r#"
        INSERT INTO profiles (account_id, bio, avatar_url)
        VALUES ($1, COALESCE($2::text, ''), NULLIF($3::text, ''))
        ON CONFLICT (account_id) DO UPDATE
        SET bio = COALESCE($2::text, profiles.bio),
            avatar_url = CASE WHEN $3::text IS NULL THEN profiles.avatar_url ELSE NULLIF($3::text, '') END,
            updated_at = NOW()
        "#,
    )
    .bind(caller.id)
    .bind(command.bio.as_deref())
    .bind(command.avatar_url.as_deref())
    .execute(&mut *tx)
    .await?;

    let view = load_view(&mut tx, caller.id).await?;
    tx.commit().await?;

    tracing::info!("Profile updated");
    Ok(view)
}
