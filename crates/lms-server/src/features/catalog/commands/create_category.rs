use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::shared::auth::require_instructor;
use crate::features::shared::error_helpers::map_unique_violation;
use crate::features::shared::validation::{validate_name, validate_slug, NameValidationError, SlugValidationError};
use crate::features::shared::{require_account, AuthError};
use crate::models::Category;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCategoryCommand {
    #[serde(skip)]
    pub caller_id: Uuid,
    pub title: String,
    pub slug: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateCategoryError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Title: {0}")]
    TitleValidation(#[from] NameValidationError),

    #[error(transparent)]
    SlugValidation(#[from] SlugValidationError),

    #[error("Category with slug '{0}' already exists")]
    DuplicateSlug(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<Category, CreateCategoryError>> for CreateCategoryCommand {}

impl crate::cqrs::middleware::Command for CreateCategoryCommand {}

impl CreateCategoryCommand {
    pub fn validate(&self) -> Result<(), CreateCategoryError> {
        validate_name(&self.title, 100)?;
        validate_slug(&self.slug, 100)?;
        Ok(())
    }
}

#[tracing::instrument(skip(pool, command), fields(slug = %command.slug))]
pub async fn handle(pool: PgPool, command: CreateCategoryCommand) -> Result<Category, CreateCategoryError> {
    command.validate()?;

    let caller = require_account(&pool, command.caller_id).await?;
    require_instructor(&caller)?;

    let category = sqlx::query_as::<_, Category>(
        r#"
        INSERT INTO categories (title, slug)
        VALUES ($1, $2)
        RETURNING id, title, slug, created_at
        "#,
    )
    .bind(command.title.trim())
    .bind(&command.slug)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        map_unique_violation(
            e,
            CreateCategoryError::DuplicateSlug(command.slug.clone()),
            CreateCategoryError::Database,
        )
    })?;

    tracing::info!(category_id = %category.id, "Category created");
    Ok(category)
}
