use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::models::Category;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListCategoriesQuery {}

#[derive(Debug, thiserror::Error)]
pub enum ListCategoriesError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<Vec<Category>, ListCategoriesError>> for ListCategoriesQuery {}

impl crate::cqrs::middleware::Query for ListCategoriesQuery {}

pub async fn handle(pool: PgPool, _query: ListCategoriesQuery) -> Result<Vec<Category>, ListCategoriesError> {
    let categories = sqlx::query_as::<_, Category>(
        "SELECT id, title, slug, created_at FROM categories ORDER BY title",
    )
    .fetch_all(&pool)
    .await?;
    Ok(categories)
}
