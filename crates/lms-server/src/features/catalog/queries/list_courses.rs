//! Course catalog listing
//!
//! Everyone sees published courses. A viewer also sees their own
//! unpublished drafts.

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::shared::{Paginated, PaginationParams};
use crate::models::{Course, COURSE_COLUMNS};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListCoursesQuery {
    #[serde(skip)]
    pub viewer_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub instructor_id: Option<Uuid>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListCoursesError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<Paginated<Course>, ListCoursesError>> for ListCoursesQuery {}

impl crate::cqrs::middleware::Query for ListCoursesQuery {}

impl ListCoursesQuery {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams::new(self.page, self.per_page)
    }
}

const VISIBLE_FILTER: &str = r#"
    WHERE (is_published OR instructor_id = $1)
      AND ($2::uuid IS NULL OR category_id = $2)
      AND ($3::uuid IS NULL OR instructor_id = $3)
"#;

#[tracing::instrument(skip(pool, query))]
pub async fn handle(pool: PgPool, query: ListCoursesQuery) -> Result<Paginated<Course>, ListCoursesError> {
    let params = query.pagination();

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM courses {}", VISIBLE_FILTER))
        .bind(query.viewer_id)
        .bind(query.category_id)
        .bind(query.instructor_id)
        .fetch_one(&pool)
        .await?;

    let courses = sqlx::query_as::<_, Course>(&format!(
        "SELECT {} FROM courses {} ORDER BY created_at DESC LIMIT $4 OFFSET $5",
        COURSE_COLUMNS, VISIBLE_FILTER
    ))
    .bind(query.viewer_id)
    .bind(query.category_id)
    .bind(query.instructor_id)
    .bind(params.per_page())
    .bind(params.offset())
    .fetch_all(&pool)
    .await?;

    Ok(Paginated::from_items(courses, &params, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{TestAccount, TestCourse};
    use crate::models::Role;

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore] // Requires database
    async fn test_drafts_visible_only_to_owner(pool: PgPool) -> sqlx::Result<()> {
        let owner = TestAccount::new("prof").role(Role::Instructor).create(&pool).await?;
        let other = TestAccount::new("rival").role(Role::Instructor).create(&pool).await?;
        TestCourse::new(owner.id).create(&pool).await?;
        TestCourse::new(owner.id).published(false).create(&pool).await?;

        let anonymous = handle(pool.clone(), ListCoursesQuery::default()).await.unwrap();
        assert_eq!(anonymous.items.len(), 1);

        let as_other = ListCoursesQuery {
            viewer_id: Some(other.id),
            ..Default::default()
        };
        assert_eq!(handle(pool.clone(), as_other).await.unwrap().items.len(), 1);

        let as_owner = ListCoursesQuery {
            viewer_id: Some(owner.id),
            ..Default::default()
        };
        let listing = handle(pool.clone(), as_owner).await.unwrap();
        assert_eq!(listing.items.len(), 2);
        assert_eq!(listing.pagination.total, 2);
        Ok(())
    }
}
