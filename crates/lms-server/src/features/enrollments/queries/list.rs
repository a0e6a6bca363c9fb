//! The caller's enrollments with course titles

use chrono::{DateTime, Utc};
use mediator::Request;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::shared::{require_account, AuthError};

#[derive(Debug, Clone)]
pub struct ListEnrollmentsQuery {
    pub caller_id: Uuid,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EnrolledCourse {
    pub enrollment_id: Uuid,
    pub course_id: Uuid,
    pub course_title: String,
    pub enrolled_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListEnrollmentsError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<Vec<EnrolledCourse>, ListEnrollmentsError>> for ListEnrollmentsQuery {}

impl crate::cqrs::middleware::Query for ListEnrollmentsQuery {}

pub async fn enrolled_courses<'e, E>(executor: E, student_id: Uuid) -> Result<Vec<EnrolledCourse>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query_as::<_, EnrolledCourse>(
        r#"
        SELECT e.id AS enrollment_id, c.id AS course_id, c.title AS course_title, e.enrolled_at
        FROM enrollments e
        JOIN courses c ON c.id = e.course_id
        WHERE e.student_id = $1
        ORDER BY e.enrolled_at DESC
        "#,
    )
    .bind(student_id)
    .fetch_all(executor)
    .await
}

#[tracing::instrument(skip(pool, query), fields(caller_id = %query.caller_id))]
pub async fn handle(
    pool: PgPool,
    query: ListEnrollmentsQuery,
) -> Result<Vec<EnrolledCourse>, ListEnrollmentsError> {
    let caller = require_account(&pool, query.caller_id).await?;
    Ok(enrolled_courses(&pool, caller.id).await?)
}
