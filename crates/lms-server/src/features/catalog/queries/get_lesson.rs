use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::enrollments::ledger;
use crate::features::shared::{lookup, require_account, AuthError};
use crate::models::Lesson;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetLessonQuery {
    pub caller_id: Uuid,
    pub lesson_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonDetail {
    #[serde(flatten)]
    pub lesson: Lesson,
    pub quiz_id: Option<Uuid>,
    pub is_completed: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum GetLessonError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Lesson '{0}' not found")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<LessonDetail, GetLessonError>> for GetLessonQuery {}

impl crate::cqrs::middleware::Query for GetLessonQuery {}

/// Lesson content is gated: enrolled students and the course owner only
#[tracing::instrument(skip(pool), fields(caller_id = %query.caller_id, lesson_id = %query.lesson_id))]
pub async fn handle(pool: PgPool, query: GetLessonQuery) -> Result<LessonDetail, GetLessonError> {
    let caller = require_account(&pool, query.caller_id).await?;
    let lesson = lookup::find_lesson(&pool, query.lesson_id)
        .await?
        .ok_or(GetLessonError::NotFound(query.lesson_id))?;
    let course = lookup::find_course(&pool, lesson.course_id)
        .await?
        .ok_or(GetLessonError::NotFound(query.lesson_id))?;

    if !ledger::can_access_course(&pool, caller.id, &course).await? {
        return Err(AuthError::PermissionDenied.into());
    }

    let quiz_id: Option<Uuid> = sqlx::query_scalar("SELECT id FROM quizzes WHERE lesson_id = $1")
        .bind(lesson.id)
        .fetch_optional(&pool)
        .await?;

    let is_completed: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM lesson_progress
            WHERE student_id = $1 AND lesson_id = $2 AND is_completed
        )
        "#,
    )
    .bind(caller.id)
    .bind(lesson.id)
    .fetch_one(&pool)
    .await?;

    Ok(LessonDetail {
        lesson,
        quiz_id,
        is_completed,
    })
}
