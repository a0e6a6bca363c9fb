use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::shared::lookup;
use crate::models::LessonType;

/// Curriculum entry: enough to preview a course without its content
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LessonOutline {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "order")]
    pub position: i32,
    pub lesson_type: LessonType,
    pub has_quiz: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListLessonsQuery {
    pub viewer_id: Option<Uuid>,
    pub course_id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum ListLessonsError {
    #[error("Course '{0}' not found")]
    CourseNotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<Vec<LessonOutline>, ListLessonsError>> for ListLessonsQuery {}

impl crate::cqrs::middleware::Query for ListLessonsQuery {}

#[tracing::instrument(skip(pool), fields(course_id = %query.course_id))]
pub async fn handle(pool: PgPool, query: ListLessonsQuery) -> Result<Vec<LessonOutline>, ListLessonsError> {
    let course = lookup::find_visible_course(&pool, query.course_id, query.viewer_id)
        .await?
        .ok_or(ListLessonsError::CourseNotFound(query.course_id))?;

    let lessons = sqlx::query_as::<_, LessonOutline>(
        r#"
        SELECT l.id, l.title, l.position, l.lesson_type,
               EXISTS(SELECT 1 FROM quizzes q WHERE q.lesson_id = l.id) AS has_quiz
        FROM lessons l
        WHERE l.course_id = $1
        ORDER BY l.position, l.created_at
        "#,
    )
    .bind(course.id)
    .fetch_all(&pool)
    .await?;

    Ok(lessons)
}
