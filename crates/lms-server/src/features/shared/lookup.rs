//! Row lookups used across features

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::{Course, Lesson, Quiz, COURSE_COLUMNS, LESSON_COLUMNS};

pub async fn find_course<'e, E>(executor: E, id: Uuid) -> Result<Option<Course>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Course>(&format!("SELECT {} FROM courses WHERE id = $1", COURSE_COLUMNS))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Course visible to `viewer`: published, or owned by them
pub async fn find_visible_course<'e, E>(
    executor: E,
    id: Uuid,
    viewer: Option<Uuid>,
) -> Result<Option<Course>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let course = find_course(executor, id).await?;
    Ok(course.filter(|c| c.is_published || viewer.is_some_and(|v| c.is_owned_by(v))))
}

pub async fn find_lesson<'e, E>(executor: E, id: Uuid) -> Result<Option<Lesson>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Lesson>(&format!("SELECT {} FROM lessons WHERE id = $1", LESSON_COLUMNS))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn find_quiz<'e, E>(executor: E, id: Uuid) -> Result<Option<Quiz>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Quiz>(
        "SELECT id, lesson_id, title, pass_score, created_at FROM quizzes WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// The course a lesson belongs to
pub async fn find_lesson_course<'e, E>(executor: E, lesson_id: Uuid) -> Result<Option<Course>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Course>(&format!(
        "SELECT {} FROM courses WHERE id = (SELECT course_id FROM lessons WHERE id = $1)",
        COURSE_COLUMNS
    ))
    .bind(lesson_id)
    .fetch_optional(executor)
    .await
}

/// The course a quiz belongs to, through its lesson
pub async fn find_quiz_course<'e, E>(executor: E, quiz_id: Uuid) -> Result<Option<Course>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Course>(&format!(
        r#"
        SELECT {} FROM courses
        WHERE id = (
            SELECT l.course_id FROM quizzes q JOIN lessons l ON l.id = q.lesson_id
            WHERE q.id = $1
        )
        "#,
        COURSE_COLUMNS
    ))
    .bind(quiz_id)
    .fetch_optional(executor)
    .await
}
