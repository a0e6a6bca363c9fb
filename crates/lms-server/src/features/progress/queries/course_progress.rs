//! Course progress for the caller

use mediator::Request;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::enrollments::ledger;
use crate::features::progress::completion;
use crate::features::shared::{lookup, require_account, AuthError};

#[derive(Debug, Clone)]
pub struct CourseProgressQuery {
    pub caller_id: Uuid,
    pub course_id: Uuid,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct NextLesson {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "order")]
    pub position: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseProgressResponse {
    pub course_id: Uuid,
    pub completed_lessons: i64,
    pub total_lessons: i64,
    pub percentage: f64,
    pub completed_lesson_ids: Vec<Uuid>,
    /// First unfinished lesson by display order
    pub next_lesson: Option<NextLesson>,
    pub certificate_id: Option<Uuid>,
}

#[derive(Debug, thiserror::Error)]
pub enum CourseProgressError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Course '{0}' not found")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<CourseProgressResponse, CourseProgressError>> for CourseProgressQuery {}

impl crate::cqrs::middleware::Query for CourseProgressQuery {}

#[tracing::instrument(skip(pool, query), fields(course_id = %query.course_id))]
pub async fn handle(
    pool: PgPool,
    query: CourseProgressQuery,
) -> Result<CourseProgressResponse, CourseProgressError> {
    let caller = require_account(&pool, query.caller_id).await?;
    let course = lookup::find_visible_course(&pool, query.course_id, Some(caller.id))
        .await?
        .ok_or(CourseProgressError::NotFound(query.course_id))?;

    if !ledger::can_access_course(&pool, caller.id, &course).await? {
        return Err(AuthError::PermissionDenied.into());
    }

    let mut conn = pool.acquire().await?;
    let snapshot = completion::snapshot(&mut conn, caller.id, course.id).await?;

    let completed_lesson_ids = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT l.id
        FROM lesson_progress lp
        JOIN lessons l ON l.id = lp.lesson_id
        WHERE lp.student_id = $1 AND l.course_id = $2 AND lp.is_completed
        ORDER BY l.position, l.created_at
        "#,
    )
    .bind(caller.id)
    .bind(course.id)
    .fetch_all(&mut *conn)
    .await?;

    let next_lesson = sqlx::query_as::<_, NextLesson>(
        r#"
        SELECT l.id, l.title, l.position
        FROM lessons l
        LEFT JOIN lesson_progress lp
               ON lp.lesson_id = l.id AND lp.student_id = $1 AND lp.is_completed
        WHERE l.course_id = $2 AND lp.id IS NULL
        ORDER BY l.position, l.created_at
        LIMIT 1
        "#,
    )
    .bind(caller.id)
    .bind(course.id)
    .fetch_optional(&mut *conn)
    .await?;

    let certificate_id = if snapshot.is_complete() {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM certificates WHERE student_id = $1 AND course_id = $2",
        )
        .bind(caller.id)
        .bind(course.id)
        .fetch_optional(&mut *conn)
        .await?
    } else {
        None
    };

    Ok(CourseProgressResponse {
        course_id: course.id,
        completed_lessons: snapshot.completed,
        total_lessons: snapshot.total,
        percentage: snapshot.percentage(),
        completed_lesson_ids,
        next_lesson,
        certificate_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{enroll, TestAccount, TestCourse, TestLesson};
    use crate::models::Role;

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore] // Requires database
    async fn test_next_lesson_follows_order(pool: PgPool) -> sqlx::Result<()> {
        let instructor = TestAccount::new("prof").role(Role::Instructor).create(&pool).await?;
        let student = TestAccount::new("stu").create(&pool).await?;
        let course = TestCourse::new(instructor.id).create(&pool).await?;
        let first = TestLesson::new(course.id).position(1).create(&pool).await?;
        let second = TestLesson::new(course.id).position(2).create(&pool).await?;
        enroll(&pool, student.id, course.id).await?;

        sqlx::query("INSERT INTO lesson_progress (student_id, lesson_id, is_completed) VALUES ($1, $2, TRUE)")
            .bind(student.id)
            .bind(first.id)
            .execute(&pool)
            .await?;

        let progress = handle(
            pool.clone(),
            CourseProgressQuery {
                caller_id: student.id,
                course_id: course.id,
            },
        )
        .await
        .unwrap();

        assert_eq!(progress.percentage, 50.0);
        assert_eq!(progress.completed_lesson_ids, vec![first.id]);
        assert_eq!(progress.next_lesson.map(|l| l.id), Some(second.id));
        assert!(progress.certificate_id.is_none());
        Ok(())
    }
}
