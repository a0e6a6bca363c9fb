use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::shared::{lookup, require_account, AuthError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteCourseCommand {
    pub caller_id: Uuid,
    pub course_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteCourseResponse {
    pub id: Uuid,
    pub deleted: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteCourseError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Course '{0}' not found")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<DeleteCourseResponse, DeleteCourseError>> for DeleteCourseCommand {}

impl crate::cqrs::middleware::Command for DeleteCourseCommand {}

/// Lessons, enrollments, progress and certificates cascade with the course;
/// payments keep their history with the course reference cleared.
#[tracing::instrument(skip(pool), fields(caller_id = %command.caller_id, course_id = %command.course_id))]
pub async fn handle(pool: PgPool, command: DeleteCourseCommand) -> Result<DeleteCourseResponse, DeleteCourseError> {
    let mut tx = pool.begin().await?;
    let caller = require_account(&mut *tx, command.caller_id).await?;

    let course = lookup::find_course(&mut *tx, command.course_id)
        .await?
        .ok_or(DeleteCourseError::NotFound(command.course_id))?;

    if !course.is_owned_by(caller.id) {
        return Err(AuthError::PermissionDenied.into());
    }

    sqlx::query("DELETE FROM courses WHERE id = $1")
        .bind(course.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(course_id = %course.id, "Course deleted");
    Ok(DeleteCourseResponse {
        id: course.id,
        deleted: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{TestAccount, TestCourse, TestLesson};
    use crate::models::Role;

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore] // Requires database
    async fn test_delete_cascades_lessons(pool: PgPool) -> sqlx::Result<()> {
        let instructor = TestAccount::new("prof").role(Role::Instructor).create(&pool).await?;
        let course = TestCourse::new(instructor.id).create(&pool).await?;
        TestLesson::new(course.id).create(&pool).await?;

        let response = handle(
            pool.clone(),
            DeleteCourseCommand {
                caller_id: instructor.id,
                course_id: course.id,
            },
        )
        .await
        .unwrap();
        assert!(response.deleted);

        let lessons: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lessons")
            .fetch_one(&pool)
            .await?;
        assert_eq!(lessons, 0);
        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore] // Requires database
    async fn test_students_cannot_delete(pool: PgPool) -> sqlx::Result<()> {
        let instructor = TestAccount::new("prof").role(Role::Instructor).create(&pool).await?;
        let student = TestAccount::new("stu").create(&pool).await?;
        let course = TestCourse::new(instructor.id).create(&pool).await?;

        let result = handle(
            pool.clone(),
            DeleteCourseCommand {
                caller_id: student.id,
                course_id: course.id,
            },
        )
        .await;
        assert!(matches!(result, Err(DeleteCourseError::Auth(AuthError::PermissionDenied))));
        Ok(())
    }
}
