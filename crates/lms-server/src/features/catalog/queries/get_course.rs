use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::shared::lookup;
use crate::models::Course;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetCourseQuery {
    pub viewer_id: Option<Uuid>,
    pub course_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub instructor_name: String,
    pub category: Option<String>,
    pub lesson_count: i64,
    pub student_count: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum GetCourseError {
    #[error("Course '{0}' not found")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<CourseDetail, GetCourseError>> for GetCourseQuery {}

impl crate::cqrs::middleware::Query for GetCourseQuery {}

#[derive(sqlx::FromRow)]
struct CourseStats {
    instructor_name: String,
    category: Option<String>,
    lesson_count: i64,
    student_count: i64,
}

/// Unpublished courses are reported missing to everyone but their owner
#[tracing::instrument(skip(pool), fields(course_id = %query.course_id))]
pub async fn handle(pool: PgPool, query: GetCourseQuery) -> Result<CourseDetail, GetCourseError> {
    let course = lookup::find_visible_course(&pool, query.course_id, query.viewer_id)
        .await?
        .ok_or(GetCourseError::NotFound(query.course_id))?;

    let stats = sqlx::query_as::<_, CourseStats>(
        r#"
        SELECT
            COALESCE(NULLIF(TRIM(a.full_name), ''), a.username) AS instructor_name,
            cat.title AS category,
            (SELECT COUNT(*) FROM lessons WHERE course_id = c.id) AS lesson_count,
            (SELECT COUNT(*) FROM enrollments WHERE course_id = c.id) AS student_count
        FROM courses c
        JOIN accounts a ON a.id = c.instructor_id
        LEFT JOIN categories cat ON cat.id = c.category_id
        WHERE c.id = $1
        "#,
    )
    .bind(course.id)
    .fetch_one(&pool)
    .await?;

    Ok(CourseDetail {
        course,
        instructor_name: stats.instructor_name,
        category: stats.category,
        lesson_count: stats.lesson_count,
        student_count: stats.student_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{enroll, TestAccount, TestCourse, TestLesson};
    use crate::models::Role;

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore] // Requires database
    async fn test_detail_counts(pool: PgPool) -> sqlx::Result<()> {
        let instructor = TestAccount::new("prof").role(Role::Instructor).create(&pool).await?;
        let student = TestAccount::new("stu").create(&pool).await?;
        let course = TestCourse::new(instructor.id).create(&pool).await?;
        TestLesson::new(course.id).position(1).create(&pool).await?;
        TestLesson::new(course.id).position(2).create(&pool).await?;
        enroll(&pool, student.id, course.id).await?;

        let detail = handle(
            pool.clone(),
            GetCourseQuery {
                viewer_id: None,
                course_id: course.id,
            },
        )
        .await
        .unwrap();
        assert_eq!(detail.lesson_count, 2);
        assert_eq!(detail.student_count, 1);
        assert_eq!(detail.instructor_name, instructor.display_name());
        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore] // Requires database
    async fn test_draft_hidden_from_others(pool: PgPool) -> sqlx::Result<()> {
        let instructor = TestAccount::new("prof").role(Role::Instructor).create(&pool).await?;
        let student = TestAccount::new("stu").create(&pool).await?;
        let course = TestCourse::new(instructor.id).published(false).create(&pool).await?;

        let as_student = GetCourseQuery {
            viewer_id: Some(student.id),
            course_id: course.id,
        };
        assert!(matches!(handle(pool.clone(), as_student).await, Err(GetCourseError::NotFound(_))));

        let as_owner = GetCourseQuery {
            viewer_id: Some(instructor.id),
            course_id: course.id,
        };
        assert!(handle(pool.clone(), as_owner).await.is_ok());
        Ok(())
    }
}
