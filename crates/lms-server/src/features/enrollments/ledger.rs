//! The enrollment ledger
//!
//! Every path that grants access to a course (free enroll, verified payment)
//! goes through [`enroll`], which relies on the unique (student, course)
//! constraint instead of a read-then-write check.

use sqlx::{Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::events::{self, DomainEvent, Effects, EventError};
use crate::features::FeatureState;
use crate::models::{Course, Enrollment};

const ENROLLMENT_COLUMNS: &str = "id, student_id, course_id, enrolled_at";

/// Insert the enrollment unless it exists; returns the row and whether it
/// was created by this call
pub async fn get_or_create(
    conn: &mut PgConnection,
    student_id: Uuid,
    course_id: Uuid,
) -> Result<(Enrollment, bool), sqlx::Error> {
    let inserted = sqlx::query_as::<_, Enrollment>(&format!(
        r#"
        INSERT INTO enrollments (student_id, course_id)
        VALUES ($1, $2)
        ON CONFLICT (student_id, course_id) DO NOTHING
        RETURNING {}
        "#,
        ENROLLMENT_COLUMNS
    ))
    .bind(student_id)
    .bind(course_id)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(enrollment) = inserted {
        return Ok((enrollment, true));
    }

    let existing = sqlx::query_as::<_, Enrollment>(&format!(
        "SELECT {} FROM enrollments WHERE student_id = $1 AND course_id = $2",
        ENROLLMENT_COLUMNS
    ))
    .bind(student_id)
    .bind(course_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok((existing, false))
}

/// Enroll the student and run the `EnrollmentCreated` reactions when the
/// row is new. The returned effects must be flushed after commit.
#[tracing::instrument(skip(conn, state))]
pub async fn enroll(
    conn: &mut PgConnection,
    state: &FeatureState,
    student_id: Uuid,
    course_id: Uuid,
) -> Result<(Enrollment, bool, Effects), EventError> {
    let (enrollment, created) = get_or_create(conn, student_id, course_id).await?;

    let effects = if created {
        tracing::info!(enrollment_id = %enrollment.id, "Enrollment created");
        events::dispatch(conn, state, DomainEvent::EnrollmentCreated { student_id, course_id })
            .await?
    } else {
        Effects::default()
    };

    Ok((enrollment, created, effects))
}

pub async fn is_enrolled<'e, E>(executor: E, student_id: Uuid, course_id: Uuid) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM enrollments WHERE student_id = $1 AND course_id = $2)",
    )
    .bind(student_id)
    .bind(course_id)
    .fetch_one(executor)
    .await
}

/// Owners always have access; everyone else needs an enrollment
pub async fn can_access_course<'e, E>(
    executor: E,
    account_id: Uuid,
    course: &Course,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    if course.is_owned_by(account_id) {
        return Ok(true);
    }
    is_enrolled(executor, account_id, course.id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{TestAccount, TestCourse};
    use crate::models::Role;
    use sqlx::PgPool;

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore] // Requires database
    async fn test_get_or_create_is_idempotent(pool: PgPool) -> sqlx::Result<()> {
        let instructor = TestAccount::new("teach").role(Role::Instructor).create(&pool).await?;
        let student = TestAccount::new("learn").create(&pool).await?;
        let course = TestCourse::new(instructor.id).create(&pool).await?;

        let mut conn = pool.acquire().await?;
        let (first, created) = get_or_create(&mut conn, student.id, course.id).await?;
        assert!(created);
        let (second, created) = get_or_create(&mut conn, student.id, course.id).await?;
        assert!(!created);
        assert_eq!(first.id, second.id);

        assert!(is_enrolled(&pool, student.id, course.id).await?);
        assert!(can_access_course(&pool, instructor.id, &course).await?);
        assert!(!can_access_course(&pool, Uuid::new_v4(), &course).await?);
        Ok(())
    }
}
