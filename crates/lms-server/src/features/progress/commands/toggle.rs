//! Toggle a lesson's completion flag

use mediator::Request;
use serde::Serialize;
use uuid::Uuid;

use super::{authorize_lesson, LessonAccess};
use crate::events::{self, DomainEvent, Effects, EventError};
use crate::features::progress::completion;
use crate::features::shared::AuthError;
use crate::features::FeatureState;
use crate::models::LessonProgress;

#[derive(Debug, Clone)]
pub struct ToggleLessonCommand {
    pub caller_id: Uuid,
    pub lesson_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToggleLessonResponse {
    pub lesson_id: Uuid,
    pub is_completed: bool,
    pub progress_percentage: f64,
    /// Set when this toggle completed the course
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_id: Option<Uuid>,
}

#[derive(Debug, thiserror::Error)]
pub enum ToggleLessonError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Lesson '{0}' not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<ToggleLessonResponse, ToggleLessonError>> for ToggleLessonCommand {}

impl crate::cqrs::middleware::Command for ToggleLessonCommand {}

pub(crate) const PROGRESS_COLUMNS: &str = "id, student_id, lesson_id, is_completed, completed_at";

#[tracing::instrument(
    skip(state, command),
    fields(caller_id = %command.caller_id, lesson_id = %command.lesson_id)
)]
pub async fn handle(
    state: FeatureState,
    command: ToggleLessonCommand,
) -> Result<ToggleLessonResponse, ToggleLessonError> {
    let mut tx = state.db.begin().await?;

    let course = match authorize_lesson(&mut tx, command.caller_id, command.lesson_id).await? {
        LessonAccess::Allowed(course) => course,
        LessonAccess::Missing => return Err(ToggleLessonError::NotFound(command.lesson_id)),
    };

    // get-or-create and flip in one statement; a new row starts false and
    // is flipped to true
    let progress = sqlx::query_as::<_, LessonProgress>(&format!(
        r#"
        INSERT INTO lesson_progress (student_id, lesson_id, is_completed, completed_at)
        VALUES ($1, $2, TRUE, NOW())
        ON CONFLICT (student_id, lesson_id) DO UPDATE
        SET is_completed = NOT lesson_progress.is_completed,
            completed_at = CASE WHEN lesson_progress.is_completed THEN NULL ELSE NOW() END
        RETURNING {}
        "#,
        PROGRESS_COLUMNS
    ))
    .bind(command.caller_id)
    .bind(command.lesson_id)
    .fetch_one(&mut *tx)
    .await?;

    let effects = if progress.is_completed {
        events::dispatch(
            &mut tx,
            &state,
            DomainEvent::LessonCompleted {
                student_id: command.caller_id,
                lesson_id: command.lesson_id,
            },
        )
        .await?
    } else {
        Effects::default()
    };

    let snapshot = completion::snapshot(&mut tx, command.caller_id, course.id).await?;
    tx.commit().await?;

    tracing::info!(is_completed = progress.is_completed, "Lesson progress toggled");

    let certificate_id = effects.certificate_id;
    effects.flush(state.mailer.as_ref()).await;

    Ok(ToggleLessonResponse {
        lesson_id: command.lesson_id,
        is_completed: progress.is_completed,
        progress_percentage: snapshot.percentage(),
        certificate_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{enroll, test_state, TestAccount, TestCourse, TestLesson};
    use crate::models::Role;
    use sqlx::PgPool;

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore] // Requires database
    async fn test_toggle_requires_enrollment(pool: PgPool) -> sqlx::Result<()> {
        let (state, _) = test_state(pool.clone());
        let instructor = TestAccount::new("prof").role(Role::Instructor).create(&pool).await?;
        let student = TestAccount::new("stu").create(&pool).await?;
        let course = TestCourse::new(instructor.id).create(&pool).await?;
        let lesson = TestLesson::new(course.id).create(&pool).await?;

        let result = handle(
            state,
            ToggleLessonCommand {
                caller_id: student.id,
                lesson_id: lesson.id,
            },
        )
        .await;
        assert!(matches!(result, Err(ToggleLessonError::Auth(AuthError::PermissionDenied))));
        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore] // Requires database
    async fn test_recompletion_keeps_one_certificate(pool: PgPool) -> sqlx::Result<()> {
        let (state, mailer) = test_state(pool.clone());
        let instructor = TestAccount::new("prof").role(Role::Instructor).create(&pool).await?;
        let student = TestAccount::new("stu").create(&pool).await?;
        let course = TestCourse::new(instructor.id).create(&pool).await?;
        let first = TestLesson::new(course.id).position(1).create(&pool).await?;
        let second = TestLesson::new(course.id).position(2).create(&pool).await?;
        enroll(&pool, student.id, course.id).await?;

        let toggle = |lesson_id| ToggleLessonCommand {
            caller_id: student.id,
            lesson_id,
        };

        let r = handle(state.clone(), toggle(first.id)).await.unwrap();
        assert!(r.is_completed);
        assert_eq!(r.progress_percentage, 50.0);
        assert!(r.certificate_id.is_none());

        let r = handle(state.clone(), toggle(second.id)).await.unwrap();
        let certificate_id = r.certificate_id.expect("course completed");
        assert_eq!(r.progress_percentage, 100.0);

        // un-complete and re-complete
        let r = handle(state.clone(), toggle(second.id)).await.unwrap();
        assert!(!r.is_completed);
        let r = handle(state.clone(), toggle(second.id)).await.unwrap();
        assert_eq!(r.certificate_id, Some(certificate_id));

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM certificates WHERE student_id = $1 AND course_id = $2",
        )
        .bind(student.id)
        .bind(course.id)
        .fetch_one(&pool)
        .await?;
        assert_eq!(count, 1);

        let certificate_mails = mailer
            .sent()
            .into_iter()
            .filter(|m| m.subject.starts_with("You earned a certificate"))
            .count();
        assert_eq!(certificate_mails, 1);
        Ok(())
    }
}
