//! Mark a lesson complete (idempotent)

use mediator::Request;
use uuid::Uuid;

use super::toggle::{ToggleLessonResponse, PROGRESS_COLUMNS};
use super::{authorize_lesson, LessonAccess};
use crate::events::{self, DomainEvent, Effects, EventError};
use crate::features::progress::completion;
use crate::features::shared::AuthError;
use crate::features::FeatureState;
use crate::models::LessonProgress;

#[derive(Debug, Clone)]
pub struct MarkLessonCompleteCommand {
    pub caller_id: Uuid,
    pub lesson_id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum MarkLessonCompleteError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Lesson '{0}' not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<ToggleLessonResponse, MarkLessonCompleteError>> for MarkLessonCompleteCommand {}

impl crate::cqrs::middleware::Command for MarkLessonCompleteCommand {}

#[tracing::instrument(
    skip(state, command),
    fields(caller_id = %command.caller_id, lesson_id = %command.lesson_id)
)]
pub async fn handle(
    state: FeatureState,
    command: MarkLessonCompleteCommand,
) -> Result<ToggleLessonResponse, MarkLessonCompleteError> {
    let mut tx = state.db.begin().await?;

    let course = match authorize_lesson(&mut tx, command.caller_id, command.lesson_id).await? {
        LessonAccess::Allowed(course) => course,
        LessonAccess::Missing => return Err(MarkLessonCompleteError::NotFound(command.lesson_id)),
    };

    // Returns a row only on a false -> true transition
    let transitioned = sqlx::query_as::<_, LessonProgress>(&format!(
        r#"
        INSERT INTO lesson_progress (student_id, lesson_id, is_completed, completed_at)
        VALUES ($1, $2, TRUE, NOW())
        ON CONFLICT (student_id, lesson_id) DO UPDATE
        SET is_completed = TRUE, completed_at = NOW()
        WHERE lesson_progress.is_completed = FALSE
        RETURNING {}
        "#,
        PROGRESS_COLUMNS
    ))
    .bind(command.caller_id)
    .bind(command.lesson_id)
    .fetch_optional(&mut *tx)
    .await?;

    let effects = if transitioned.is_some() {
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
        tracing::debug!("Lesson already complete");
        Effects::default()
    };

    let snapshot = completion::snapshot(&mut tx, command.caller_id, course.id).await?;
    tx.commit().await?;

    let certificate_id = effects.certificate_id;
    effects.flush(state.mailer.as_ref()).await;

    Ok(ToggleLessonResponse {
        lesson_id: command.lesson_id,
        is_completed: true,
        progress_percentage: snapshot.percentage(),
        certificate_id,
    })
}
