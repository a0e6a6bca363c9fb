use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::shared::error_helpers::map_unique_violation;
use crate::features::shared::validation::{validate_name, NameValidationError};
use crate::features::shared::{lookup, require_account, AuthError};
use crate::models::Quiz;

fn default_pass_score() -> i32 {
    70
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateQuizCommand {
    #[serde(skip)]
    pub caller_id: Uuid,

    #[serde(skip)]
    pub lesson_id: Uuid,

    pub title: String,
    /// Percentage needed to pass
    #[serde(default = "default_pass_score")]
    pub pass_score: i32,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateQuizError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Title: {0}")]
    TitleValidation(#[from] NameValidationError),

    #[error("Pass score must be between 0 and 100")]
    PassScoreRange,

    #[error("Lesson '{0}' not found")]
    LessonNotFound(Uuid),

    #[error("Lesson '{0}' already has a quiz")]
    AlreadyExists(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<Quiz, CreateQuizError>> for CreateQuizCommand {}

impl crate::cqrs::middleware::Command for CreateQuizCommand {}

impl CreateQuizCommand {
    pub fn validate(&self) -> Result<(), CreateQuizError> {
        validate_name(&self.title, 200)?;
        if !(0..=100).contains(&self.pass_score) {
            return Err(CreateQuizError::PassScoreRange);
        }
        Ok(())
    }
}

#[tracing::instrument(
    skip(pool, command),
    fields(caller_id = %command.caller_id, lesson_id = %command.lesson_id)
)]
pub async fn handle(pool: PgPool, command: CreateQuizCommand) -> Result<Quiz, CreateQuizError> {
    command.validate()?;

    let caller = require_account(&pool, command.caller_id).await?;
    let course = lookup::find_lesson_course(&pool, command.lesson_id)
        .await?
        .ok_or(CreateQuizError::LessonNotFound(command.lesson_id))?;

    if !course.is_owned_by(caller.id) {
        return Err(AuthError::PermissionDenied.into());
    }

    let quiz = sqlx::query_as::<_, Quiz>(
        r#"
        INSERT INTO quizzes (lesson_id, title, pass_score)
        VALUES ($1, $2, $3)
        RETURNING id, lesson_id, title, pass_score, created_at
        "#,
    )
    .bind(command.lesson_id)
    .bind(command.title.trim())
    .bind(command.pass_score)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        map_unique_violation(e, CreateQuizError::AlreadyExists(command.lesson_id), CreateQuizError::Database)
    })?;

    tracing::info!(quiz_id = %quiz.id, "Quiz created");
    Ok(quiz)
}
