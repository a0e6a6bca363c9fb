//! The caller's attempts on a quiz, newest first

use mediator::Request;
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::shared::{lookup, require_account, AuthError};
use crate::models::QuizAttempt;

#[derive(Debug, Clone)]
pub struct ListAttemptsQuery {
    pub caller_id: Uuid,
    pub quiz_id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum ListAttemptsError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Quiz '{0}' not found")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<Vec<QuizAttempt>, ListAttemptsError>> for ListAttemptsQuery {}

impl crate::cqrs::middleware::Query for ListAttemptsQuery {}

#[tracing::instrument(skip(pool, query), fields(quiz_id = %query.quiz_id))]
pub async fn handle(pool: PgPool, query: ListAttemptsQuery) -> Result<Vec<QuizAttempt>, ListAttemptsError> {
    let caller = require_account(&pool, query.caller_id).await?;
    lookup::find_quiz(&pool, query.quiz_id)
        .await?
        .ok_or(ListAttemptsError::NotFound(query.quiz_id))?;

    let attempts = sqlx::query_as::<_, QuizAttempt>(
        r#"
        SELECT id, student_id, quiz_id, score, passed, created_at
        FROM quiz_attempts
        WHERE student_id = $1 AND quiz_id = $2
        ORDER BY created_at DESC
        "#,
    )
    .bind(caller.id)
    .bind(query.quiz_id)
    .fetch_all(&pool)
    .await?;

    Ok(attempts)
}
