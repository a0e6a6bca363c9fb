//! Submit answers to a quiz
//!
//! Grades the submission against the stored answer key and records a new,
//! immutable attempt. The retake policy is checked first.

use chrono::{DateTime, Utc};
use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use std::collections::HashMap;
use uuid::Uuid;

use crate::features::enrollments::ledger;
use crate::features::quizzes::grading::{grade, AnswerKey, AttemptDenied};
use crate::features::shared::{lookup, require_account, AuthError};
use crate::features::FeatureState;
use crate::models::QuizAttempt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitQuizCommand {
    #[serde(skip)]
    pub caller_id: Uuid,

    #[serde(skip)]
    pub quiz_id: Uuid,

    /// Question id to chosen answer id
    #[serde(default)]
    pub answers: HashMap<Uuid, Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitQuizResponse {
    pub attempt_id: Uuid,
    pub quiz_id: Uuid,
    pub score: f64,
    pub passed: bool,
    pub correct: usize,
    pub total: usize,
    pub pass_score: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitQuizError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Quiz '{0}' not found")]
    NotFound(Uuid),

    #[error(transparent)]
    AttemptDenied(#[from] AttemptDenied),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<SubmitQuizResponse, SubmitQuizError>> for SubmitQuizCommand {}

impl crate::cqrs::middleware::Command for SubmitQuizCommand {}

#[derive(sqlx::FromRow)]
struct KeyRow {
    id: Uuid,
    question_id: Uuid,
    is_correct: bool,
}

async fn load_answer_key(conn: &mut PgConnection, quiz_id: Uuid) -> Result<AnswerKey, sqlx::Error> {
    let question_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE quiz_id = $1")
        .bind(quiz_id)
        .fetch_one(&mut *conn)
        .await?;

    let rows = sqlx::query_as::<_, KeyRow>(
        r#"
        SELECT a.id, a.question_id, a.is_correct
        FROM answers a
        JOIN questions q ON q.id = a.question_id
        WHERE q.quiz_id = $1
        "#,
    )
    .bind(quiz_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().fold(
        AnswerKey::new(question_count as usize),
        |key, row| key.with_answer(row.id, row.question_id, row.is_correct),
    ))
}

#[tracing::instrument(
    skip(state, command),
    fields(caller_id = %command.caller_id, quiz_id = %command.quiz_id, answers = command.answers.len())
)]
pub async fn handle(
    state: FeatureState,
    command: SubmitQuizCommand,
) -> Result<SubmitQuizResponse, SubmitQuizError> {
    let mut tx = state.db.begin().await?;

    let caller = require_account(&mut *tx, command.caller_id).await?;
    let quiz = lookup::find_quiz(&mut *tx, command.quiz_id)
        .await?
        .ok_or(SubmitQuizError::NotFound(command.quiz_id))?;
    let course = lookup::find_quiz_course(&mut *tx, quiz.id)
        .await?
        .ok_or(SubmitQuizError::NotFound(command.quiz_id))?;

    if !ledger::can_access_course(&mut *tx, caller.id, &course).await? {
        return Err(AuthError::PermissionDenied.into());
    }

    // Serialise submissions per student so the attempt count stays accurate
    sqlx::query("SELECT 1 FROM accounts WHERE id = $1 FOR UPDATE")
        .bind(caller.id)
        .execute(&mut *tx)
        .await?;

    let (prior, last_at): (i64, Option<DateTime<Utc>>) = sqlx::query_as(
        "SELECT COUNT(*), MAX(created_at) FROM quiz_attempts WHERE student_id = $1 AND quiz_id = $2",
    )
    .bind(caller.id)
    .bind(quiz.id)
    .fetch_one(&mut *tx)
    .await?;

    state
        .settings
        .attempt_policy
        .check(u32::try_from(prior).unwrap_or(u32::MAX), last_at, Utc::now())?;

    let key = load_answer_key(&mut tx, quiz.id).await?;
    let result = grade(&key, &command.answers, quiz.pass_score);

    let attempt = sqlx::query_as::<_, QuizAttempt>(
        r#"
        INSERT INTO quiz_attempts (student_id, quiz_id, score, passed)
        VALUES ($1, $2, $3, $4)
        RETURNING id, student_id, quiz_id, score, passed, created_at
        "#,
    )
    .bind(caller.id)
    .bind(quiz.id)
    .bind(result.score)
    .bind(result.passed)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        attempt_id = %attempt.id,
        score = result.score,
        passed = result.passed,
        "Quiz attempt recorded"
    );

    Ok(SubmitQuizResponse {
        attempt_id: attempt.id,
        quiz_id: quiz.id,
        score: result.score,
        passed: result.passed,
        correct: result.correct,
        total: result.total,
        pass_score: quiz.pass_score,
        created_at: attempt.created_at,
    })
}
