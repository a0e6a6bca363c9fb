//! Quiz with its questions
//!
//! Which answer is correct is only revealed to the course owner.

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::features::enrollments::ledger;
use crate::features::shared::{lookup, require_account, AuthError};
use crate::models::{Answer, Question, Quiz};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetQuizQuery {
    pub caller_id: Uuid,
    pub quiz_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerView {
    pub id: Uuid,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionView {
    pub id: Uuid,
    pub text: String,
    pub order: i32,
    pub answers: Vec<AnswerView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizView {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, thiserror::Error)]
pub enum GetQuizError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Quiz '{0}' not found")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<QuizView, GetQuizError>> for GetQuizQuery {}

impl crate::cqrs::middleware::Query for GetQuizQuery {}

/// Group answers under their questions, keeping question order
pub fn assemble_questions(questions: Vec<Question>, answers: Vec<Answer>, reveal: bool) -> Vec<QuestionView> {
    let mut by_question: HashMap<Uuid, Vec<AnswerView>> = HashMap::new();
    for answer in answers {
        by_question.entry(answer.question_id).or_default().push(AnswerView {
            id: answer.id,
            text: answer.text,
            is_correct: reveal.then_some(answer.is_correct),
        });
    }

    questions
        .into_iter()
        .map(|q| QuestionView {
            answers: by_question.remove(&q.id).unwrap_or_default(),
            id: q.id,
            text: q.text,
            order: q.position,
        })
        .collect()
}

#[tracing::instrument(skip(pool), fields(caller_id = %query.caller_id, quiz_id = %query.quiz_id))]
pub async fn handle(pool: PgPool, query: GetQuizQuery) -> Result<QuizView, GetQuizError> {
    let caller = require_account(&pool, query.caller_id).await?;
    let quiz = lookup::find_quiz(&pool, query.quiz_id)
        .await?
        .ok_or(GetQuizError::NotFound(query.quiz_id))?;
    let course = lookup::find_quiz_course(&pool, quiz.id)
        .await?
        .ok_or(GetQuizError::NotFound(query.quiz_id))?;

    if !ledger::can_access_course(&pool, caller.id, &course).await? {
        return Err(AuthError::PermissionDenied.into());
    }

    let questions = sqlx::query_as::<_, Question>(
        "SELECT id, quiz_id, text, position FROM questions WHERE quiz_id = $1 ORDER BY position, id",
    )
    .bind(quiz.id)
    .fetch_all(&pool)
    .await?;

    let answers = sqlx::query_as::<_, Answer>(
        r#"
        SELECT a.id, a.question_id, a.text, a.is_correct
        FROM answers a
        JOIN questions q ON q.id = a.question_id
        WHERE q.quiz_id = $1
        ORDER BY a.id
        "#,
    )
    .bind(quiz.id)
    .fetch_all(&pool)
    .await?;

    let reveal = course.is_owned_by(caller.id);
    Ok(QuizView {
        quiz,
        questions: assemble_questions(questions, answers, reveal),
    })
}
