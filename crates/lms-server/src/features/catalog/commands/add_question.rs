//! Add a question with its answer options to a quiz
//!
//! New questions must carry exactly one correct answer. Grading stays
//! tolerant of older data that breaks this rule.

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::shared::{lookup, require_account, AuthError};
use crate::models::{Answer, Question};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAnswer {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddQuestionCommand {
    #[serde(skip)]
    pub caller_id: Uuid,

    #[serde(skip)]
    pub quiz_id: Uuid,

    pub text: String,
    #[serde(default, rename = "order")]
    pub position: Option<i32>,
    pub answers: Vec<NewAnswer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionWithAnswers {
    #[serde(flatten)]
    pub question: Question,
    pub answers: Vec<Answer>,
}

#[derive(Debug, thiserror::Error)]
pub enum AddQuestionError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Question text is required")]
    TextRequired,

    #[error("A question needs at least two answers")]
    TooFewAnswers,

    #[error("Answer text is required")]
    AnswerTextRequired,

    #[error("Exactly one answer must be marked correct, found {0}")]
    CorrectAnswerCount(usize),

    #[error("Quiz '{0}' not found")]
    QuizNotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<QuestionWithAnswers, AddQuestionError>> for AddQuestionCommand {}

impl crate::cqrs::middleware::Command for AddQuestionCommand {}

impl AddQuestionCommand {
    pub fn validate(&self) -> Result<(), AddQuestionError> {
        if self.text.trim().is_empty() {
            return Err(AddQuestionError::TextRequired);
        }
        if self.answers.len() < 2 {
            return Err(AddQuestionError::TooFewAnswers);
        }
        if self.answers.iter().any(|a| a.text.trim().is_empty()) {
            return Err(AddQuestionError::AnswerTextRequired);
        }
        let correct = self.answers.iter().filter(|a| a.is_correct).count();
        if correct != 1 {
            return Err(AddQuestionError::CorrectAnswerCount(correct));
        }
        Ok(())
    }
}

#[tracing::instrument(
    skip(pool, command),
    fields(caller_id = %command.caller_id, quiz_id = %command.quiz_id)
)]
pub async fn handle(pool: PgPool, command: AddQuestionCommand) -> Result<QuestionWithAnswers, AddQuestionError> {
    command.validate()?;

    let mut tx = pool.begin().await?;
    let caller = require_account(&mut *tx, command.caller_id).await?;
    let course = lookup::find_quiz_course(&mut *tx, command.quiz_id)
        .await?
        .ok_or(AddQuestionError::QuizNotFound(command.quiz_id))?;

    if !course.is_owned_by(caller.id) {
        return Err(AuthError::PermissionDenied.into());
    }

    let position = match command.position {
        Some(position) => position,
        None => {
            sqlx::query_scalar::<_, i32>(
                "SELECT COALESCE(MAX(position), 0) + 1 FROM questions WHERE quiz_id = $1",
            )
            .bind(command.quiz_id)
            .fetch_one(&mut *tx)
            .await?
        },
    };

    let question = sqlx::query_as::<_, Question>(
        r#"
        INSERT INTO questions (quiz_id, text, position)
        VALUES ($1, $2, $3)
        RETURNING id, quiz_id, text, position
        "#,
    )
    .bind(command.quiz_id)
    .bind(command.text.trim())
    .bind(position)
    .fetch_one(&mut *tx)
    .await?;

    let texts: Vec<String> = command.answers.iter().map(|a| a.text.trim().to_string()).collect();
    let flags: Vec<bool> = command.answers.iter().map(|a| a.is_correct).collect();

    let answers = sqlx::query_as::<_, Answer>(
        r#"
        INSERT INTO answers (question_id, text, is_correct)
        SELECT $1, t.text, t.is_correct
        FROM UNNEST($2::text[], $3::bool[]) WITH ORDINALITY AS t(text, is_correct, n)
        ORDER BY t.n
        RETURNING id, question_id, text, is_correct
        "#,
    )
    .bind(question.id)
    .bind(&texts)
    .bind(&flags)
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(question_id = %question.id, answers = answers.len(), "Question added");
    Ok(QuestionWithAnswers { question, answers })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(text: &str, is_correct: bool) -> NewAnswer {
        NewAnswer {
            text: text.to_string(),
            is_correct,
        }
    }

    fn command(answers: Vec<NewAnswer>) -> AddQuestionCommand {
        AddQuestionCommand {
            caller_id: Uuid::new_v4(),
            quiz_id: Uuid::new_v4(),
            text: "Which keyword moves ownership into a closure?".to_string(),
            position: None,
            answers,
        }
    }

    #[test]
    fn test_exactly_one_correct_answer() {
        assert!(command(vec![answer("move", true), answer("ref", false)]).validate().is_ok());
        assert!(matches!(
            command(vec![answer("move", true), answer("ref", true)]).validate(),
            Err(AddQuestionError::CorrectAnswerCount(2))
        ));
        assert!(matches!(
            command(vec![answer("move", false), answer("ref", false)]).validate(),
            Err(AddQuestionError::CorrectAnswerCount(0))
        ));
    }

    #[test]
    fn test_answer_shape() {
        assert!(matches!(
            command(vec![answer("move", true)]).validate(),
            Err(AddQuestionError::TooFewAnswers)
        ));
        assert!(matches!(
            command(vec![answer("move", true), answer(" ", false)]).validate(),
            Err(AddQuestionError::AnswerTextRequired)
        ));
    }
}
