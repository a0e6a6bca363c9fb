//! Quiz attempt routes
//!
//! - `POST /api/v1/quizzes/:id/attempts` - submit answers
//! - `GET /api/v1/quizzes/:id/attempts` - the caller's attempts

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use super::commands::{SubmitQuizCommand, SubmitQuizError};
use super::grading::AttemptDenied;
use super::queries::{ListAttemptsError, ListAttemptsQuery};
use crate::api::response::{ApiResponse, ErrorResponse};
use crate::features::shared::error_helpers::{auth_error_response, internal_error, not_found};
use crate::features::shared::Caller;
use crate::features::FeatureState;

pub fn quizzes_routes() -> Router<FeatureState> {
    Router::new().route("/quizzes/:id/attempts", get(list_attempts).post(submit_attempt))
}

/// # Request Body
///
/// ```json
/// { "answers": { "<question id>": "<answer id>" } }
/// ```
///
/// # Response
///
/// - `201 Created` - attempt recorded with its score
/// - `403 Forbidden` - not enrolled, or attempt limit reached
/// - `429 Too Many Requests` - retry cooldown still running
#[tracing::instrument(skip(state, command), fields(caller_id = %caller.0))]
async fn submit_attempt(
    State(state): State<FeatureState>,
    caller: Caller,
    Path(quiz_id): Path<Uuid>,
    Json(mut command): Json<SubmitQuizCommand>,
) -> Result<Response, QuizApiError> {
    command.caller_id = caller.0;
    command.quiz_id = quiz_id;

    let response = super::commands::submit::handle(state, command).await?;
    Ok(ApiResponse::success(response).created())
}

#[tracing::instrument(skip(state), fields(caller_id = %caller.0))]
async fn list_attempts(
    State(state): State<FeatureState>,
    caller: Caller,
    Path(quiz_id): Path<Uuid>,
) -> Result<Response, QuizApiError> {
    let query = ListAttemptsQuery {
        caller_id: caller.0,
        quiz_id,
    };
    let attempts = super::queries::list_attempts::handle(state.db, query).await?;
    Ok(ApiResponse::success(attempts).into_response())
}

#[derive(Debug)]
enum QuizApiError {
    Submit(SubmitQuizError),
    List(ListAttemptsError),
}

impl From<SubmitQuizError> for QuizApiError {
    fn from(err: SubmitQuizError) -> Self {
        Self::Submit(err)
    }
}

impl From<ListAttemptsError> for QuizApiError {
    fn from(err: ListAttemptsError) -> Self {
        Self::List(err)
    }
}

fn attempt_denied(denied: &AttemptDenied) -> Response {
    match denied {
        AttemptDenied::LimitReached { .. } => ErrorResponse::new("ATTEMPT_LIMIT", denied.to_string())
            .into_response_with(StatusCode::FORBIDDEN),
        AttemptDenied::CoolingDown { retry_after_secs } => {
            let mut response = ErrorResponse::new("RETRY_LATER", denied.to_string())
                .into_response_with(StatusCode::TOO_MANY_REQUESTS);
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(*retry_after_secs));
            response
        },
    }
}

impl IntoResponse for QuizApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Submit(SubmitQuizError::Auth(e)) | Self::List(ListAttemptsError::Auth(e)) => {
                auth_error_response(&e)
            },
            Self::Submit(SubmitQuizError::NotFound(_)) | Self::List(ListAttemptsError::NotFound(_)) => {
                not_found("Quiz not found")
            },
            Self::Submit(SubmitQuizError::AttemptDenied(denied)) => attempt_denied(&denied),
            Self::Submit(SubmitQuizError::Database(e)) | Self::List(ListAttemptsError::Database(e)) => {
                internal_error("Database error while handling quiz attempt", &e)
            },
        }
    }
}
