//! Progress API routes
//!
//! - `POST /api/v1/lessons/:id/toggle` - flip the caller's completion flag
//! - `POST /api/v1/lessons/:id/complete` - mark a lesson complete
//! - `GET /api/v1/courses/:id/progress` - completion summary for a course

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use super::commands::{
    MarkLessonCompleteCommand, MarkLessonCompleteError, ToggleLessonCommand, ToggleLessonError,
};
use super::queries::{CourseProgressError, CourseProgressQuery};
use crate::api::response::ApiResponse;
use crate::events::EventError;
use crate::features::shared::error_helpers::{auth_error_response, internal_error, not_found};
use crate::features::shared::Caller;
use crate::features::FeatureState;

pub fn progress_routes() -> Router<FeatureState> {
    Router::new()
        .route("/lessons/:id/toggle", post(toggle_lesson))
        .route("/lessons/:id/complete", post(complete_lesson))
        .route("/courses/:id/progress", get(course_progress))
}

#[tracing::instrument(skip(state), fields(caller_id = %caller.0))]
async fn toggle_lesson(
    State(state): State<FeatureState>,
    caller: Caller,
    Path(lesson_id): Path<Uuid>,
) -> Result<Response, ProgressApiError> {
    let command = ToggleLessonCommand {
        caller_id: caller.0,
        lesson_id,
    };
    let response = super::commands::toggle::handle(state, command).await?;
    Ok(ApiResponse::success(response).into_response())
}

#[tracing::instrument(skip(state), fields(caller_id = %caller.0))]
async fn complete_lesson(
    State(state): State<FeatureState>,
    caller: Caller,
    Path(lesson_id): Path<Uuid>,
) -> Result<Response, ProgressApiError> {
    let command = MarkLessonCompleteCommand {
        caller_id: caller.0,
        lesson_id,
    };
    let response = super::commands::complete::handle(state, command).await?;
    Ok(ApiResponse::success(response).into_response())
}

#[tracing::instrument(skip(state), fields(caller_id = %caller.0))]
async fn course_progress(
    State(state): State<FeatureState>,
    caller: Caller,
    Path(course_id): Path<Uuid>,
) -> Result<Response, ProgressApiError> {
    let query = CourseProgressQuery {
        caller_id: caller.0,
        course_id,
    };
    let response = super::queries::course_progress::handle(state.db, query).await?;
    Ok(ApiResponse::success(response).into_response())
}

#[derive(Debug)]
enum ProgressApiError {
    Toggle(ToggleLessonError),
    Complete(MarkLessonCompleteError),
    Progress(CourseProgressError),
}

impl From<ToggleLessonError> for ProgressApiError {
    fn from(err: ToggleLessonError) -> Self {
        Self::Toggle(err)
    }
}

impl From<MarkLessonCompleteError> for ProgressApiError {
    fn from(err: MarkLessonCompleteError) -> Self {
        Self::Complete(err)
    }
}

impl From<CourseProgressError> for ProgressApiError {
    fn from(err: CourseProgressError) -> Self {
        Self::Progress(err)
    }
}

fn event_error(err: &EventError) -> Response {
    internal_error("Completion pipeline failed", err)
}

impl IntoResponse for ProgressApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Toggle(ToggleLessonError::Auth(e)) | Self::Complete(MarkLessonCompleteError::Auth(e)) => {
                auth_error_response(&e)
            },
            Self::Toggle(ToggleLessonError::NotFound(_))
            | Self::Complete(MarkLessonCompleteError::NotFound(_)) => not_found("Lesson not found"),
            Self::Toggle(ToggleLessonError::Event(e)) | Self::Complete(MarkLessonCompleteError::Event(e)) => {
                event_error(&e)
            },
            Self::Toggle(ToggleLessonError::Database(e))
            | Self::Complete(MarkLessonCompleteError::Database(e)) => {
                internal_error("Database error while updating progress", &e)
            },

            Self::Progress(CourseProgressError::Auth(e)) => auth_error_response(&e),
            Self::Progress(CourseProgressError::NotFound(_)) => not_found("Course not found"),
            Self::Progress(CourseProgressError::Database(e)) => {
                internal_error("Database error while reading progress", &e)
            },
        }
    }
}
