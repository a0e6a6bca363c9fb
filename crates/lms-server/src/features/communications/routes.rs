//! Announcements and the notification inbox
//!
//! - `POST /api/v1/courses/:id/announcements` - announce to enrolled students
//! - `GET /api/v1/notifications` - the caller's inbox
//! - `POST /api/v1/notifications/:id/read` - mark one read
//! - `POST /api/v1/notifications/read-all` - mark all read

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use super::commands::{
    CreateAnnouncementCommand, CreateAnnouncementError, MarkAllReadCommand, MarkReadCommand, MarkReadError,
};
use super::queries::{InboxError, InboxQuery};
use crate::api::response::ApiResponse;
use crate::features::shared::error_helpers::{auth_error_response, internal_error, not_found, validation_error};
use crate::features::shared::Caller;
use crate::features::FeatureState;

pub fn communications_routes() -> Router<FeatureState> {
    Router::new()
        .route("/courses/:id/announcements", post(create_announcement))
        .route("/notifications", get(inbox))
        .route("/notifications/read-all", post(mark_all_read))
        .route("/notifications/:id/read", post(mark_read))
}

#[tracing::instrument(skip(state, command), fields(caller_id = %caller.0))]
async fn create_announcement(
    State(state): State<FeatureState>,
    caller: Caller,
    Path(course_id): Path<Uuid>,
    Json(mut command): Json<CreateAnnouncementCommand>,
) -> Result<Response, CommunicationsApiError> {
    command.caller_id = caller.0;
    command.course_id = course_id;

    let response = super::commands::announce::handle(state, command).await?;
    Ok(ApiResponse::success(response).created())
}

#[tracing::instrument(skip(state, query), fields(caller_id = %caller.0))]
async fn inbox(
    State(state): State<FeatureState>,
    caller: Caller,
    Query(mut query): Query<InboxQuery>,
) -> Result<Response, CommunicationsApiError> {
    query.caller_id = caller.0;

    let response = super::queries::inbox::handle(state.db, query).await?;
    let meta = json!({
        "pagination": response.pagination,
        "unread": response.unread,
    });
    Ok(ApiResponse::success_with_meta(response.items, meta).into_response())
}

#[tracing::instrument(skip(state), fields(caller_id = %caller.0))]
async fn mark_read(
    State(state): State<FeatureState>,
    caller: Caller,
    Path(notification_id): Path<Uuid>,
) -> Result<Response, CommunicationsApiError> {
    let command = MarkReadCommand {
        caller_id: caller.0,
        notification_id,
    };
    let response = super::commands::mark_read::handle(state.db, command).await?;
    Ok(ApiResponse::success(response).into_response())
}

#[tracing::instrument(skip(state), fields(caller_id = %caller.0))]
async fn mark_all_read(
    State(state): State<FeatureState>,
    caller: Caller,
) -> Result<Response, CommunicationsApiError> {
    let command = MarkAllReadCommand { caller_id: caller.0 };
    let response = super::commands::mark_read::handle_all(state.db, command).await?;
    Ok(ApiResponse::success(response).into_response())
}

#[derive(Debug)]
enum CommunicationsApiError {
    Announce(CreateAnnouncementError),
    MarkRead(MarkReadError),
    Inbox(InboxError),
}

impl From<CreateAnnouncementError> for CommunicationsApiError {
    fn from(err: CreateAnnouncementError) -> Self {
        Self::Announce(err)
    }
}

impl From<MarkReadError> for CommunicationsApiError {
    fn from(err: MarkReadError) -> Self {
        Self::MarkRead(err)
    }
}

impl From<InboxError> for CommunicationsApiError {
    fn from(err: InboxError) -> Self {
        Self::Inbox(err)
    }
}

impl IntoResponse for CommunicationsApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Announce(CreateAnnouncementError::Auth(e))
            | Self::MarkRead(MarkReadError::Auth(e))
            | Self::Inbox(InboxError::Auth(e)) => auth_error_response(&e),

            Self::Announce(
                e @ (CreateAnnouncementError::TitleRequired
                | CreateAnnouncementError::TitleLength
                | CreateAnnouncementError::ContentRequired),
            ) => validation_error(e.to_string()),
            Self::Announce(CreateAnnouncementError::CourseNotFound(_)) => not_found("Course not found"),
            Self::Announce(CreateAnnouncementError::Event(e)) => {
                internal_error("Announcement fan-out failed", &e)
            },
            Self::Announce(CreateAnnouncementError::Database(e))
            | Self::MarkRead(MarkReadError::Database(e))
            | Self::Inbox(InboxError::Database(e)) => internal_error("Database error in communications", &e),

            Self::MarkRead(MarkReadError::NotFound(_)) => not_found("Notification not found"),
        }
    }
}
