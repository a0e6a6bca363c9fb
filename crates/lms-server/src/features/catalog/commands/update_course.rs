//! Update a course
//!
//! Only the owner may edit. Publishing (an unpublished course switching to
//! published) emits `CoursePublished` inside the same transaction; the notice
//! to the instructor goes out after commit.

use bigdecimal::{BigDecimal, RoundingMode};
use lms_common::money::validate_price;
use lms_common::LmsError;
use mediator::Request;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::events::{self, DomainEvent, EventError};
use crate::features::shared::validation::{validate_name, NameValidationError};
use crate::features::shared::{require_account, AuthError};
use crate::features::FeatureState;
use crate::models::{Course, COURSE_COLUMNS};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCourseCommand {
    #[serde(skip)]
    pub caller_id: Uuid,

    #[serde(skip)]
    pub course_id: Uuid,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<BigDecimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
}

#[derive(Debug, thiserror::Error)]
pub enum UpdateCourseError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("At least one field must be provided for update")]
    NoFieldsToUpdate,

    #[error("Title: {0}")]
    TitleValidation(#[from] NameValidationError),

    #[error(transparent)]
    Price(#[from] LmsError),

    #[error("Course '{0}' not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<Course, UpdateCourseError>> for UpdateCourseCommand {}

impl crate::cqrs::middleware::Command for UpdateCourseCommand {}

impl UpdateCourseCommand {
    pub fn validate(&self) -> Result<(), UpdateCourseError> {
        if self.title.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.category_id.is_none()
            && self.is_published.is_none()
        {
            return Err(UpdateCourseError::NoFieldsToUpdate);
        }
        if let Some(title) = &self.title {
            validate_name(title, 200)?;
        }
        if let Some(price) = &self.price {
            validate_price(price)?;
        }
        Ok(())
    }
}

/// True when this update takes the course live
pub fn is_publish_transition(was_published: bool, requested: Option<bool>) -> bool {
    !was_published && requested == Some(true)
}

#[tracing::instrument(
    skip(state, command),
    fields(caller_id = %command.caller_id, course_id = %command.course_id)
)]
pub async fn handle(state: FeatureState, command: UpdateCourseCommand) -> Result<Course, UpdateCourseError> {
    command.validate()?;

    let mut tx = state.db.begin().await?;
    let caller = require_account(&mut *tx, command.caller_id).await?;

    let current = sqlx::query_as::<_, Course>(&format!(
        "SELECT {} FROM courses WHERE id = $1 FOR UPDATE",
        COURSE_COLUMNS
    ))
    .bind(command.course_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(UpdateCourseError::NotFound(command.course_id))?;

    if !current.is_owned_by(caller.id) {
        return Err(AuthError::PermissionDenied.into());
    }

    let price = command
        .price
        .as_ref()
        .map(|p| p.with_scale_round(2, RoundingMode::HalfUp));

    let course = sqlx::query_as::<_, Course>(&format!(
        r#"
        UPDATE courses
        SET title = COALESCE($2, title),
            description = COALESCE($3, description),
            price = COALESCE($4, price),
            category_id = COALESCE($5, category_id),
            is_published = COALESCE($6, is_published),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        COURSE_COLUMNS
    ))
    .bind(current.id)
    .bind(command.title.as_deref().map(str::trim))
    .bind(command.description.as_deref())
    .bind(price)
    .bind(command.category_id)
    .bind(command.is_published)
    .fetch_one(&mut *tx)
    .await?;

    let effects = if is_publish_transition(current.is_published, command.is_published) {
        events::dispatch(&mut tx, &state, DomainEvent::CoursePublished { course_id: course.id }).await?
    } else {
        events::Effects::default()
    };

    tx.commit().await?;

    tracing::info!(course_id = %course.id, published = course.is_published, "Course updated");
    effects.flush(state.mailer.as_ref()).await;

    Ok(course)
}
