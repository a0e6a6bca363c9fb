use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::shared::validation::{
    validate_name, validate_optional_url, NameValidationError, UrlValidationError,
};
use crate::features::shared::{lookup, require_account, AuthError};
use crate::models::{Lesson, LessonType, LESSON_COLUMNS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLessonCommand {
    #[serde(skip)]
    pub caller_id: Uuid,

    #[serde(skip)]
    pub course_id: Uuid,

    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Display position; appended after the last lesson when omitted
    #[serde(default, rename = "order")]
    pub position: Option<i32>,
    #[serde(default)]
    pub lesson_type: LessonType,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub text_content: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateLessonError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Title: {0}")]
    TitleValidation(#[from] NameValidationError),

    #[error(transparent)]
    UrlValidation(#[from] UrlValidationError),

    #[error("Order cannot be negative")]
    NegativePosition,

    #[error("Course '{0}' not found")]
    CourseNotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<Lesson, CreateLessonError>> for CreateLessonCommand {}

impl crate::cqrs::middleware::Command for CreateLessonCommand {}

impl CreateLessonCommand {
    pub fn validate(&self) -> Result<(), CreateLessonError> {
        validate_name(&self.title, 200)?;
        validate_optional_url(self.video_url.as_deref(), "video")?;
        validate_optional_url(self.pdf_url.as_deref(), "pdf")?;
        if self.position.is_some_and(|p| p < 0) {
            return Err(CreateLessonError::NegativePosition);
        }
        Ok(())
    }
}

#[tracing::instrument(
    skip(pool, command),
    fields(caller_id = %command.caller_id, course_id = %command.course_id)
)]
pub async fn handle(pool: PgPool, command: CreateLessonCommand) -> Result<Lesson, CreateLessonError> {
    command.validate()?;

    let mut tx = pool.begin().await?;
    let caller = require_account(&mut *tx, command.caller_id).await?;
    let course = lookup::find_course(&mut *tx, command.course_id)
        .await?
        .ok_or(CreateLessonError::CourseNotFound(command.course_id))?;

    if !course.is_owned_by(caller.id) {
        return Err(AuthError::PermissionDenied.into());
    }

    let position = match command.position {
        Some(position) => position,
        None => {
            sqlx::query_scalar::<_, i32>(
                "SELECT COALESCE(MAX(position), 0) + 1 FROM lessons WHERE course_id = $1",
            )
            .bind(course.id)
            .fetch_one(&mut *tx)
            .await?
        },
    };

    let lesson = sqlx::query_as::<_, Lesson>(&format!(
        r#"
        INSERT INTO lessons (course_id, title, description, position, lesson_type,
                             video_url, pdf_url, text_content)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {}
        "#,
        LESSON_COLUMNS
    ))
    .bind(course.id)
    .bind(command.title.trim())
    .bind(&command.description)
    .bind(position)
    .bind(command.lesson_type)
    .bind(command.video_url.as_deref())
    .bind(command.pdf_url.as_deref())
    .bind(command.text_content.as_deref())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(lesson_id = %lesson.id, position, "Lesson created");
    Ok(lesson)
}
