//! Create a course announcement
//!
//! The announcement and its notifications commit together; the blind-copy
//! email goes out afterwards and its failure is only logged.

use mediator::Request;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::events::{self, DomainEvent, EventError};
use crate::features::shared::{lookup, require_account, AuthError};
use crate::features::FeatureState;
use crate::models::Announcement;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAnnouncementCommand {
    #[serde(skip)]
    pub caller_id: Uuid,

    #[serde(skip)]
    pub course_id: Uuid,

    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateAnnouncementResponse {
    #[serde(flatten)]
    pub announcement: Announcement,
    pub notified_students: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateAnnouncementError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Course '{0}' not found")]
    CourseNotFound(Uuid),

    #[error("Title is required")]
    TitleRequired,

    #[error("Title must be at most 200 characters")]
    TitleLength,

    #[error("Content is required")]
    ContentRequired,

    #[error(transparent)]
    Event(#[from] EventError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<CreateAnnouncementResponse, CreateAnnouncementError>> for CreateAnnouncementCommand {}

impl crate::cqrs::middleware::Command for CreateAnnouncementCommand {}

impl CreateAnnouncementCommand {
    pub fn validate(&self) -> Result<(), CreateAnnouncementError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(CreateAnnouncementError::TitleRequired);
        }
        if title.chars().count() > 200 {
            return Err(CreateAnnouncementError::TitleLength);
        }
        if self.content.trim().is_empty() {
            return Err(CreateAnnouncementError::ContentRequired);
        }
        Ok(())
    }
}

#[tracing::instrument(
    skip(state, command),
    fields(caller_id = %command.caller_id, course_id = %command.course_id)
)]
pub async fn handle(
    state: FeatureState,
    command: CreateAnnouncementCommand,
) -> Result<CreateAnnouncementResponse, CreateAnnouncementError> {
    command.validate()?;

    let mut tx = state.db.begin().await?;
    let caller = require_account(&mut *tx, command.caller_id).await?;
    let course = lookup::find_course(&mut *tx, command.course_id)
        .await?
        .ok_or(CreateAnnouncementError::CourseNotFound(command.course_id))?;

    if !course.is_owned_by(caller.id) {
        return Err(AuthError::PermissionDenied.into());
    }

    let announcement = sqlx::query_as::<_, Announcement>(
        r#"
        INSERT INTO announcements (course_id, instructor_id, title, content)
        VALUES ($1, $2, $3, $4)
        RETURNING id, course_id, instructor_id, title, content, created_at
        "#,
    )
    .bind(course.id)
    .bind(caller.id)
    .bind(command.title.trim())
    .bind(&command.content)
    .fetch_one(&mut *tx)
    .await?;

    let effects = events::dispatch(
        &mut tx,
        &state,
        DomainEvent::AnnouncementCreated {
            announcement_id: announcement.id,
        },
    )
    .await?;

    tx.commit().await?;

    let notified_students = effects.notifications_created;
    tracing::info!(announcement_id = %announcement.id, notified_students, "Announcement created");
    effects.flush(state.mailer.as_ref()).await;

    Ok(CreateAnnouncementResponse {
        announcement,
        notified_students,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{enroll, test_state, TestAccount, TestCourse};
    use crate::models::Role;
    use sqlx::PgPool;

    fn command(title: &str, content: &str) -> CreateAnnouncementCommand {
        CreateAnnouncementCommand {
            caller_id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            title: title.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_validation() {
        assert!(command("Week 2", "Read chapter 4").validate().is_ok());
        assert!(matches!(
            command("  ", "x").validate(),
            Err(CreateAnnouncementError::TitleRequired)
        ));
        assert!(matches!(
            command(&"t".repeat(201), "x").validate(),
            Err(CreateAnnouncementError::TitleLength)
        ));
        assert!(matches!(
            command("Week 2", "").validate(),
            Err(CreateAnnouncementError::ContentRequired)
        ));
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore] // Requires database
    async fn test_three_students_three_notifications_one_mail(pool: PgPool) -> sqlx::Result<()> {
        let (state, mailer) = test_state(pool.clone());
        let instructor = TestAccount::new("prof").role(Role::Instructor).create(&pool).await?;
        let course = TestCourse::new(instructor.id).create(&pool).await?;
        for name in ["ann", "bob", "cyd"] {
            let student = TestAccount::new(name).create(&pool).await?;
            enroll(&pool, student.id, course.id).await?;
        }

        let response = handle(
            state,
            CreateAnnouncementCommand {
                caller_id: instructor.id,
                course_id: course.id,
                title: "Exam moved".to_string(),
                content: "Friday instead".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(response.notified_students, 3);

        let notifications: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notifications")
            .fetch_one(&pool)
            .await?;
        assert_eq!(notifications, 3);

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].bcc.len(), 3);
        assert!(sent[0].to.is_empty());
        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore] // Requires database
    async fn test_mail_failure_keeps_announcement(pool: PgPool) -> sqlx::Result<()> {
        let (mut state, _) = test_state(pool.clone());
        state.mailer = std::sync::Arc::new(crate::mail::MemoryMailer::failing());
        let instructor = TestAccount::new("prof").role(Role::Instructor).create(&pool).await?;
        let student = TestAccount::new("stu").create(&pool).await?;
        let course = TestCourse::new(instructor.id).create(&pool).await?;
        enroll(&pool, student.id, course.id).await?;

        let result = handle(
            state,
            CreateAnnouncementCommand {
                caller_id: instructor.id,
                course_id: course.id,
                title: "Hello".to_string(),
                content: "Welcome".to_string(),
            },
        )
        .await;
        assert!(result.is_ok());

        let announcements: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM announcements")
            .fetch_one(&pool)
            .await?;
        assert_eq!(announcements, 1);
        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore] // Requires database
    async fn test_only_owner_may_announce(pool: PgPool) -> sqlx::Result<()> {
        let (state, _) = test_state(pool.clone());
        let owner = TestAccount::new("prof").role(Role::Instructor).create(&pool).await?;
        let other = TestAccount::new("rival").role(Role::Instructor).create(&pool).await?;
        let course = TestCourse::new(owner.id).create(&pool).await?;

        let result = handle(
            state,
            CreateAnnouncementCommand {
                caller_id: other.id,
                course_id: course.id,
                title: "Hi".to_string(),
                content: "x".to_string(),
            },
        )
        .await;
        assert!(matches!(result, Err(CreateAnnouncementError::Auth(AuthError::PermissionDenied))));
        Ok(())
    }
}
