//! Reactions to domain writes
//!
//! Write operations emit a [`DomainEvent`] and call [`dispatch`] on the same
//! connection, inside their transaction. Database reactions happen there and
//! then; outgoing mail is collected in [`Effects`] and sent with
//! [`Effects::flush`] only after the transaction commits.
//!
//! | Variant | Emitted when | Reaction |
//! |---------|--------------|----------|
//! | `AccountRegistered` | an account is created | profile row, activation email |
//! | `RoleChanged` | an admin changes a role | notice to the account |
//! | `CoursePublished` | a course goes from draft to published | notice to the instructor |
//! | `EnrollmentCreated` | a new enrollment row is written | welcome email |
//! | `LessonCompleted` | a progress flag becomes true | certificate when the course is complete |
//! | `AnnouncementCreated` | an instructor announces | notifications plus one BCC email |

use sqlx::PgConnection;
use thiserror::Error;
use uuid::Uuid;

use crate::features::certificates::issue::{self, load_course, IssueError};
use crate::features::communications::fan_out;
use crate::features::progress::completion;
use crate::features::shared::auth::find_account;
use crate::features::{FeatureState, Settings};
use crate::mail::{self, Mailer, OutgoingMail};
use crate::models::{Account, Announcement, Role};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    AccountRegistered {
        account_id: Uuid,
        /// Plain activation token; only its hash is stored
        activation_token: String,
    },
    RoleChanged {
        account_id: Uuid,
        role: Role,
    },
    CoursePublished {
        course_id: Uuid,
    },
    EnrollmentCreated {
        student_id: Uuid,
        course_id: Uuid,
    },
    LessonCompleted {
        student_id: Uuid,
        lesson_id: Uuid,
    },
    AnnouncementCreated {
        announcement_id: Uuid,
    },
}

impl DomainEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AccountRegistered { .. } => "account_registered",
            Self::RoleChanged { .. } => "role_changed",
            Self::CoursePublished { .. } => "course_published",
            Self::EnrollmentCreated { .. } => "enrollment_created",
            Self::LessonCompleted { .. } => "lesson_completed",
            Self::AnnouncementCreated { .. } => "announcement_created",
        }
    }
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Certificate issuance failed: {0}")]
    Certificate(#[from] IssueError),
}

/// Work left over after the transaction commits
#[derive(Debug, Default)]
pub struct Effects {
    pub mail: Vec<OutgoingMail>,
    /// Certificate issued or repaired by a `LessonCompleted` reaction
    pub certificate_id: Option<Uuid>,
    pub notifications_created: u64,
}

impl Effects {
    pub fn with_mail(mail: OutgoingMail) -> Self {
        Self {
            mail: vec![mail],
            ..Self::default()
        }
    }

    pub fn merge(&mut self, other: Effects) {
        self.mail.extend(other.mail);
        self.certificate_id = other.certificate_id.or(self.certificate_id);
        self.notifications_created += other.notifications_created;
    }

    /// Send the collected mail. Failures never propagate: by the time this
    /// runs the writes are committed.
    pub async fn flush(self, mailer: &dyn Mailer) {
        for message in self.mail {
            let subject = message.subject.clone();
            if let Err(e) = mail::deliver(mailer, message).await {
                tracing::error!(subject = %subject, error = %e, "Failed to send event email");
            }
        }
    }
}

/// Run the reactions for `event` on the caller's connection
#[tracing::instrument(skip(conn, state, event), fields(event = event.kind()))]
pub async fn dispatch(
    conn: &mut PgConnection,
    state: &FeatureState,
    event: DomainEvent,
) -> Result<Effects, EventError> {
    let settings = state.settings.as_ref();

    let effects = match event {
        DomainEvent::AccountRegistered {
            account_id,
            activation_token,
        } => {
            sqlx::query("INSERT INTO profiles (account_id) VALUES ($1) ON CONFLICT DO NOTHING")
                .bind(account_id)
                .execute(&mut *conn)
                .await?;
            let account = load_account(conn, account_id).await?;
            Effects::with_mail(activation_mail(settings, &account, &activation_token))
        },
        DomainEvent::RoleChanged { account_id, role } => {
            let account = load_account(conn, account_id).await?;
            Effects::with_mail(role_changed_mail(settings, &account, role))
        },
        DomainEvent::CoursePublished { course_id } => {
            let course = load_course(conn, course_id).await?;
            let instructor = load_account(conn, course.instructor_id).await?;
            Effects::with_mail(
                OutgoingMail::new(
                    settings.from_email.clone(),
                    format!("Course Published: {}", course.title),
                    format!("Congratulations! Your course '{}' is now live on ApiLearn.", course.title),
                )
                .to(instructor.email)
                .fail_silently(),
            )
        },
        DomainEvent::EnrollmentCreated {
            student_id,
            course_id,
        } => {
            let course = load_course(conn, course_id).await?;
            let student = load_account(conn, student_id).await?;
            Effects::with_mail(
                OutgoingMail::new(
                    settings.from_email.clone(),
                    format!("Enrollment Confirmed: {}", course.title),
                    format!(
                        "Hi {},\n\nYou have successfully enrolled in {}.\nHappy Learning!",
                        student.username, course.title
                    ),
                )
                .to(student.email)
                .fail_silently(),
            )
        },
        DomainEvent::LessonCompleted {
            student_id,
            lesson_id,
        } => on_lesson_completed(conn, state, student_id, lesson_id).await?,
        DomainEvent::AnnouncementCreated { announcement_id } => {
            on_announcement_created(conn, settings, announcement_id).await?
        },
    };

    Ok(effects)
}

async fn load_account(conn: &mut PgConnection, id: Uuid) -> Result<Account, sqlx::Error> {
    find_account(&mut *conn, id).await?.ok_or(sqlx::Error::RowNotFound)
}

async fn on_lesson_completed(
    conn: &mut PgConnection,
    state: &FeatureState,
    student_id: Uuid,
    lesson_id: Uuid,
) -> Result<Effects, EventError> {
    let course_id: Uuid = sqlx::query_scalar("SELECT course_id FROM lessons WHERE id = $1")
        .bind(lesson_id)
        .fetch_one(&mut *conn)
        .await?;

    let snapshot = completion::snapshot(conn, student_id, course_id).await?;
    tracing::debug!(
        completed = snapshot.completed,
        total = snapshot.total,
        "Course completion recomputed"
    );

    if !snapshot.is_complete() {
        return Ok(Effects::default());
    }

    let outcome = issue::issue(conn, state, student_id, course_id).await?;
    Ok(Effects {
        mail: outcome.mail.into_iter().collect(),
        certificate_id: Some(outcome.certificate.id),
        notifications_created: 0,
    })
}

async fn on_announcement_created(
    conn: &mut PgConnection,
    settings: &Settings,
    announcement_id: Uuid,
) -> Result<Effects, EventError> {
    let announcement = sqlx::query_as::<_, Announcement>(
        "SELECT id, course_id, instructor_id, title, content, created_at FROM announcements WHERE id = $1",
    )
    .bind(announcement_id)
    .fetch_one(&mut *conn)
    .await?;

    let course = load_course(conn, announcement.course_id).await?;
    let instructor = load_account(conn, announcement.instructor_id).await?;
    let recipients = fan_out::enrolled_recipients(conn, course.id).await?;

    let plan = fan_out::plan_fan_out(
        &announcement,
        &course,
        &instructor.username,
        &recipients,
        &settings.from_email,
    );
    let created = fan_out::insert_notifications(conn, &plan.notifications).await?;
    tracing::info!(notifications = created, "Announcement fanned out");

    Ok(Effects {
        mail: plan.mail.into_iter().collect(),
        certificate_id: None,
        notifications_created: created,
    })
}

pub fn activation_path(account_id: Uuid, token: &str) -> String {
    format!("/api/v1/accounts/activate?account_id={}&token={}", account_id, token)
}

fn activation_mail(settings: &Settings, account: &Account, token: &str) -> OutgoingMail {
    OutgoingMail::new(
        settings.from_email.clone(),
        "Activate your ApiLearn account",
        format!(
            "Hi {},\n\nWelcome to ApiLearn! Confirm your email address to activate your account:\n{}\n\nRegards,\nApiLearn Team",
            account.username,
            settings.url(&activation_path(account.id, token))
        ),
    )
    .to(account.email.clone())
    .fail_silently()
}

fn role_changed_mail(settings: &Settings, account: &Account, role: Role) -> OutgoingMail {
    OutgoingMail::new(
        settings.from_email.clone(),
        "Role Update Notification",
        format!(
            "Hello {},\n\nYour account role has been updated to: {}.\n\nRegards,\nApiLearn Team",
            account.username,
            role.label()
        ),
    )
    .to(account.email.clone())
    .fail_silently()
}
