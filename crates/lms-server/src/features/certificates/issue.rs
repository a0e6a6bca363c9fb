//! Certificate issuance
//!
//! A certificate row is created at most once per (student, course). The PDF
//! artifact is (re)generated whenever the row is new or its artifact has gone
//! missing, and only then is the student emailed.

use sqlx::PgConnection;
use thiserror::Error;
use uuid::Uuid;

use super::render::{render_certificate, CertificateDocument, RenderError};
use crate::features::shared::auth::find_account;
use crate::features::{FeatureState, Settings};
use crate::mail::OutgoingMail;
use crate::models::{Account, Certificate, Course, COURSE_COLUMNS};

pub(crate) const CERTIFICATE_COLUMNS: &str = "id, student_id, course_id, issued_at, artifact_ref";

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Artifact storage failed: {0}")]
    Storage(String),
}

/// Result of an issuance run
#[derive(Debug)]
pub struct IssueOutcome {
    pub certificate: Certificate,
    pub created: bool,
    pub regenerated: bool,
    /// Notice for the student, present only when the artifact was generated
    pub mail: Option<OutgoingMail>,
}

/// Storage key for a certificate's PDF
pub fn artifact_key(certificate_id: Uuid) -> String {
    format!("certificates/cert_{}.pdf", certificate_id)
}

pub fn download_path(certificate_id: Uuid) -> String {
    format!("/api/v1/certificates/{}/download", certificate_id)
}

pub(crate) async fn load_course(conn: &mut PgConnection, course_id: Uuid) -> Result<Course, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!("SELECT {} FROM courses WHERE id = $1", COURSE_COLUMNS))
        .bind(course_id)
        .fetch_one(&mut *conn)
        .await
}

async fn get_or_create(
    conn: &mut PgConnection,
    student_id: Uuid,
    course_id: Uuid,
) -> Result<(Certificate, bool), sqlx::Error> {
    let inserted = sqlx::query_as::<_, Certificate>(&format!(
        r#"
        INSERT INTO certificates (student_id, course_id)
        VALUES ($1, $2)
        ON CONFLICT (student_id, course_id) DO NOTHING
        RETURNING {}
        "#,
        CERTIFICATE_COLUMNS
    ))
    .bind(student_id)
    .bind(course_id)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(certificate) = inserted {
        return Ok((certificate, true));
    }

    let existing = sqlx::query_as::<_, Certificate>(&format!(
        "SELECT {} FROM certificates WHERE student_id = $1 AND course_id = $2",
        CERTIFICATE_COLUMNS
    ))
    .bind(student_id)
    .bind(course_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok((existing, false))
}

/// Make sure the certificate's PDF exists in the artifact store, rendering
/// and storing it when the reference is empty or dangling. Returns whether a
/// new artifact was written.
pub async fn ensure_artifact(
    conn: &mut PgConnection,
    state: &FeatureState,
    certificate: &mut Certificate,
    student: &Account,
    course: &Course,
) -> Result<bool, IssueError> {
    let present = !certificate.artifact_ref.is_empty()
        && state
            .storage
            .exists(&certificate.artifact_ref)
            .await
            .map_err(|e| IssueError::Storage(format!("{:#}", e)))?;

    if present {
        return Ok(false);
    }

    let document = CertificateDocument {
        id: certificate.id,
        student_name: student.display_name().to_string(),
        course_title: course.title.clone(),
        issued_at: certificate.issued_at,
        verify_url: state.settings.url("/api/v1/certificates/verify"),
    };
    let bytes = render_certificate(&document)?;

    let artifact_ref = state
        .storage
        .write(&artifact_key(certificate.id), bytes, "application/pdf")
        .await
        .map_err(|e| IssueError::Storage(format!("{:#}", e)))?;

    sqlx::query("UPDATE certificates SET artifact_ref = $2 WHERE id = $1")
        .bind(certificate.id)
        .bind(&artifact_ref)
        .execute(&mut *conn)
        .await?;

    tracing::info!(certificate_id = %certificate.id, artifact = %artifact_ref, "Certificate artifact stored");
    certificate.artifact_ref = artifact_ref;
    Ok(true)
}

pub fn certificate_mail(
    settings: &Settings,
    student: &Account,
    course: &Course,
    certificate: &Certificate,
) -> OutgoingMail {
    let body = format!(
        "Well done, {}!\n\nYour official certificate is ready.\nDownload here: {}",
        student.username,
        settings.url(&download_path(certificate.id))
    );
    OutgoingMail::new(
        settings.from_email.clone(),
        format!("You earned a certificate for {}!", course.title),
        body,
    )
    .to(student.email.clone())
    .fail_silently()
}

/// Issue (or repair) the certificate for a student who completed a course
#[tracing::instrument(skip(conn, state))]
pub async fn issue(
    conn: &mut PgConnection,
    state: &FeatureState,
    student_id: Uuid,
    course_id: Uuid,
) -> Result<IssueOutcome, IssueError> {
    let (mut certificate, created) = get_or_create(conn, student_id, course_id).await?;

    let student = find_account(&mut *conn, student_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;
    let course = load_course(conn, course_id).await?;

    let regenerated = ensure_artifact(conn, state, &mut certificate, &student, &course).await?;

    let mail = regenerated.then(|| certificate_mail(&state.settings, &student, &course, &certificate));

    if created {
        tracing::info!(certificate_id = %certificate.id, "Certificate issued");
    }

    Ok(IssueOutcome {
        certificate,
        created,
        regenerated,
        mail,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::quizzes::grading::AttemptPolicy;
    use crate::models::Role;
    use chrono::Utc;

    fn settings() -> Settings {
        Settings {
            public_base_url: "https://apilearn.com".to_string(),
            from_email: "no-reply@apilearn.com".to_string(),
            attempt_policy: AttemptPolicy::unlimited(),
        }
    }

    #[test]
    fn test_artifact_key() {
        let id = Uuid::nil();
        assert_eq!(
            artifact_key(id),
            "certificates/cert_00000000-0000-0000-0000-000000000000.pdf"
        );
    }

    #[test]
    fn test_certificate_mail_links_download() {
        let student = Account {
            id: Uuid::new_v4(),
            email: "ada@example.com".to_string(),
            username: "ada".to_string(),
            full_name: String::new(),
            role: Role::Student,
            is_admin: false,
            is_active: true,
            created_at: Utc::now(),
        };
        let course = Course {
            id: Uuid::new_v4(),
            instructor_id: Uuid::new_v4(),
            category_id: None,
            title: "Rust 101".to_string(),
            description: String::new(),
            price: Default::default(),
            is_published: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let certificate = Certificate {
            id: Uuid::new_v4(),
            student_id: student.id,
            course_id: course.id,
            issued_at: Utc::now(),
            artifact_ref: String::new(),
        };

        let mail = certificate_mail(&settings(), &student, &course, &certificate);
        assert_eq!(mail.subject, "You earned a certificate for Rust 101!");
        assert_eq!(mail.to, vec!["ada@example.com".to_string()]);
        assert!(mail.fail_silently);
        assert!(mail.body.starts_with("Well done, ada!"));
        assert!(mail.body.contains(&format!(
            "https://apilearn.com/api/v1/certificates/{}/download",
            certificate.id
        )));
    }
}
