//! Certificate download
//!
//! Only the certificate's owner or an administrator may fetch the PDF;
//! everybody else gets the same answer as for an unknown id. A missing
//! artifact is regenerated on the way out.

use mediator::Request;
use uuid::Uuid;

use crate::features::certificates::issue::{ensure_artifact, load_course, IssueError, CERTIFICATE_COLUMNS};
use crate::features::shared::auth::find_account;
use crate::features::shared::{require_account, AuthError};
use crate::features::FeatureState;
use crate::models::Certificate;

#[derive(Debug, Clone)]
pub struct DownloadCertificateCommand {
    pub caller_id: Uuid,
    /// Raw path segment; malformed ids are treated as unknown
    pub certificate_id: String,
}

#[derive(Debug, Clone)]
pub struct CertificateFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadCertificateError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Certificate not found")]
    NotFound,

    #[error(transparent)]
    Issue(#[from] IssueError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<CertificateFile, DownloadCertificateError>> for DownloadCertificateCommand {}

impl crate::cqrs::middleware::Command for DownloadCertificateCommand {}

/// `Certificate_<course title>.pdf` with anything unsafe replaced
pub fn attachment_name(course_title: &str) -> String {
    let cleaned: String = course_title
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("Certificate_{}.pdf", cleaned)
}

#[tracing::instrument(skip(state, command), fields(caller_id = %command.caller_id))]
pub async fn handle(
    state: FeatureState,
    command: DownloadCertificateCommand,
) -> Result<CertificateFile, DownloadCertificateError> {
    let mut tx = state.db.begin().await?;
    let caller = require_account(&mut *tx, command.caller_id).await?;

    let id = Uuid::parse_str(command.certificate_id.trim())
        .map_err(|_| DownloadCertificateError::NotFound)?;

    let mut certificate = sqlx::query_as::<_, Certificate>(&format!(
        "SELECT {} FROM certificates WHERE id = $1",
        CERTIFICATE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(DownloadCertificateError::NotFound)?;

    if certificate.student_id != caller.id && !caller.is_admin {
        tracing::warn!(certificate_id = %id, "Certificate download refused");
        return Err(DownloadCertificateError::NotFound);
    }

    let student = find_account(&mut *tx, certificate.student_id)
        .await?
        .ok_or(DownloadCertificateError::NotFound)?;
    let course = load_course(&mut tx, certificate.course_id).await?;

    if ensure_artifact(&mut tx, &state, &mut certificate, &student, &course).await? {
        tracing::info!(certificate_id = %id, "Certificate artifact regenerated on download");
    }
    tx.commit().await?;

    let bytes = state
        .storage
        .read(&certificate.artifact_ref)
        .await
        .map_err(|e| IssueError::Storage(format!("{:#}", e)))?
        .ok_or_else(|| IssueError::Storage(format!("artifact '{}' vanished", certificate.artifact_ref)))?;

    Ok(CertificateFile {
        filename: attachment_name(&course.title),
        bytes,
    })
}
