//! Public certificate verification
//!
//! Anyone holding a certificate id can confirm it is genuine. Missing,
//! malformed and unknown ids all answer `found: false`.

use chrono::{DateTime, Utc};
use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyCertificateQuery {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct VerifiedCertificate {
    pub id: Uuid,
    pub student_name: String,
    pub course_title: String,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyCertificateResponse {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<VerifiedCertificate>,
}

impl VerifyCertificateResponse {
    fn not_found() -> Self {
        Self {
            found: false,
            certificate: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyCertificateError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<VerifyCertificateResponse, VerifyCertificateError>> for VerifyCertificateQuery {}

impl crate::cqrs::middleware::Query for VerifyCertificateQuery {}

/// Trimmed, non-empty, well-formed id
pub fn parse_certificate_id(raw: Option<&str>) -> Option<Uuid> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }
    Uuid::parse_str(trimmed).ok()
}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    query: VerifyCertificateQuery,
) -> Result<VerifyCertificateResponse, VerifyCertificateError> {
    let Some(id) = parse_certificate_id(query.id.as_deref()) else {
        return Ok(VerifyCertificateResponse::not_found());
    };

    let certificate = sqlx::query_as::<_, VerifiedCertificate>(
        r#"
        SELECT c.id,
               COALESCE(NULLIF(TRIM(a.full_name), ''), a.username) AS student_name,
               co.title AS course_title,
               c.issued_at
        FROM certificates c
        JOIN accounts a ON a.id = c.student_id
        JOIN courses co ON co.id = c.course_id
        WHERE c.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?;

    Ok(match certificate {
        Some(certificate) => VerifyCertificateResponse {
            found: true,
            certificate: Some(certificate),
        },
        None => VerifyCertificateResponse::not_found(),
    })
}
