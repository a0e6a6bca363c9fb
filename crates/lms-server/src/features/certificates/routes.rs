//! Certificate routes
//!
//! - `GET /api/v1/certificates/verify?id=...` - public verification
//! - `GET /api/v1/certificates/:id/download` - PDF for the owner or an admin

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use super::commands::{DownloadCertificateCommand, DownloadCertificateError};
use super::queries::{VerifyCertificateError, VerifyCertificateQuery};
use crate::api::response::ApiResponse;
use crate::features::shared::error_helpers::{auth_error_response, internal_error, not_found};
use crate::features::shared::Caller;
use crate::features::FeatureState;

pub fn certificates_routes() -> Router<FeatureState> {
    Router::new()
        .route("/certificates/verify", get(verify_certificate))
        .route("/certificates/:id/download", get(download_certificate))
}

#[tracing::instrument(skip(state))]
async fn verify_certificate(
    State(state): State<FeatureState>,
    Query(query): Query<VerifyCertificateQuery>,
) -> Result<Response, CertificateApiError> {
    let response = super::queries::verify::handle(state.db, query).await?;
    Ok(ApiResponse::success(response).into_response())
}

#[tracing::instrument(skip(state), fields(caller_id = %caller.0))]
async fn download_certificate(
    State(state): State<FeatureState>,
    caller: Caller,
    Path(certificate_id): Path<String>,
) -> Result<Response, CertificateApiError> {
    let command = DownloadCertificateCommand {
        caller_id: caller.0,
        certificate_id,
    };
    let file = super::commands::download::handle(state, command).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.filename),
            ),
        ],
        file.bytes,
    )
        .into_response())
}

#[derive(Debug)]
enum CertificateApiError {
    Verify(VerifyCertificateError),
    Download(DownloadCertificateError),
}

impl From<VerifyCertificateError> for CertificateApiError {
    fn from(err: VerifyCertificateError) -> Self {
        Self::Verify(err)
    }
}

impl From<DownloadCertificateError> for CertificateApiError {
    fn from(err: DownloadCertificateError) -> Self {
        Self::Download(err)
    }
}

impl IntoResponse for CertificateApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Verify(VerifyCertificateError::Database(e)) => {
                internal_error("Database error while verifying certificate", &e)
            },
            Self::Download(DownloadCertificateError::Auth(e)) => auth_error_response(&e),
            Self::Download(DownloadCertificateError::NotFound) => not_found("Certificate not found"),
            Self::Download(DownloadCertificateError::Issue(e)) => {
                internal_error("Certificate artifact unavailable", &e)
            },
            Self::Download(DownloadCertificateError::Database(e)) => {
                internal_error("Database error while downloading certificate", &e)
            },
        }
    }
}
