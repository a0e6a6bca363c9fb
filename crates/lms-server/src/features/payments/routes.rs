//! Enrollment checkout and payment verification
//!
//! - `POST /api/v1/courses/:id/enroll` - enroll, or start a checkout for paid courses
//! - `GET /api/v1/payments/verify?reference=...` - gateway callback target

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use super::commands::{
    EnrollInCourseCommand, EnrollInCourseError, EnrollOutcome, VerifyPaymentCommand, VerifyPaymentError,
};
use crate::api::response::{ApiResponse, ErrorResponse};
use crate::features::shared::error_helpers::{auth_error_response, internal_error, not_found};
use crate::features::shared::Caller;
use crate::features::FeatureState;

pub fn payments_routes() -> Router<FeatureState> {
    Router::new()
        .route("/courses/:id/enroll", post(enroll_in_course))
        .route("/payments/verify", get(verify_payment))
}

/// # Response
///
/// - `200 OK` - `already_enrolled` or `payment_required` (with `authorization_url`)
/// - `201 Created` - `enrolled` in a free course
/// - `404 Not Found` - course missing or unpublished
/// - `502 Bad Gateway` - checkout could not be started
#[tracing::instrument(skip(state), fields(caller_id = %caller.0))]
async fn enroll_in_course(
    State(state): State<FeatureState>,
    caller: Caller,
    Path(course_id): Path<Uuid>,
) -> Result<Response, PaymentApiError> {
    let command = EnrollInCourseCommand {
        caller_id: caller.0,
        course_id,
    };
    let outcome = super::commands::initiate::handle(state, command).await?;

    Ok(match outcome {
        EnrollOutcome::Enrolled { .. } => ApiResponse::success(outcome).created(),
        _ => ApiResponse::success(outcome).into_response(),
    })
}

/// Public: the gateway redirects the payer here after checkout
#[tracing::instrument(skip(state))]
async fn verify_payment(
    State(state): State<FeatureState>,
    Query(command): Query<VerifyPaymentCommand>,
) -> Result<Response, PaymentApiError> {
    let payment = super::commands::verify::handle(state, command).await?;
    Ok(ApiResponse::success(payment).into_response())
}

#[derive(Debug)]
enum PaymentApiError {
    Enroll(EnrollInCourseError),
    Verify(VerifyPaymentError),
}

impl From<EnrollInCourseError> for PaymentApiError {
    fn from(err: EnrollInCourseError) -> Self {
        Self::Enroll(err)
    }
}

impl From<VerifyPaymentError> for PaymentApiError {
    fn from(err: VerifyPaymentError) -> Self {
        Self::Verify(err)
    }
}

fn gateway_unavailable() -> Response {
    ErrorResponse::new(
        "PAYMENT_GATEWAY_ERROR",
        "Payment service is temporarily unavailable. Please try again later.",
    )
    .into_response_with(StatusCode::BAD_GATEWAY)
}

impl IntoResponse for PaymentApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Enroll(EnrollInCourseError::Auth(e)) => auth_error_response(&e),
            Self::Enroll(EnrollInCourseError::CourseNotFound(_)) => not_found("Course not found"),
            Self::Enroll(EnrollInCourseError::Gateway(_)) | Self::Verify(VerifyPaymentError::Gateway(_)) => {
                gateway_unavailable()
            },
            Self::Enroll(EnrollInCourseError::Amount(e)) => internal_error("Course price cannot be charged", &e),
            Self::Enroll(EnrollInCourseError::Event(e)) | Self::Verify(VerifyPaymentError::Event(e)) => {
                internal_error("Enrollment failed", &e)
            },
            Self::Enroll(EnrollInCourseError::Database(e)) | Self::Verify(VerifyPaymentError::Database(e)) => {
                internal_error("Database error during payment", &e)
            },
            Self::Verify(VerifyPaymentError::NotFound(_)) => not_found("Payment not found"),
        }
    }
}
