//! Payment verification (gateway callback)
//!
//! Only pending payments are checked with the gateway. The pending to
//! success transition is a conditional update, so duplicate callbacks can
//! neither enroll twice nor send a second receipt.

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;

use crate::events::{Effects, EventError};
use crate::features::enrollments::ledger;
use crate::features::shared::auth::find_account;
use crate::features::shared::lookup;
use crate::features::{FeatureState, Settings};
use crate::gateway::GatewayError;
use crate::mail::OutgoingMail;
use crate::models::{Account, Course, Payment, PaymentStatus, PAYMENT_COLUMNS};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyPaymentCommand {
    #[serde(default)]
    pub reference: String,
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyPaymentError {
    #[error("Payment '{0}' not found")]
    NotFound(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<Payment, VerifyPaymentError>> for VerifyPaymentCommand {}

impl crate::cqrs::middleware::Command for VerifyPaymentCommand {}

async fn find_payment(conn: &mut PgConnection, reference: &str) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>(&format!(
        "SELECT {} FROM payments WHERE reference = $1",
        PAYMENT_COLUMNS
    ))
    .bind(reference)
    .fetch_optional(&mut *conn)
    .await
}

/// Move a pending payment to `status`; `None` when it was no longer pending
async fn transition(
    conn: &mut PgConnection,
    reference: &str,
    status: PaymentStatus,
) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>(&format!(
        r#"
        UPDATE payments
        SET status = $2, updated_at = NOW()
        WHERE reference = $1 AND status = 'pending'
        RETURNING {}
        "#,
        PAYMENT_COLUMNS
    ))
    .bind(reference)
    .bind(status)
    .fetch_optional(&mut *conn)
    .await
}

pub fn receipt_mail(settings: &Settings, student: &Account, course: &Course, payment: &Payment) -> OutgoingMail {
    OutgoingMail::new(
        settings.from_email.clone(),
        format!("Payment Receipt: {}", course.title),
        format!(
            "Payment Received: ${}\nReference: {}\n\nAccess your course now!",
            payment.amount.with_scale(2),
            payment.reference
        ),
    )
    .to(student.email.clone())
    .fail_silently()
}

#[tracing::instrument(skip(state, command), fields(reference = %command.reference))]
pub async fn handle(state: FeatureState, command: VerifyPaymentCommand) -> Result<Payment, VerifyPaymentError> {
    let reference = command.reference.trim().to_string();
    if reference.is_empty() {
        return Err(VerifyPaymentError::NotFound(reference));
    }

    let mut conn = state.db.acquire().await?;
    let payment = find_payment(&mut conn, &reference)
        .await?
        .ok_or_else(|| VerifyPaymentError::NotFound(reference.clone()))?;
    drop(conn);

    if payment.status.is_terminal() {
        tracing::debug!(status = ?payment.status, "Payment already settled");
        return Ok(payment);
    }

    // outside any transaction; a transport failure leaves the payment pending
    let verification = state.gateway.verify(&reference).await.map_err(|e| {
        tracing::error!(error = %e, "Payment verification failed");
        e
    })?;

    let mut tx = state.db.begin().await?;
    let mut effects = Effects::default();

    let outcome = if verification.is_success() {
        transition(&mut tx, &reference, PaymentStatus::Success).await?
    } else {
        tracing::warn!(
            gateway_status = ?verification.transaction_status,
            message = ?verification.message,
            "Payment not successful"
        );
        transition(&mut tx, &reference, PaymentStatus::Failed).await?
    };

    let settled = match outcome {
        Some(updated) => {
            if updated.status == PaymentStatus::Success {
                if let Some(course_id) = updated.course_id {
                    let (_, _, enrolled) = ledger::enroll(&mut tx, &state, updated.user_id, course_id).await?;
                    effects.merge(enrolled);

                    let student = find_account(&mut *tx, updated.user_id).await?;
                    let course = lookup::find_course(&mut *tx, course_id).await?;
                    if let (Some(student), Some(course)) = (student, course) {
                        effects.mail.push(receipt_mail(&state.settings, &student, &course, &updated));
                    }
                }
            }
            tracing::info!(status = ?updated.status, "Payment settled");
            updated
        },
        // another callback settled it first
        None => find_payment(&mut tx, &reference)
            .await?
            .ok_or_else(|| VerifyPaymentError::NotFound(reference.clone()))?,
    };

    tx.commit().await?;
    effects.flush(state.mailer.as_ref()).await;

    Ok(settled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::payments::commands::initiate::{
        self, insert_payment, EnrollInCourseCommand, EnrollOutcome,
    };
    use crate::features::shared::test_helpers::{test_state_with_gateway, StubGateway, TestAccount, TestCourse};
    use crate::models::Role;
    use sqlx::PgPool;
    use std::sync::Arc;

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore] // Requires database
    async fn test_duplicate_success_callbacks(pool: PgPool) -> sqlx::Result<()> {
        let gateway = Arc::new(StubGateway::succeeding());
        let (state, mailer) = test_state_with_gateway(pool.clone(), gateway.clone());
        let instructor = TestAccount::new("prof").role(Role::Instructor).create(&pool).await?;
        let student = TestAccount::new("stu").create(&pool).await?;
        let course = TestCourse::new(instructor.id).price("25.00").create(&pool).await?;

        let mut conn = pool.acquire().await?;
        insert_payment(&mut conn, student.id, &course, "REF123", PaymentStatus::Pending).await?;
        drop(conn);

        let verify = || VerifyPaymentCommand {
            reference: "REF123".to_string(),
        };
        let first = handle(state.clone(), verify()).await.unwrap();
        let second = handle(state.clone(), verify()).await.unwrap();

        assert_eq!(first.status, PaymentStatus::Success);
        assert_eq!(second.status, PaymentStatus::Success);
        assert_eq!(gateway.calls(), 1);

        let enrollments: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM enrollments WHERE student_id = $1 AND course_id = $2",
        )
        .bind(student.id)
        .bind(course.id)
        .fetch_one(&pool)
        .await?;
        assert_eq!(enrollments, 1);

        let receipts = mailer
            .sent()
            .into_iter()
            .filter(|m| m.subject.starts_with("Payment Receipt"))
            .count();
        assert_eq!(receipts, 1);
        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore] // Requires database
    async fn test_declined_payment_fails(pool: PgPool) -> sqlx::Result<()> {
        let (state, _) = test_state_with_gateway(pool.clone(), Arc::new(StubGateway::declining()));
        let instructor = TestAccount::new("prof").role(Role::Instructor).create(&pool).await?;
        let student = TestAccount::new("stu").create(&pool).await?;
        let course = TestCourse::new(instructor.id).price("25.00").create(&pool).await?;

        let mut conn = pool.acquire().await?;
        insert_payment(&mut conn, student.id, &course, "REF456", PaymentStatus::Pending).await?;
        drop(conn);

        let payment = handle(
            state,
            VerifyPaymentCommand {
                reference: "REF456".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(payment.status, PaymentStatus::Failed);
        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore] // Requires database
    async fn test_unknown_reference(pool: PgPool) -> sqlx::Result<()> {
        let (state, _) = test_state_with_gateway(pool, Arc::new(StubGateway::succeeding()));
        let result = handle(
            state,
            VerifyPaymentCommand {
                reference: "NOPE".to_string(),
            },
        )
        .await;
        assert!(matches!(result, Err(VerifyPaymentError::NotFound(_))));
        Ok(())
    }

    async fn enrollment_count(pool: &PgPool, student_id: uuid::Uuid, course_id: uuid::Uuid) -> sqlx::Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM enrollments WHERE student_id = $1 AND course_id = $2")
            .bind(student_id)
            .bind(course_id)
            .fetch_one(pool)
            .await
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore] // Requires database
    async fn test_paid_callback_after_free_enrollment(pool: PgPool) -> sqlx::Result<()> {
        let (state, mailer) = test_state_with_gateway(pool.clone(), Arc::new(StubGateway::succeeding()));
        let instructor = TestAccount::new("prof").role(Role::Instructor).create(&pool).await?;
        let student = TestAccount::new("stu").create(&pool).await?;
        let course = TestCourse::new(instructor.id).price("30.00").create(&pool).await?;

        let checkout = initiate::handle(
            state.clone(),
            EnrollInCourseCommand {
                caller_id: student.id,
                course_id: course.id,
            },
        )
        .await
        .unwrap();
        let EnrollOutcome::PaymentRequired { reference, .. } = checkout else {
            panic!("expected a checkout, got {:?}", checkout);
        };

        // the course goes free while the checkout is still open
        sqlx::query("UPDATE courses SET price = 0 WHERE id = $1")
            .bind(course.id)
            .execute(&pool)
            .await?;
        let free = initiate::handle(
            state.clone(),
            EnrollInCourseCommand {
                caller_id: student.id,
                course_id: course.id,
            },
        )
        .await
        .unwrap();
        assert!(matches!(free, EnrollOutcome::Enrolled { .. }));

        let payment = handle(state, VerifyPaymentCommand { reference }).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Success);
        assert_eq!(enrollment_count(&pool, student.id, course.id).await?, 1);

        let enrollment_mails = mailer
            .sent()
            .into_iter()
            .filter(|m| !m.subject.starts_with("Payment Receipt"))
            .count();
        assert_eq!(enrollment_mails, 1);
        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore] // Requires database
    async fn test_free_enroll_after_paid_callback(pool: PgPool) -> sqlx::Result<()> {
        let gateway = Arc::new(StubGateway::succeeding());
        let (state, _) = test_state_with_gateway(pool.clone(), gateway.clone());
        let instructor = TestAccount::new("prof").role(Role::Instructor).create(&pool).await?;
        let student = TestAccount::new("stu").create(&pool).await?;
        let course = TestCourse::new(instructor.id).price("30.00").create(&pool).await?;

        let mut conn = pool.acquire().await?;
        insert_payment(&mut conn, student.id, &course, "REF789", PaymentStatus::Pending).await?;
        drop(conn);

        handle(
            state.clone(),
            VerifyPaymentCommand {
                reference: "REF789".to_string(),
            },
        )
        .await
        .unwrap();

        sqlx::query("UPDATE courses SET price = 0 WHERE id = $1")
            .bind(course.id)
            .execute(&pool)
            .await?;
        let outcome = initiate::handle(
            state,
            EnrollInCourseCommand {
                caller_id: student.id,
                course_id: course.id,
            },
        )
        .await
        .unwrap();

        assert!(matches!(outcome, EnrollOutcome::AlreadyEnrolled { .. }));
        assert_eq!(enrollment_count(&pool, student.id, course.id).await?, 1);
        assert_eq!(gateway.calls(), 1);
        Ok(())
    }
}
