//! Role-specific dashboard for the caller

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use mediator::Request;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::enrollments::queries::list::{enrolled_courses, EnrolledCourse};
use crate::features::shared::{require_account, AuthError};

#[derive(Debug, Clone)]
pub struct DashboardQuery {
    pub caller_id: Uuid,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EarnedCertificate {
    pub id: Uuid,
    pub course_id: Uuid,
    pub course_title: String,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TaughtCourse {
    pub id: Uuid,
    pub title: String,
    pub is_published: bool,
    pub price: BigDecimal,
    pub student_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Dashboard {
    Student {
        enrollments: Vec<EnrolledCourse>,
        certificates: Vec<EarnedCertificate>,
    },
    Instructor {
        courses: Vec<TaughtCourse>,
        total_courses: i64,
        total_students: i64,
        total_earnings: BigDecimal,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<Dashboard, DashboardError>> for DashboardQuery {}

impl crate::cqrs::middleware::Query for DashboardQuery {}

#[tracing::instrument(skip(pool, query), fields(caller_id = %query.caller_id))]
pub async fn handle(pool: PgPool, query: DashboardQuery) -> Result<Dashboard, DashboardError> {
    let caller = require_account(&pool, query.caller_id).await?;

    if !caller.is_instructor() {
        let enrollments = enrolled_courses(&pool, caller.id).await?;
        let certificates = sqlx::query_as::<_, EarnedCertificate>(
            r#"
            SELECT c.id, c.course_id, co.title AS course_title, c.issued_at
            FROM certificates c
            JOIN courses co ON co.id = c.course_id
            WHERE c.student_id = $1
            ORDER BY c.issued_at DESC
            "#,
        )
        .bind(caller.id)
        .fetch_all(&pool)
        .await?;

        return Ok(Dashboard::Student {
            enrollments,
            certificates,
        });
    }

    let courses = sqlx::query_as::<_, TaughtCourse>(
        r#"
        SELECT c.id, c.title, c.is_published, c.price,
               (SELECT COUNT(*) FROM enrollments e WHERE e.course_id = c.id) AS student_count
        FROM courses c
        WHERE c.instructor_id = $1
        ORDER BY c.created_at DESC
        "#,
    )
    .bind(caller.id)
    .fetch_all(&pool)
    .await?;

    let total_students: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(DISTINCT e.student_id)
        FROM enrollments e
        JOIN courses c ON c.id = e.course_id
        WHERE c.instructor_id = $1
        "#,
    )
    .bind(caller.id)
    .fetch_one(&pool)
    .await?;

    let total_earnings: BigDecimal = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(p.amount), 0)::NUMERIC(12, 2)
        FROM payments p
        JOIN courses c ON c.id = p.course_id
        WHERE c.instructor_id = $1 AND p.status = 'success'
        "#,
    )
    .bind(caller.id)
    .fetch_one(&pool)
    .await?;

    Ok(Dashboard::Instructor {
        total_courses: courses.len() as i64,
        courses,
        total_students,
        total_earnings,
    })
}
