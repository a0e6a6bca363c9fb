//! Course completion detection
//!
//! Completion is re-derived from the progress table on every write; nothing
//! is cached.

use serde::Serialize;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

/// Completed vs total lessons for one (student, course)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompletionSnapshot {
    pub completed: i64,
    pub total: i64,
}

impl CompletionSnapshot {
    /// A course without lessons is never complete
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }

    /// Percentage rounded to one decimal place
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let raw = self.completed as f64 * 100.0 / self.total as f64;
        (raw * 10.0).round() / 10.0
    }
}

pub async fn count_lessons<'e, E>(executor: E, course_id: Uuid) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM lessons WHERE course_id = $1")
        .bind(course_id)
        .fetch_one(executor)
        .await
}

/// Completed lessons of the course that still exist
pub async fn count_completed<'e, E>(
    executor: E,
    student_id: Uuid,
    course_id: Uuid,
) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM lesson_progress lp
        JOIN lessons l ON l.id = lp.lesson_id
        WHERE lp.student_id = $1 AND l.course_id = $2 AND lp.is_completed
        "#,
    )
    .bind(student_id)
    .bind(course_id)
    .fetch_one(executor)
    .await
}

pub async fn snapshot(
    conn: &mut sqlx::PgConnection,
    student_id: Uuid,
    course_id: Uuid,
) -> Result<CompletionSnapshot, sqlx::Error> {
    let total = count_lessons(&mut *conn, course_id).await?;
    let completed = count_completed(&mut *conn, student_id, course_id).await?;
    Ok(CompletionSnapshot { completed, total })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(completed: i64, total: i64) -> CompletionSnapshot {
        CompletionSnapshot { completed, total }
    }

    #[test]
    fn test_is_complete() {
        assert!(snap(3, 3).is_complete());
        assert!(!snap(2, 3).is_complete());
        assert!(!snap(0, 0).is_complete());
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(snap(1, 3).percentage(), 33.3);
        assert_eq!(snap(2, 3).percentage(), 66.7);
        assert_eq!(snap(3, 3).percentage(), 100.0);
        assert_eq!(snap(0, 0).percentage(), 0.0);
    }
}
