//! Announcement fan-out
//!
//! An announcement becomes one in-app notification per enrolled student and
//! a single email with every student in blind copy.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::mail::OutgoingMail;
use crate::models::{Announcement, Course};

/// Enrolled student contact details
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Recipient {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedNotification {
    pub user_id: Uuid,
    pub message: String,
    pub link: String,
}

#[derive(Debug, Clone)]
pub struct FanOutPlan {
    pub notifications: Vec<PlannedNotification>,
    /// `None` when nobody is enrolled
    pub mail: Option<OutgoingMail>,
}

pub fn course_link(course_id: Uuid) -> String {
    format!("/courses/{}/", course_id)
}

pub fn plan_fan_out(
    announcement: &Announcement,
    course: &Course,
    instructor_username: &str,
    recipients: &[Recipient],
    from_email: &str,
) -> FanOutPlan {
    let message = format!("New Announcement in {}: {}", course.title, announcement.title);
    let link = course_link(course.id);

    let notifications = recipients
        .iter()
        .map(|r| PlannedNotification {
            user_id: r.id,
            message: message.clone(),
            link: link.clone(),
        })
        .collect();

    let mail = (!recipients.is_empty()).then(|| {
        OutgoingMail::new(
            from_email,
            format!("{}: {}", course.title, announcement.title),
            format!("{}\n\n- {}", announcement.content, instructor_username),
        )
        .bcc(recipients.iter().map(|r| r.email.clone()))
        .fail_silently()
    });

    FanOutPlan { notifications, mail }
}

pub async fn enrolled_recipients(
    conn: &mut PgConnection,
    course_id: Uuid,
) -> Result<Vec<Recipient>, sqlx::Error> {
    sqlx::query_as::<_, Recipient>(
        r#"
        SELECT a.id, a.email
        FROM enrollments e
        JOIN accounts a ON a.id = e.student_id
        WHERE e.course_id = $1
        ORDER BY e.enrolled_at
        "#,
    )
    .bind(course_id)
    .fetch_all(&mut *conn)
    .await
}

/// Insert the planned notifications in one statement
pub async fn insert_notifications(
    conn: &mut PgConnection,
    notifications: &[PlannedNotification],
) -> Result<u64, sqlx::Error> {
    if notifications.is_empty() {
        return Ok(0);
    }

    let user_ids: Vec<Uuid> = notifications.iter().map(|n| n.user_id).collect();
    let messages: Vec<String> = notifications.iter().map(|n| n.message.clone()).collect();
    let links: Vec<String> = notifications.iter().map(|n| n.link.clone()).collect();

    let result = sqlx::query(
        r#"
        INSERT INTO notifications (user_id, message, link)
        SELECT * FROM UNNEST($1::uuid[], $2::text[], $3::text[])
        "#,
    )
    .bind(&user_ids)
    .bind(&messages)
    .bind(&links)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn fixtures() -> (Announcement, Course) {
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
        let announcement = Announcement {
            id: Uuid::new_v4(),
            course_id: course.id,
            instructor_id: course.instructor_id,
            title: "Exam moved".to_string(),
            content: "The exam is now on Friday.".to_string(),
            created_at: Utc::now(),
        };
        (announcement, course)
    }

    fn recipients(n: usize) -> Vec<Recipient> {
        (0..n)
            .map(|i| Recipient {
                id: Uuid::new_v4(),
                email: format!("student{}@example.com", i),
            })
            .collect()
    }

    #[test]
    fn test_three_students_one_bcc_mail() {
        let (announcement, course) = fixtures();
        let plan = plan_fan_out(&announcement, &course, "prof", &recipients(3), "no-reply@apilearn.com");

        assert_eq!(plan.notifications.len(), 3);
        assert_eq!(plan.notifications[0].message, "New Announcement in Rust 101: Exam moved");
        assert_eq!(plan.notifications[0].link, format!("/courses/{}/", course.id));

        let mail = plan.mail.unwrap();
        assert!(mail.to.is_empty());
        assert_eq!(mail.bcc.len(), 3);
        assert_eq!(mail.subject, "Rust 101: Exam moved");
        assert_eq!(mail.body, "The exam is now on Friday.\n\n- prof");
        assert!(mail.fail_silently);
    }

    #[test]
    fn test_no_students_no_mail() {
        let (announcement, course) = fixtures();
        let plan = plan_fan_out(&announcement, &course, "prof", &[], "no-reply@apilearn.com");
        assert!(plan.notifications.is_empty());
        assert!(plan.mail.is_none());
    }
}
