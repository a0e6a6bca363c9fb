//! Database models
//!
//! Row types shared by several feature slices. Enum columns map onto the
//! Postgres enum types created by the initial migration.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ============================================================================
// Enums
// ============================================================================

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Instructor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Instructor => "instructor",
        }
    }

    /// Human-readable label used in notices
    pub fn label(&self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Instructor => "Instructor",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of content a lesson carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "lesson_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LessonType {
    #[default]
    Video,
    Text,
    Pdf,
}

/// Payment lifecycle: `pending` moves to `success` or `failed` exactly once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

// ============================================================================
// Identity
// ============================================================================

/// Account as seen by the rest of the server (activation token hash excluded)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub is_admin: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Column list matching [`Account`]
pub const ACCOUNT_COLUMNS: &str =
    "id, email, username, full_name, role, is_admin, is_active, created_at";

impl Account {
    /// Full name when set, otherwise the username
    pub fn display_name(&self) -> &str {
        let name = self.full_name.trim();
        if name.is_empty() {
            &self.username
        } else {
            name
        }
    }

    pub fn is_instructor(&self) -> bool {
        self.role == Role::Instructor
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub account_id: Uuid,
    pub bio: String,
    pub avatar_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Catalog
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: Uuid,
    pub instructor_id: Uuid,
    pub category_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub price: BigDecimal,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const COURSE_COLUMNS: &str = "id, instructor_id, category_id, title, description, price, \
                                  is_published, created_at, updated_at";

impl Course {
    pub fn is_owned_by(&self, account_id: Uuid) -> bool {
        self.instructor_id == account_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Lesson {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(rename = "order")]
    pub position: i32,
    pub lesson_type: LessonType,
    pub video_url: Option<String>,
    pub pdf_url: Option<String>,
    pub text_content: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub const LESSON_COLUMNS: &str = "id, course_id, title, description, position, lesson_type, \
                                  video_url, pdf_url, text_content, created_at";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Quiz {
    pub id: Uuid,
    pub lesson_id: Uuid,
    pub title: String,
    pub pass_score: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub text: String,
    #[serde(rename = "order")]
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Answer {
    pub id: Uuid,
    pub question_id: Uuid,
    pub text: String,
    pub is_correct: bool,
}

// ============================================================================
// Learning records
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Enrollment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub enrolled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LessonProgress {
    pub id: Uuid,
    pub student_id: Uuid,
    pub lesson_id: Uuid,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuizAttempt {
    pub id: Uuid,
    pub student_id: Uuid,
    pub quiz_id: Uuid,
    pub score: f64,
    pub passed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Certificate {
    pub id: Uuid,
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub artifact_ref: String,
}

// ============================================================================
// Payments and communications
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Option<Uuid>,
    pub reference: String,
    pub amount: BigDecimal,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const PAYMENT_COLUMNS: &str =
    "id, user_id, course_id, reference, amount, status, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Announcement {
    pub id: Uuid,
    pub course_id: Uuid,
    pub instructor_id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub message: String,
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(full_name: &str) -> Account {
        Account {
            id: Uuid::new_v4(),
            email: "ada@example.com".to_string(),
            username: "ada".to_string(),
            full_name: full_name.to_string(),
            role: Role::Student,
            is_admin: false,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_display_name_prefers_full_name() {
        assert_eq!(account("Ada Lovelace").display_name(), "Ada Lovelace");
        assert_eq!(account("   ").display_name(), "ada");
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Instructor).unwrap(), "\"instructor\"");
        let role: Role = serde_json::from_str("\"student\"").unwrap();
        assert_eq!(role, Role::Student);
    }

    #[test]
    fn test_payment_status_terminal() {
        assert!(!PaymentStatus::Pending.is_terminal());
        assert!(PaymentStatus::Success.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
    }
}
