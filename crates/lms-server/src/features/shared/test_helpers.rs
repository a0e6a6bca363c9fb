//! Test helpers and fixtures for database tests
//!
//! Builders insert rows directly, bypassing commands and their side effects
//! (no events, no mail).
//!
//! # Examples
//!
//! ```rust,ignore
//! use lms_server::features::shared::test_helpers::*;
//!
//! #[sqlx::test(migrations = "../../migrations")]
//! async fn test_something(pool: PgPool) -> sqlx::Result<()> {
//!     let instructor = TestAccount::new("prof").role(Role::Instructor).create(&pool).await?;
//!     let course = TestCourse::new(instructor.id).price("25.00").create(&pool).await?;
//!     let lesson = TestLesson::new(course.id).position(1).create(&pool).await?;
//!
//!     // ... test logic ...
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use sqlx::PgPool;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::features::quizzes::grading::AttemptPolicy;
use crate::features::{FeatureState, Settings};
use crate::gateway::{
    Authorization, GatewayError, InitializeRequest, PaymentGateway, Verification,
};
use crate::mail::MemoryMailer;
use crate::models::{
    Account, Course, Lesson, Quiz, Role, ACCOUNT_COLUMNS, COURSE_COLUMNS, LESSON_COLUMNS,
};
use crate::storage::LocalStorage;

// ============================================================================
// Row builders
// ============================================================================

/// Builder for active test accounts; the email is derived from the username
#[derive(Debug, Clone)]
pub struct TestAccount {
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub is_admin: bool,
}

impl TestAccount {
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            full_name: String::new(),
            role: Role::Student,
            is_admin: false,
        }
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }

    pub fn full_name(mut self, full_name: &str) -> Self {
        self.full_name = full_name.to_string();
        self
    }

    pub async fn create(self, pool: &PgPool) -> sqlx::Result<Account> {
        let account = sqlx::query_as::<_, Account>(&format!(
            r#"
            INSERT INTO accounts (email, username, full_name, role, is_admin, is_active)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(format!("{}@example.com", self.username))
        .bind(&self.username)
        .bind(&self.full_name)
        .bind(self.role)
        .bind(self.is_admin)
        .fetch_one(pool)
        .await?;

        sqlx::query("INSERT INTO profiles (account_id) VALUES ($1)")
            .bind(account.id)
            .execute(pool)
            .await?;

        Ok(account)
    }
}

/// Builder for test courses; published and free unless told otherwise
#[derive(Debug, Clone)]
pub struct TestCourse {
    pub instructor_id: Uuid,
    pub title: String,
    pub price: String,
    pub is_published: bool,
}

impl TestCourse {
    pub fn new(instructor_id: Uuid) -> Self {
        Self {
            instructor_id,
            title: format!("Course {}", &Uuid::new_v4().simple().to_string()[..8]),
            price: "0".to_string(),
            is_published: true,
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn price(mut self, price: &str) -> Self {
        self.price = price.to_string();
        self
    }

    pub fn published(mut self, is_published: bool) -> Self {
        self.is_published = is_published;
        self
    }

    pub async fn create(self, pool: &PgPool) -> sqlx::Result<Course> {
        let price = BigDecimal::from_str(&self.price).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        sqlx::query_as::<_, Course>(&format!(
            r#"
            INSERT INTO courses (instructor_id, title, price, is_published)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            COURSE_COLUMNS
        ))
        .bind(self.instructor_id)
        .bind(&self.title)
        .bind(price)
        .bind(self.is_published)
        .fetch_one(pool)
        .await
    }
}

#[derive(Debug, Clone)]
pub struct TestLesson {
    pub course_id: Uuid,
    pub title: String,
    pub position: i32,
}

impl TestLesson {
    pub fn new(course_id: Uuid) -> Self {
        Self {
            course_id,
            title: "Lesson".to_string(),
            position: 0,
        }
    }

    pub fn position(mut self, position: i32) -> Self {
        self.position = position;
        self.title = format!("Lesson {}", position);
        self
    }

    pub async fn create(self, pool: &PgPool) -> sqlx::Result<Lesson> {
        sqlx::query_as::<_, Lesson>(&format!(
            r#"
            INSERT INTO lessons (course_id, title, position)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            LESSON_COLUMNS
        ))
        .bind(self.course_id)
        .bind(&self.title)
        .bind(self.position)
        .fetch_one(pool)
        .await
    }
}

#[derive(Debug, Clone)]
pub struct TestQuiz {
    pub lesson_id: Uuid,
    pub pass_score: i32,
}

impl TestQuiz {
    pub fn new(lesson_id: Uuid) -> Self {
        Self {
            lesson_id,
            pass_score: 70,
        }
    }

    pub fn pass_score(mut self, pass_score: i32) -> Self {
        self.pass_score = pass_score;
        self
    }

    pub async fn create(self, pool: &PgPool) -> sqlx::Result<Quiz> {
        sqlx::query_as::<_, Quiz>(
            r#"
            INSERT INTO quizzes (lesson_id, title, pass_score)
            VALUES ($1, 'Checkpoint', $2)
            RETURNING id, lesson_id, title, pass_score, created_at
            "#,
        )
        .bind(self.lesson_id)
        .bind(self.pass_score)
        .fetch_one(pool)
        .await
    }
}

/// A question with one correct and one wrong answer
#[derive(Debug, Clone, Copy)]
pub struct TestQuestion {
    pub question_id: Uuid,
    pub correct: Uuid,
    pub wrong: Uuid,
}

pub async fn add_question(pool: &PgPool, quiz_id: Uuid, position: i32) -> sqlx::Result<TestQuestion> {
    let question_id: Uuid = sqlx::query_scalar(
        "INSERT INTO questions (quiz_id, text, position) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(quiz_id)
    .bind(format!("Question {}", position))
    .bind(position)
    .fetch_one(pool)
    .await?;

    let correct = insert_answer(pool, question_id, "right", true).await?;
    let wrong = insert_answer(pool, question_id, "wrong", false).await?;

    Ok(TestQuestion {
        question_id,
        correct,
        wrong,
    })
}

async fn insert_answer(pool: &PgPool, question_id: Uuid, text: &str, is_correct: bool) -> sqlx::Result<Uuid> {
    sqlx::query_scalar("INSERT INTO answers (question_id, text, is_correct) VALUES ($1, $2, $3) RETURNING id")
        .bind(question_id)
        .bind(text)
        .bind(is_correct)
        .fetch_one(pool)
        .await
}

/// Insert an enrollment directly (no confirmation mail)
pub async fn enroll(pool: &PgPool, student_id: Uuid, course_id: Uuid) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO enrollments (student_id, course_id) VALUES ($1, $2)")
        .bind(student_id)
        .bind(course_id)
        .execute(pool)
        .await?;
    Ok(())
}

// ============================================================================
// Collaborators
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StubBehavior {
    Succeed,
    Decline,
    Unreachable,
}

/// In-process payment gateway that counts its calls and keeps every
/// checkout request it was asked to start
#[derive(Debug)]
pub struct StubGateway {
    behavior: StubBehavior,
    calls: AtomicUsize,
    checkouts: Mutex<Vec<InitializeRequest>>,
}

impl StubGateway {
    fn with(behavior: StubBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
            checkouts: Mutex::new(Vec::new()),
        }
    }

    /// Initializes checkouts and verifies every reference as paid
    pub fn succeeding() -> Self {
        Self::with(StubBehavior::Succeed)
    }

    /// Initializes checkouts and verifies every reference as failed
    pub fn declining() -> Self {
        Self::with(StubBehavior::Decline)
    }

    pub fn unreachable() -> Self {
        Self::with(StubBehavior::Unreachable)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn checkouts(&self) -> Vec<InitializeRequest> {
        self.checkouts.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn initialize(&self, request: &InitializeRequest) -> Result<Authorization, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.checkouts.lock().unwrap().push(request.clone());
        match self.behavior {
            StubBehavior::Unreachable => Err(GatewayError::Transport("connection refused".to_string())),
            _ => Ok(Authorization {
                authorization_url: format!("https://checkout.test/{}", request.reference),
                access_code: None,
            }),
        }
    }

    async fn verify(&self, _reference: &str) -> Result<Verification, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let transaction_status = match self.behavior {
            StubBehavior::Unreachable => {
                return Err(GatewayError::Transport("connection refused".to_string()))
            },
            StubBehavior::Succeed => "success",
            StubBehavior::Decline => "failed",
        };
        Ok(Verification {
            status: true,
            transaction_status: Some(transaction_status.to_string()),
            message: None,
        })
    }
}

pub fn test_settings() -> Settings {
    Settings {
        public_base_url: "https://apilearn.com".to_string(),
        from_email: "no-reply@apilearn.com".to_string(),
        attempt_policy: AttemptPolicy::unlimited(),
    }
}

/// Feature state over `pool` with a recording mailer and a succeeding gateway
pub fn test_state(pool: PgPool) -> (FeatureState, Arc<MemoryMailer>) {
    test_state_with_gateway(pool, Arc::new(StubGateway::succeeding()))
}

pub fn test_state_with_gateway(pool: PgPool, gateway: Arc<StubGateway>) -> (FeatureState, Arc<MemoryMailer>) {
    let mailer = Arc::new(MemoryMailer::new());
    let root = std::env::temp_dir().join(format!("lms-artifacts-{}", Uuid::new_v4()));

    let state = FeatureState {
        db: pool,
        storage: Arc::new(LocalStorage::new(root)),
        mailer: mailer.clone(),
        gateway,
        settings: Arc::new(test_settings()),
    };
    (state, mailer)
}
