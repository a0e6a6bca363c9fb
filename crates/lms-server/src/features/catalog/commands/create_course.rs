use bigdecimal::{BigDecimal, RoundingMode, Zero};
use lms_common::money::validate_price;
use lms_common::LmsError;
use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::shared::auth::require_instructor;
use crate::features::shared::error_helpers::is_foreign_key_violation;
use crate::features::shared::validation::{validate_name, NameValidationError};
use crate::features::shared::{require_account, AuthError};
use crate::models::{Course, COURSE_COLUMNS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCourseCommand {
    #[serde(skip)]
    pub caller_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: Option<BigDecimal>,
    #[serde(default)]
    pub category_id: Option<Uuid>,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateCourseError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Title: {0}")]
    TitleValidation(#[from] NameValidationError),

    #[error(transparent)]
    Price(#[from] LmsError),

    #[error("Category '{0}' not found")]
    CategoryNotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<Course, CreateCourseError>> for CreateCourseCommand {}

impl crate::cqrs::middleware::Command for CreateCourseCommand {}

impl CreateCourseCommand {
    pub fn validate(&self) -> Result<(), CreateCourseError> {
        validate_name(&self.title, 200)?;
        if let Some(price) = &self.price {
            validate_price(price)?;
        }
        Ok(())
    }

    /// Price rounded to the stored two decimals; absent means free
    pub fn normalized_price(&self) -> BigDecimal {
        self.price
            .as_ref()
            .map(|p| p.with_scale_round(2, RoundingMode::HalfUp))
            .unwrap_or_else(BigDecimal::zero)
    }
}

#[tracing::instrument(skip(pool, command), fields(caller_id = %command.caller_id))]
pub async fn handle(pool: PgPool, command: CreateCourseCommand) -> Result<Course, CreateCourseError> {
    command.validate()?;

    let caller = require_account(&pool, command.caller_id).await?;
    require_instructor(&caller)?;

    // Courses always start unpublished
    let course = sqlx::query_as::<_, Course>(&format!(
        r#"
        INSERT INTO courses (instructor_id, category_id, title, description, price)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {}
        "#,
        COURSE_COLUMNS
    ))
    .bind(caller.id)
    .bind(command.category_id)
    .bind(command.title.trim())
    .bind(&command.description)
    .bind(command.normalized_price())
    .fetch_one(&pool)
    .await
    .map_err(|e| match command.category_id {
        Some(id) if is_foreign_key_violation(&e) => CreateCourseError::CategoryNotFound(id),
        _ => CreateCourseError::Database(e),
    })?;

    tracing::info!(course_id = %course.id, "Course created");
    Ok(course)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::TestAccount;
    use crate::models::Role;
    use std::str::FromStr;

    fn command(price: Option<&str>) -> CreateCourseCommand {
        CreateCourseCommand {
            caller_id: Uuid::new_v4(),
            title: "Rust for Beginners".to_string(),
            description: String::new(),
            price: price.map(|p| BigDecimal::from_str(p).unwrap()),
            category_id: None,
        }
    }

    #[test]
    fn test_price_validation() {
        assert!(command(None).validate().is_ok());
        assert!(command(Some("49.99")).validate().is_ok());
        assert!(matches!(
            command(Some("-1")).validate(),
            Err(CreateCourseError::Price(LmsError::InvalidAmount(_)))
        ));
    }

    #[test]
    fn test_normalized_price() {
        assert_eq!(command(None).normalized_price(), BigDecimal::zero());
        assert_eq!(
            command(Some("10.005")).normalized_price(),
            BigDecimal::from_str("10.01").unwrap()
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore] // Requires database
    async fn test_new_course_is_unpublished(pool: PgPool) -> sqlx::Result<()> {
        let instructor = TestAccount::new("prof").role(Role::Instructor).create(&pool).await?;
        let mut cmd = command(Some("25"));
        cmd.caller_id = instructor.id;

        let course = handle(pool.clone(), cmd).await.unwrap();
        assert!(!course.is_published);
        assert_eq!(course.instructor_id, instructor.id);
        assert_eq!(course.price, BigDecimal::from_str("25.00").unwrap());
        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore] // Requires database
    async fn test_unknown_category(pool: PgPool) -> sqlx::Result<()> {
        let instructor = TestAccount::new("prof").role(Role::Instructor).create(&pool).await?;
        let mut cmd = command(None);
        cmd.caller_id = instructor.id;
        cmd.category_id = Some(Uuid::new_v4());

        let result = handle(pool.clone(), cmd).await;
        assert!(matches!(result, Err(CreateCourseError::CategoryNotFound(_))));
        Ok(())
    }
}
