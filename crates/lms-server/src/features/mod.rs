//! Feature modules implementing the LMS API
//!
//! Each feature is a vertical slice with its own commands, queries and
//! routes, following the CQRS layout:
//!
//! - `commands/` - write operations
//! - `queries/` - read operations
//! - `routes.rs` - HTTP handlers and the feature's error-to-response mapping
//!
//! # Features
//!
//! - **accounts**: registration, activation, profile, role changes, dashboards
//! - **catalog**: categories, courses, lessons, quizzes and questions
//! - **enrollments**: the enrollment ledger and the caller's enrollments
//! - **progress**: lesson completion and course progress
//! - **certificates**: issuance, public verification and PDF download
//! - **quizzes**: grading and attempt history
//! - **payments**: checkout initiation and gateway verification
//! - **communications**: announcements, fan-out and the notification inbox

pub mod accounts;
pub mod catalog;
pub mod certificates;
pub mod communications;
pub mod enrollments;
pub mod payments;
pub mod progress;
pub mod quizzes;
pub mod shared;

use axum::Router;
use std::sync::Arc;

use crate::config::Config;
use crate::gateway::PaymentGateway;
use crate::mail::Mailer;
use crate::storage::ArtifactStore;
use quizzes::grading::AttemptPolicy;

/// Values handlers need besides their collaborators
#[derive(Debug, Clone)]
pub struct Settings {
    /// Externally visible base URL without trailing slash
    pub public_base_url: String,
    pub from_email: String,
    pub attempt_policy: AttemptPolicy,
}

impl Settings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            public_base_url: config.server.public_base_url.clone(),
            from_email: config.mail.from_email.clone(),
            attempt_policy: AttemptPolicy::from_config(&config.quiz),
        }
    }

    /// Absolute URL for a server path such as `/api/v1/payments/verify`
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.public_base_url.trim_end_matches('/'), path)
    }
}

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// PostgreSQL connection pool
    pub db: sqlx::PgPool,
    /// Where certificate PDFs live
    pub storage: Arc<dyn ArtifactStore>,
    pub mailer: Arc<dyn Mailer>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub settings: Arc<Settings>,
}

/// Creates the `/api/v1` router with every feature mounted
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .merge(accounts::accounts_routes())
        .merge(catalog::catalog_routes())
        .merge(enrollments::enrollments_routes())
        .merge(progress::progress_routes())
        .merge(certificates::certificates_routes())
        .merge(quizzes::quizzes_routes())
        .merge(payments::payments_routes())
        .merge(communications::communications_routes())
        .with_state(state)
}
