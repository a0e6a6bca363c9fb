//! LMS Server Library
//!
//! HTTP server for a learning management platform: course catalog,
//! enrollments and payments, lesson progress, quizzes, certificates and
//! course announcements.
//!
//! # Architecture
//!
//! The server follows a **CQRS** layout of vertical feature slices:
//!
//! - **Commands** (writes) run in a single Postgres transaction. Their
//!   reactions (profile creation, completion checks, certificate issuance,
//!   notification fan-out) are explicit [`events::DomainEvent`]s dispatched
//!   inside that transaction. Outgoing mail is collected and sent after
//!   commit; mail failures are logged and never undo the write.
//! - **Queries** (reads) take the pool and never write.
//!
//! Collaborators sit behind traits so tests can swap them:
//!
//! - [`gateway::PaymentGateway`]: hosted checkout (Paystack)
//! - [`mail::Mailer`]: SMTP through `lettre`, or log-only
//! - [`storage::ArtifactStore`]: S3/MinIO or local filesystem for certificate PDFs
//!
//! # Example
//!
//! ```no_run
//! use lms_server::{api, config::Config};
//!
//! # async fn run(state: lms_server::features::FeatureState) -> anyhow::Result<()> {
//! let config = Config::load()?;
//! api::serve(&config, state).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod cqrs;
pub mod db;
pub mod error;
pub mod events;
pub mod features;
pub mod gateway;
pub mod mail;
pub mod middleware;
pub mod models;
pub mod storage;

// Re-export commonly used types
pub use error::{AppError, AppResult};
