pub mod commands;
pub mod grading;
pub mod queries;
pub mod routes;

pub use commands::{SubmitQuizCommand, SubmitQuizError, SubmitQuizResponse};
pub use queries::{ListAttemptsError, ListAttemptsQuery};
pub use routes::quizzes_routes;
