pub mod list_attempts;

pub use list_attempts::{ListAttemptsError, ListAttemptsQuery};
