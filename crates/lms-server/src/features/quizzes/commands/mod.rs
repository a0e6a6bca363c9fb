pub mod submit;

pub use submit::{SubmitQuizCommand, SubmitQuizError, SubmitQuizResponse};
