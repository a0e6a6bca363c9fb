pub mod commands;
pub mod routes;

pub use commands::{
    EnrollInCourseCommand, EnrollInCourseError, EnrollOutcome, VerifyPaymentCommand, VerifyPaymentError,
};
pub use routes::payments_routes;
