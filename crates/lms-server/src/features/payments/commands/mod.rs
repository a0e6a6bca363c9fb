pub mod initiate;
pub mod verify;

pub use initiate::{EnrollInCourseCommand, EnrollInCourseError, EnrollOutcome};
pub use verify::{VerifyPaymentCommand, VerifyPaymentError};
