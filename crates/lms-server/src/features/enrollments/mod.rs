pub mod ledger;
pub mod queries;
pub mod routes;

pub use queries::{EnrolledCourse, ListEnrollmentsError, ListEnrollmentsQuery};
pub use routes::enrollments_routes;
