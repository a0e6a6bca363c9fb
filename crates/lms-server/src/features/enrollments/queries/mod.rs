pub mod list;

pub use list::{EnrolledCourse, ListEnrollmentsError, ListEnrollmentsQuery};
