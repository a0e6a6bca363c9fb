pub mod commands;
pub mod completion;
pub mod queries;
pub mod routes;

pub use commands::{
    MarkLessonCompleteCommand, MarkLessonCompleteError, ToggleLessonCommand, ToggleLessonError,
    ToggleLessonResponse,
};
pub use queries::{CourseProgressError, CourseProgressQuery, CourseProgressResponse};
pub use routes::progress_routes;
