pub mod course_progress;

pub use course_progress::{CourseProgressError, CourseProgressQuery, CourseProgressResponse, NextLesson};
