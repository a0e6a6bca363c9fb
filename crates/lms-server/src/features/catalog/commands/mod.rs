pub mod add_question;
pub mod create_category;
pub mod create_course;
pub mod create_lesson;
pub mod create_quiz;
pub mod delete_course;
pub mod update_course;

pub use add_question::{AddQuestionCommand, AddQuestionError, NewAnswer, QuestionWithAnswers};
pub use create_category::{CreateCategoryCommand, CreateCategoryError};
pub use create_course::{CreateCourseCommand, CreateCourseError};
pub use create_lesson::{CreateLessonCommand, CreateLessonError};
pub use create_quiz::{CreateQuizCommand, CreateQuizError};
pub use delete_course::{DeleteCourseCommand, DeleteCourseError, DeleteCourseResponse};
pub use update_course::{UpdateCourseCommand, UpdateCourseError};
