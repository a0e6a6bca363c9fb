pub mod get_course;
pub mod get_lesson;
pub mod get_quiz;
pub mod list_categories;
pub mod list_courses;
pub mod list_lessons;

pub use get_course::{CourseDetail, GetCourseError, GetCourseQuery};
pub use get_lesson::{GetLessonError, GetLessonQuery, LessonDetail};
pub use get_quiz::{AnswerView, GetQuizError, GetQuizQuery, QuestionView, QuizView};
pub use list_categories::{ListCategoriesError, ListCategoriesQuery};
pub use list_courses::{ListCoursesError, ListCoursesQuery};
pub use list_lessons::{LessonOutline, ListLessonsError, ListLessonsQuery};
