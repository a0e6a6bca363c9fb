pub mod commands;
pub mod queries;
pub mod routes;

pub use commands::{
    AddQuestionCommand, AddQuestionError, CreateCategoryCommand, CreateCategoryError, CreateCourseCommand,
    CreateCourseError, CreateLessonCommand, CreateLessonError, CreateQuizCommand, CreateQuizError,
    DeleteCourseCommand, DeleteCourseError, DeleteCourseResponse, NewAnswer, QuestionWithAnswers,
    UpdateCourseCommand, UpdateCourseError,
};
pub use queries::{
    CourseDetail, GetCourseError, GetCourseQuery, GetLessonError, GetLessonQuery, GetQuizError, GetQuizQuery,
    LessonDetail, LessonOutline, ListCategoriesError, ListCategoriesQuery, ListCoursesError, ListCoursesQuery,
    ListLessonsError, ListLessonsQuery, QuizView,
};
pub use routes::catalog_routes;
