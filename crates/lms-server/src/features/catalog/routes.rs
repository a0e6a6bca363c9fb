//! Catalog API routes
//!
//! Browsing (`GET /categories`, `GET /courses`, `GET /courses/:id`,
//! `GET /courses/:id/lessons`) works without a caller; an identified caller
//! additionally sees their own drafts. Everything else requires one.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use super::commands::{
    AddQuestionCommand, AddQuestionError, CreateCategoryCommand, CreateCategoryError, CreateCourseCommand,
    CreateCourseError, CreateLessonCommand, CreateLessonError, CreateQuizCommand, CreateQuizError,
    DeleteCourseCommand, DeleteCourseError, UpdateCourseCommand, UpdateCourseError,
};
use super::queries::{
    GetCourseError, GetCourseQuery, GetLessonError, GetLessonQuery, GetQuizError, GetQuizQuery,
    ListCategoriesError, ListCategoriesQuery, ListCoursesError, ListCoursesQuery, ListLessonsError,
    ListLessonsQuery,
};
use crate::api::response::ApiResponse;
use crate::features::shared::error_helpers::{
    auth_error_response, conflict, internal_error, not_found, validation_error,
};
use crate::features::shared::Caller;
use crate::features::FeatureState;

pub fn catalog_routes() -> Router<FeatureState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route("/courses", get(list_courses).post(create_course))
        .route(
            "/courses/:id",
            get(get_course).patch(update_course).delete(delete_course),
        )
        .route("/courses/:id/lessons", get(list_lessons).post(create_lesson))
        .route("/lessons/:id", get(get_lesson))
        .route("/lessons/:id/quiz", post(create_quiz))
        .route("/quizzes/:id", get(get_quiz))
        .route("/quizzes/:id/questions", post(add_question))
}

// ============================================================================
// Categories
// ============================================================================

async fn list_categories(State(state): State<FeatureState>) -> Result<Response, CatalogApiError> {
    let categories = super::queries::list_categories::handle(state.db, ListCategoriesQuery::default()).await?;
    Ok(ApiResponse::success(categories).into_response())
}

#[tracing::instrument(skip(state, command), fields(caller_id = %caller.0))]
async fn create_category(
    State(state): State<FeatureState>,
    caller: Caller,
    Json(mut command): Json<CreateCategoryCommand>,
) -> Result<Response, CatalogApiError> {
    command.caller_id = caller.0;
    let category = super::commands::create_category::handle(state.db, command).await?;
    Ok(ApiResponse::success(category).created())
}

// ============================================================================
// Courses
// ============================================================================

#[tracing::instrument(skip(state, query))]
async fn list_courses(
    State(state): State<FeatureState>,
    caller: Option<Caller>,
    Query(mut query): Query<ListCoursesQuery>,
) -> Result<Response, CatalogApiError> {
    query.viewer_id = caller.map(|c| c.0);
    let page = super::queries::list_courses::handle(state.db, query).await?;
    Ok(ApiResponse::success(page).into_response())
}

#[tracing::instrument(skip(state, command), fields(caller_id = %caller.0))]
async fn create_course(
    State(state): State<FeatureState>,
    caller: Caller,
    Json(mut command): Json<CreateCourseCommand>,
) -> Result<Response, CatalogApiError> {
    command.caller_id = caller.0;
    let course = super::commands::create_course::handle(state.db, command).await?;
    Ok(ApiResponse::success(course).created())
}

#[tracing::instrument(skip(state), fields(course_id = %course_id))]
async fn get_course(
    State(state): State<FeatureState>,
    caller: Option<Caller>,
    Path(course_id): Path<Uuid>,
) -> Result<Response, CatalogApiError> {
    let query = GetCourseQuery {
        viewer_id: caller.map(|c| c.0),
        course_id,
    };
    let detail = super::queries::get_course::handle(state.db, query).await?;
    Ok(ApiResponse::success(detail).into_response())
}

#[tracing::instrument(skip(state, command), fields(caller_id = %caller.0, course_id = %course_id))]
async fn update_course(
    State(state): State<FeatureState>,
    caller: Caller,
    Path(course_id): Path<Uuid>,
    Json(mut command): Json<UpdateCourseCommand>,
) -> Result<Response, CatalogApiError> {
    command.caller_id = caller.0;
    command.course_id = course_id;
    let course = super::commands::update_course::handle(state, command).await?;
    Ok(ApiResponse::success(course).into_response())
}

#[tracing::instrument(skip(state), fields(caller_id = %caller.0, course_id = %course_id))]
async fn delete_course(
    State(state): State<FeatureState>,
    caller: Caller,
    Path(course_id): Path<Uuid>,
) -> Result<Response, CatalogApiError> {
    let command = DeleteCourseCommand {
        caller_id: caller.0,
        course_id,
    };
    let response = super::commands::delete_course::handle(state.db, command).await?;
    Ok(ApiResponse::success(response).into_response())
}

// ============================================================================
// Lessons and quizzes
// ============================================================================

#[tracing::instrument(skip(state), fields(course_id = %course_id))]
async fn list_lessons(
    State(state): State<FeatureState>,
    caller: Option<Caller>,
    Path(course_id): Path<Uuid>,
) -> Result<Response, CatalogApiError> {
    let query = ListLessonsQuery {
        viewer_id: caller.map(|c| c.0),
        course_id,
    };
    let lessons = super::queries::list_lessons::handle(state.db, query).await?;
    Ok(ApiResponse::success(lessons).into_response())
}

#[tracing::instrument(skip(state, command), fields(caller_id = %caller.0, course_id = %course_id))]
async fn create_lesson(
    State(state): State<FeatureState>,
    caller: Caller,
    Path(course_id): Path<Uuid>,
    Json(mut command): Json<CreateLessonCommand>,
) -> Result<Response, CatalogApiError> {
    command.caller_id = caller.0;
    command.course_id = course_id;
    let lesson = super::commands::create_lesson::handle(state.db, command).await?;
    Ok(ApiResponse::success(lesson).created())
}

#[tracing::instrument(skip(state), fields(caller_id = %caller.0, lesson_id = %lesson_id))]
async fn get_lesson(
    State(state): State<FeatureState>,
    caller: Caller,
    Path(lesson_id): Path<Uuid>,
) -> Result<Response, CatalogApiError> {
    let query = GetLessonQuery {
        caller_id: caller.0,
        lesson_id,
    };
    let lesson = super::queries::get_lesson::handle(state.db, query).await?;
    Ok(ApiResponse::success(lesson).into_response())
}

#[tracing::instrument(skip(state, command), fields(caller_id = %caller.0, lesson_id = %lesson_id))]
async fn create_quiz(
    State(state): State<FeatureState>,
    caller: Caller,
    Path(lesson_id): Path<Uuid>,
    Json(mut command): Json<CreateQuizCommand>,
) -> Result<Response, CatalogApiError> {
    command.caller_id = caller.0;
    command.lesson_id = lesson_id;
    let quiz = super::commands::create_quiz::handle(state.db, command).await?;
    Ok(ApiResponse::success(quiz).created())
}

#[tracing::instrument(skip(state), fields(caller_id = %caller.0, quiz_id = %quiz_id))]
async fn get_quiz(
    State(state): State<FeatureState>,
    caller: Caller,
    Path(quiz_id): Path<Uuid>,
) -> Result<Response, CatalogApiError> {
    let query = GetQuizQuery {
        caller_id: caller.0,
        quiz_id,
    };
    let quiz = super::queries::get_quiz::handle(state.db, query).await?;
    Ok(ApiResponse::success(quiz).into_response())
}

#[tracing::instrument(skip(state, command), fields(caller_id = %caller.0, quiz_id = %quiz_id))]
async fn add_question(
    State(state): State<FeatureState>,
    caller: Caller,
    Path(quiz_id): Path<Uuid>,
    Json(mut command): Json<AddQuestionCommand>,
) -> Result<Response, CatalogApiError> {
    command.caller_id = caller.0;
    command.quiz_id = quiz_id;
    let question = super::commands::add_question::handle(state.db, command).await?;
    Ok(ApiResponse::success(question).created())
}

// ============================================================================
// Error mapping
// ============================================================================

#[derive(Debug)]
enum CatalogApiError {
    CreateCategory(CreateCategoryError),
    ListCategories(ListCategoriesError),
    CreateCourse(CreateCourseError),
    UpdateCourse(UpdateCourseError),
    DeleteCourse(DeleteCourseError),
    ListCourses(ListCoursesError),
    GetCourse(GetCourseError),
    CreateLesson(CreateLessonError),
    ListLessons(ListLessonsError),
    GetLesson(GetLessonError),
    CreateQuiz(CreateQuizError),
    AddQuestion(AddQuestionError),
    GetQuiz(GetQuizError),
}

macro_rules! from_error {
    ($($variant:ident($error:ty)),* $(,)?) => {
        $(
            impl From<$error> for CatalogApiError {
                fn from(err: $error) -> Self {
                    Self::$variant(err)
                }
            }
        )*
    };
}

from_error!(
    CreateCategory(CreateCategoryError),
    ListCategories(ListCategoriesError),
    CreateCourse(CreateCourseError),
    UpdateCourse(UpdateCourseError),
    DeleteCourse(DeleteCourseError),
    ListCourses(ListCoursesError),
    GetCourse(GetCourseError),
    CreateLesson(CreateLessonError),
    ListLessons(ListLessonsError),
    GetLesson(GetLessonError),
    CreateQuiz(CreateQuizError),
    AddQuestion(AddQuestionError),
    GetQuiz(GetQuizError),
);

impl IntoResponse for CatalogApiError {
    fn into_response(self) -> Response {
        match self {
            // Categories
            Self::CreateCategory(CreateCategoryError::Auth(e)) => auth_error_response(&e),
            Self::CreateCategory(
                e @ (CreateCategoryError::TitleValidation(_) | CreateCategoryError::SlugValidation(_)),
            ) => validation_error(e.to_string()),
            Self::CreateCategory(e @ CreateCategoryError::DuplicateSlug(_)) => conflict(e.to_string()),
            Self::CreateCategory(CreateCategoryError::Database(e))
            | Self::ListCategories(ListCategoriesError::Database(e)) => {
                internal_error("Database error in categories", &e)
            },

            // Courses
            Self::CreateCourse(CreateCourseError::Auth(e))
            | Self::UpdateCourse(UpdateCourseError::Auth(e))
            | Self::DeleteCourse(DeleteCourseError::Auth(e)) => auth_error_response(&e),
            Self::CreateCourse(
                e @ (CreateCourseError::TitleValidation(_)
                | CreateCourseError::Price(_)
                | CreateCourseError::CategoryNotFound(_)),
            ) => validation_error(e.to_string()),
            Self::UpdateCourse(
                e @ (UpdateCourseError::NoFieldsToUpdate
                | UpdateCourseError::TitleValidation(_)
                | UpdateCourseError::Price(_)),
            ) => validation_error(e.to_string()),
            Self::UpdateCourse(UpdateCourseError::NotFound(_))
            | Self::DeleteCourse(DeleteCourseError::NotFound(_))
            | Self::GetCourse(GetCourseError::NotFound(_))
            | Self::ListLessons(ListLessonsError::CourseNotFound(_)) => not_found("Course not found"),
            Self::UpdateCourse(UpdateCourseError::Event(e)) => internal_error("Publish reactions failed", &e),
            Self::CreateCourse(CreateCourseError::Database(e))
            | Self::UpdateCourse(UpdateCourseError::Database(e))
            | Self::DeleteCourse(DeleteCourseError::Database(e))
            | Self::ListCourses(ListCoursesError::Database(e))
            | Self::GetCourse(GetCourseError::Database(e)) => internal_error("Database error in courses", &e),

            // Lessons
            Self::CreateLesson(CreateLessonError::Auth(e)) | Self::GetLesson(GetLessonError::Auth(e)) => {
                auth_error_response(&e)
            },
            Self::CreateLesson(
                e @ (CreateLessonError::TitleValidation(_)
                | CreateLessonError::UrlValidation(_)
                | CreateLessonError::NegativePosition),
            ) => validation_error(e.to_string()),
            Self::CreateLesson(CreateLessonError::CourseNotFound(_)) => not_found("Course not found"),
            Self::GetLesson(GetLessonError::NotFound(_)) | Self::CreateQuiz(CreateQuizError::LessonNotFound(_)) => {
                not_found("Lesson not found")
            },
            Self::CreateLesson(CreateLessonError::Database(e))
            | Self::ListLessons(ListLessonsError::Database(e))
            | Self::GetLesson(GetLessonError::Database(e)) => internal_error("Database error in lessons", &e),

            // Quizzes
            Self::CreateQuiz(CreateQuizError::Auth(e))
            | Self::AddQuestion(AddQuestionError::Auth(e))
            | Self::GetQuiz(GetQuizError::Auth(e)) => auth_error_response(&e),
            Self::CreateQuiz(e @ (CreateQuizError::TitleValidation(_) | CreateQuizError::PassScoreRange)) => {
                validation_error(e.to_string())
            },
            Self::CreateQuiz(e @ CreateQuizError::AlreadyExists(_)) => conflict(e.to_string()),
            Self::AddQuestion(
                e @ (AddQuestionError::TextRequired
                | AddQuestionError::TooFewAnswers
                | AddQuestionError::AnswerTextRequired
                | AddQuestionError::CorrectAnswerCount(_)),
            ) => validation_error(e.to_string()),
            Self::AddQuestion(AddQuestionError::QuizNotFound(_)) | Self::GetQuiz(GetQuizError::NotFound(_)) => {
                not_found("Quiz not found")
            },
            Self::CreateQuiz(CreateQuizError::Database(e))
            | Self::AddQuestion(AddQuestionError::Database(e))
            | Self::GetQuiz(GetQuizError::Database(e)) => internal_error("Database error in quizzes", &e),
        }
    }
}
