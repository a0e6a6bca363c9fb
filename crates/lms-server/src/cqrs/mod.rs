//! Mediator wiring
//!
//! Every command and query is a plain struct implementing
//! `mediator::Request`; its handler is a standalone async function that takes
//! either the pool or the whole [`FeatureState`] when it needs collaborators
//! (mailer, gateway, artifact store).

pub use mediator::DefaultAsyncMediator;

use crate::features::FeatureState;

pub mod middleware;

pub type AppMediator = DefaultAsyncMediator;

pub fn build_mediator(state: FeatureState) -> AppMediator {
    let pool = state.db.clone();

    DefaultAsyncMediator::builder()
        // Accounts
        .add_handler({
            let state = state.clone();
            move |cmd| {
                let state = state.clone();
                async move { crate::features::accounts::commands::register::handle(state, cmd).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |cmd| {
                let pool = pool.clone();
                async move { crate::features::accounts::commands::activate::handle(pool, cmd).await }
            }
        })
        .add_handler({
            let state = state.clone();
            move |cmd| {
                let state = state.clone();
                async move { crate::features::accounts::commands::change_role::handle(state, cmd).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |cmd| {
                let pool = pool.clone();
                async move { crate::features::accounts::commands::update_profile::handle(pool, cmd).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |query| {
                let pool = pool.clone();
                async move { crate::features::accounts::queries::get::handle(pool, query).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |query| {
                let pool = pool.clone();
                async move { crate::features::accounts::queries::dashboard::handle(pool, query).await }
            }
        })
        // Catalog
        .add_handler({
            let pool = pool.clone();
            move |cmd| {
                let pool = pool.clone();
                async move { crate::features::catalog::commands::create_category::handle(pool, cmd).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |cmd| {
                let pool = pool.clone();
                async move { crate::features::catalog::commands::create_course::handle(pool, cmd).await }
            }
        })
        .add_handler({
            let state = state.clone();
            move |cmd| {
                let state = state.clone();
                async move { crate::features::catalog::commands::update_course::handle(state, cmd).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |cmd| {
                let pool = pool.clone();
                async move { crate::features::catalog::commands::delete_course::handle(pool, cmd).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |cmd| {
                let pool = pool.clone();
                async move { crate::features::catalog::commands::create_lesson::handle(pool, cmd).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |cmd| {
                let pool = pool.clone();
                async move { crate::features::catalog::commands::create_quiz::handle(pool, cmd).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |cmd| {
                let pool = pool.clone();
                async move { crate::features::catalog::commands::add_question::handle(pool, cmd).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |query| {
                let pool = pool.clone();
                async move { crate::features::catalog::queries::list_categories::handle(pool, query).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |query| {
                let pool = pool.clone();
                async move { crate::features::catalog::queries::list_courses::handle(pool, query).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |query| {
                let pool = pool.clone();
                async move { crate::features::catalog::queries::get_course::handle(pool, query).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |query| {
                let pool = pool.clone();
                async move { crate::features::catalog::queries::list_lessons::handle(pool, query).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |query| {
                let pool = pool.clone();
                async move { crate::features::catalog::queries::get_lesson::handle(pool, query).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |query| {
                let pool = pool.clone();
                async move { crate::features::catalog::queries::get_quiz::handle(pool, query).await }
            }
        })
        // Enrollments and payments
        .add_handler({
            let pool = pool.clone();
            move |query| {
                let pool = pool.clone();
                async move { crate::features::enrollments::queries::list::handle(pool, query).await }
            }
        })
        .add_handler({
            let state = state.clone();
            move |cmd| {
                let state = state.clone();
                async move { crate::features::payments::commands::initiate::handle(state, cmd).await }
            }
        })
        .add_handler({
            let state = state.clone();
            move |cmd| {
                let state = state.clone();
                async move { crate::features::payments::commands::verify::handle(state, cmd).await }
            }
        })
        // Progress and certificates
        .add_handler({
            let state = state.clone();
            move |cmd| {
                let state = state.clone();
                async move { crate::features::progress::commands::toggle::handle(state, cmd).await }
            }
        })
        .add_handler({
            let state = state.clone();
            move |cmd| {
                let state = state.clone();
                async move { crate::features::progress::commands::complete::handle(state, cmd).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |query| {
                let pool = pool.clone();
                async move { crate::features::progress::queries::course_progress::handle(pool, query).await }
            }
        })
        .add_handler({
            let state = state.clone();
            move |cmd| {
                let state = state.clone();
                async move { crate::features::certificates::commands::download::handle(state, cmd).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |query| {
                let pool = pool.clone();
                async move { crate::features::certificates::queries::verify::handle(pool, query).await }
            }
        })
        // Quizzes
        .add_handler({
            let state = state.clone();
            move |cmd| {
                let state = state.clone();
                async move { crate::features::quizzes::commands::submit::handle(state, cmd).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |query| {
                let pool = pool.clone();
                async move { crate::features::quizzes::queries::list_attempts::handle(pool, query).await }
            }
        })
        // Communications
        .add_handler({
            let state = state.clone();
            move |cmd| {
                let state = state.clone();
                async move { crate::features::communications::commands::announce::handle(state, cmd).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |cmd| {
                let pool = pool.clone();
                async move { crate::features::communications::commands::mark_read::handle(pool, cmd).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |cmd| {
                let pool = pool.clone();
                async move { crate::features::communications::commands::mark_read::handle_all(pool, cmd).await }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |query| {
                let pool = pool.clone();
                async move { crate::features::communications::queries::inbox::handle(pool, query).await }
            }
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::catalog::ListCategoriesQuery;
    use crate::features::shared::test_helpers::test_state;
    use mediator::AsyncMediator;
    use sqlx::postgres::PgPoolOptions;

    // Handler registration blocks in place, which needs the multi-thread runtime.
    #[tokio::test(flavor = "multi_thread")]
    async fn test_mediator_builds() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/lms_test")
            .unwrap();
        let (state, _) = test_state(pool);
        let _mediator = build_mediator(state);
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ignore] // Requires database
    async fn test_mediator_dispatches_queries() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await
            .expect("Failed to connect to database");
        crate::db::run_migrations(&pool).await.unwrap();

        let (state, _) = test_state(pool);
        let mut mediator = build_mediator(state);

        let categories = mediator.send(ListCategoriesQuery::default()).await.unwrap();
        assert!(categories.is_ok());
    }
}
