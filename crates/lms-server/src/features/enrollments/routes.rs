//! `GET /api/v1/enrollments` - courses the caller is enrolled in

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use super::queries::{ListEnrollmentsError, ListEnrollmentsQuery};
use crate::api::response::ApiResponse;
use crate::features::shared::error_helpers::{auth_error_response, internal_error};
use crate::features::shared::Caller;
use crate::features::FeatureState;

pub fn enrollments_routes() -> Router<FeatureState> {
    Router::new().route("/enrollments", get(list_enrollments))
}

#[tracing::instrument(skip(state), fields(caller_id = %caller.0))]
async fn list_enrollments(
    State(state): State<FeatureState>,
    caller: Caller,
) -> Result<Response, ListEnrollmentsError> {
    let query = ListEnrollmentsQuery { caller_id: caller.0 };
    let enrollments = super::queries::list::handle(state.db, query).await?;
    Ok(ApiResponse::success(enrollments).into_response())
}

impl IntoResponse for ListEnrollmentsError {
    fn into_response(self) -> Response {
        match self {
            Self::Auth(e) => auth_error_response(&e),
            Self::Database(e) => internal_error("Database error while listing enrollments", &e),
        }
    }
}
