//! Account API routes
//!
//! - `POST /api/v1/accounts` - register (public)
//! - `POST /api/v1/accounts/activate` - activate with `{account_id, token}` (public)
//! - `GET /api/v1/accounts/activate?account_id=..&token=..` - the emailed link (public)
//! - `GET /api/v1/accounts/me` - the caller's account
//! - `PATCH /api/v1/accounts/me/profile` - update the caller's profile
//! - `GET /api/v1/accounts/me/dashboard` - role-specific dashboard
//! - `GET /api/v1/accounts/:id` - any account (admin)
//! - `PUT /api/v1/accounts/:id/role` - change a role (admin)

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use uuid::Uuid;

use super::commands::{
    ActivateAccountCommand, ActivateAccountError, ChangeRoleCommand, ChangeRoleError, RegisterAccountCommand,
    RegisterAccountError, UpdateProfileCommand, UpdateProfileError,
};
use super::queries::{DashboardError, DashboardQuery, GetAccountError, GetAccountQuery};
use crate::api::response::ApiResponse;
use crate::features::shared::error_helpers::{
    auth_error_response, conflict, internal_error, not_found, validation_error,
};
use crate::features::shared::Caller;
use crate::features::FeatureState;

pub fn accounts_routes() -> Router<FeatureState> {
    Router::new()
        .route("/accounts", post(register))
        .route("/accounts/activate", post(activate).get(activate_link))
        .route("/accounts/me", get(get_me))
        .route("/accounts/me/profile", patch(update_profile))
        .route("/accounts/me/dashboard", get(dashboard))
        .route("/accounts/:id", get(get_account))
        .route("/accounts/:id/role", put(change_role))
}

#[tracing::instrument(skip(state, command), fields(username = %command.username))]
async fn register(
    State(state): State<FeatureState>,
    Json(command): Json<RegisterAccountCommand>,
) -> Result<Response, AccountApiError> {
    let account = super::commands::register::handle(state, command).await?;
    Ok(ApiResponse::success(account).created())
}

#[tracing::instrument(skip(state, command), fields(account_id = %command.account_id))]
async fn activate(
    State(state): State<FeatureState>,
    Json(command): Json<ActivateAccountCommand>,
) -> Result<Response, AccountApiError> {
    let account = super::commands::activate::handle(state.db, command).await?;
    Ok(ApiResponse::success(account).into_response())
}

#[tracing::instrument(skip(state, command), fields(account_id = %command.account_id))]
async fn activate_link(
    State(state): State<FeatureState>,
    Query(command): Query<ActivateAccountCommand>,
) -> Result<Response, AccountApiError> {
    let account = super::commands::activate::handle(state.db, command).await?;
    Ok(ApiResponse::success(account).into_response())
}

#[tracing::instrument(skip(state), fields(caller_id = %caller.0))]
async fn get_me(State(state): State<FeatureState>, caller: Caller) -> Result<Response, AccountApiError> {
    let query = GetAccountQuery {
        caller_id: caller.0,
        account_id: None,
    };
    let view = super::queries::get::handle(state.db, query).await?;
    Ok(ApiResponse::success(view).into_response())
}

#[tracing::instrument(skip(state), fields(caller_id = %caller.0))]
async fn get_account(
    State(state): State<FeatureState>,
    caller: Caller,
    Path(account_id): Path<Uuid>,
) -> Result<Response, AccountApiError> {
    let query = GetAccountQuery {
        caller_id: caller.0,
        account_id: Some(account_id),
    };
    let view = super::queries::get::handle(state.db, query).await?;
    Ok(ApiResponse::success(view).into_response())
}

#[tracing::instrument(skip(state, command), fields(caller_id = %caller.0))]
async fn update_profile(
    State(state): State<FeatureState>,
    caller: Caller,
    Json(mut command): Json<UpdateProfileCommand>,
) -> Result<Response, AccountApiError> {
    command.caller_id = caller.0;
    let view = super::commands::update_profile::handle(state.db, command).await?;
    Ok(ApiResponse::success(view).into_response())
}

#[tracing::instrument(skip(state), fields(caller_id = %caller.0))]
async fn dashboard(State(state): State<FeatureState>, caller: Caller) -> Result<Response, AccountApiError> {
    let dashboard = super::queries::dashboard::handle(state.db, DashboardQuery { caller_id: caller.0 }).await?;
    Ok(ApiResponse::success(dashboard).into_response())
}

#[tracing::instrument(skip(state, command), fields(caller_id = %caller.0))]
async fn change_role(
    State(state): State<FeatureState>,
    caller: Caller,
    Path(account_id): Path<Uuid>,
    Json(mut command): Json<ChangeRoleCommand>,
) -> Result<Response, AccountApiError> {
    command.caller_id = caller.0;
    command.account_id = account_id;
    let account = super::commands::change_role::handle(state, command).await?;
    Ok(ApiResponse::success(account).into_response())
}

#[derive(Debug)]
enum AccountApiError {
    Register(RegisterAccountError),
    Activate(ActivateAccountError),
    ChangeRole(ChangeRoleError),
    UpdateProfile(UpdateProfileError),
    Get(GetAccountError),
    Dashboard(DashboardError),
}

impl From<RegisterAccountError> for AccountApiError {
    fn from(err: RegisterAccountError) -> Self {
        Self::Register(err)
    }
}

impl From<ActivateAccountError> for AccountApiError {
    fn from(err: ActivateAccountError) -> Self {
        Self::Activate(err)
    }
}

impl From<ChangeRoleError> for AccountApiError {
    fn from(err: ChangeRoleError) -> Self {
        Self::ChangeRole(err)
    }
}

impl From<UpdateProfileError> for AccountApiError {
    fn from(err: UpdateProfileError) -> Self {
        Self::UpdateProfile(err)
    }
}

impl From<GetAccountError> for AccountApiError {
    fn from(err: GetAccountError) -> Self {
        Self::Get(err)
    }
}

impl From<DashboardError> for AccountApiError {
    fn from(err: DashboardError) -> Self {
        Self::Dashboard(err)
    }
}

impl IntoResponse for AccountApiError {
    fn into_response(self) -> Response {
        match self {
            // Registration
            Self::Register(
                e @ (RegisterAccountError::EmailValidation(_)
                | RegisterAccountError::UsernameValidation(_)
                | RegisterAccountError::NameValidation(_)),
            ) => validation_error(e.to_string()),
            Self::Register(RegisterAccountError::Duplicate) => {
                conflict("An account with this email or username already exists")
            },
            Self::Register(RegisterAccountError::Event(e)) => internal_error("Registration reactions failed", &e),
            Self::Register(RegisterAccountError::Database(e)) => {
                internal_error("Database error during registration", &e)
            },

            // Activation
            Self::Activate(ActivateAccountError::InvalidLink) => validation_error("Invalid activation link"),
            Self::Activate(ActivateAccountError::Database(e)) => {
                internal_error("Database error during activation", &e)
            },

            // Role change
            Self::ChangeRole(ChangeRoleError::Auth(e)) => auth_error_response(&e),
            Self::ChangeRole(ChangeRoleError::NotFound(_)) => not_found("Account not found"),
            Self::ChangeRole(ChangeRoleError::Event(e)) => internal_error("Role change reactions failed", &e),
            Self::ChangeRole(ChangeRoleError::Database(e)) => {
                internal_error("Database error during role change", &e)
            },

            // Profile
            Self::UpdateProfile(UpdateProfileError::Auth(e)) => auth_error_response(&e),
            Self::UpdateProfile(
                e @ (UpdateProfileError::NameValidation(_)
                | UpdateProfileError::UrlValidation(_)
                | UpdateProfileError::BioLength),
            ) => validation_error(e.to_string()),
            Self::UpdateProfile(UpdateProfileError::Database(e)) => {
                internal_error("Database error during profile update", &e)
            },

            // Reads
            Self::Get(GetAccountError::Auth(e)) | Self::Dashboard(DashboardError::Auth(e)) => {
                auth_error_response(&e)
            },
            Self::Get(GetAccountError::NotFound(_)) => not_found("Account not found"),
            Self::Get(GetAccountError::Database(e)) | Self::Dashboard(DashboardError::Database(e)) => {
                internal_error("Database error while reading account", &e)
            },
        }
    }
}
