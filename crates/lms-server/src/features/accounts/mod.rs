pub mod commands;
pub mod queries;
pub mod routes;

pub use commands::{
    ActivateAccountCommand, ActivateAccountError, ChangeRoleCommand, ChangeRoleError, RegisterAccountCommand,
    RegisterAccountError, UpdateProfileCommand, UpdateProfileError,
};
pub use queries::{AccountView, Dashboard, DashboardError, DashboardQuery, GetAccountError, GetAccountQuery};
pub use routes::accounts_routes;
