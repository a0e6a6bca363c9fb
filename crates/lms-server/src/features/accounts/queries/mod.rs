pub mod dashboard;
pub mod get;

pub use dashboard::{Dashboard, DashboardError, DashboardQuery};
pub use get::{AccountView, GetAccountError, GetAccountQuery};
