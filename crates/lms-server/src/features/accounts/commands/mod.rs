pub mod activate;
pub mod change_role;
pub mod register;
pub mod update_profile;

pub use activate::{ActivateAccountCommand, ActivateAccountError};
pub use change_role::{ChangeRoleCommand, ChangeRoleError};
pub use register::{RegisterAccountCommand, RegisterAccountError};
pub use update_profile::{UpdateProfileCommand, UpdateProfileError};
