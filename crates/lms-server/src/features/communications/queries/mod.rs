pub mod inbox;

pub use inbox::{InboxError, InboxQuery, InboxResponse};
