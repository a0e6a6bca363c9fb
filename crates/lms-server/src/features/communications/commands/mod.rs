pub mod announce;
pub mod mark_read;

pub use announce::{CreateAnnouncementCommand, CreateAnnouncementError, CreateAnnouncementResponse};
pub use mark_read::{MarkAllReadCommand, MarkReadCommand, MarkReadError, MarkReadResponse};
