pub mod commands;
pub mod fan_out;
pub mod queries;
pub mod routes;

pub use commands::{
    CreateAnnouncementCommand, CreateAnnouncementError, CreateAnnouncementResponse, MarkAllReadCommand,
    MarkReadCommand, MarkReadError, MarkReadResponse,
};
pub use queries::{InboxError, InboxQuery, InboxResponse};
pub use routes::communications_routes;
