pub mod commands;
pub mod issue;
pub mod queries;
pub mod render;
pub mod routes;

pub use commands::{CertificateFile, DownloadCertificateCommand, DownloadCertificateError};
pub use issue::{issue, IssueError, IssueOutcome};
pub use queries::{VerifyCertificateError, VerifyCertificateQuery, VerifyCertificateResponse};
pub use routes::certificates_routes;
