pub mod download;

pub use download::{CertificateFile, DownloadCertificateCommand, DownloadCertificateError};
