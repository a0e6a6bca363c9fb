pub mod verify;

pub use verify::{VerifiedCertificate, VerifyCertificateError, VerifyCertificateQuery, VerifyCertificateResponse};
