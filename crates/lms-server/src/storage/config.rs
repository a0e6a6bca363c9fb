use serde::{Deserialize, Serialize};
use std::{env, fmt, path::PathBuf, str::FromStr};

/// Where generated artifacts (certificate PDFs) are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Local,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s3" | "minio" => Ok(StorageBackend::S3),
            "local" | "fs" => Ok(StorageBackend::Local),
            other => Err(anyhow::anyhow!("Invalid storage backend: {}", other)),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub endpoint: Option<String>,
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    #[serde(skip_serializing)]
    pub secret_key: String,
    pub path_style: bool,
    /// Root directory for the local backend
    pub local_root: PathBuf,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("backend", &self.backend)
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("access_key", &REDACTED)
            .field("secret_key", &REDACTED)
            .field("path_style", &self.path_style)
            .field("local_root", &self.local_root)
            .finish()
    }
}

const REDACTED: &str = "[redacted]";

impl StorageConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => StorageBackend::Local,
        };

        Ok(Self {
            backend,
            endpoint: env::var("S3_ENDPOINT").ok(),
            region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            bucket: env::var("S3_BUCKET").unwrap_or_else(|_| "lms-media".to_string()),
            access_key: env::var("S3_ACCESS_KEY")
                .or_else(|_| env::var("AWS_ACCESS_KEY_ID"))
                .unwrap_or_else(|_| "minioadmin".to_string()),
            secret_key: env::var("S3_SECRET_KEY")
                .or_else(|_| env::var("AWS_SECRET_ACCESS_KEY"))
                .unwrap_or_else(|_| "minioadmin".to_string()),
            path_style: env::var("S3_PATH_STYLE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            local_root: env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./media")),
        })
    }

    pub fn for_minio(endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            backend: StorageBackend::S3,
            endpoint: Some(endpoint.into()),
            region: "us-east-1".to_string(),
            bucket: bucket.into(),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            path_style: true,
            local_root: PathBuf::from("./media"),
        }
    }

    pub fn for_local(root: impl Into<PathBuf>) -> Self {
        Self {
            backend: StorageBackend::Local,
            endpoint: None,
            region: "us-east-1".to_string(),
            bucket: String::new(),
            access_key: String::new(),
            secret_key: String::new(),
            path_style: false,
            local_root: root.into(),
        }
    }
}
