//! Artifact storage
//!
//! Generated files are addressed by a relative key such as
//! `certificates/cert_<id>.pdf`; the key doubles as the reference persisted
//! on the owning row.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::{config::Region, primitives::ByteStream, Client};
use std::{
    path::{Component, Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, info, instrument};

pub mod config;

use config::{StorageBackend, StorageConfig};

/// Byte store for generated artifacts
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store `data` under `key`, replacing anything already there.
    /// Returns the reference to persist.
    async fn write(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<String>;

    /// Fetch an artifact; `Ok(None)` when nothing is stored under the reference
    async fn read(&self, reference: &str) -> Result<Option<Vec<u8>>>;

    async fn exists(&self, reference: &str) -> Result<bool>;
}

/// Build the configured backend
pub async fn init(config: StorageConfig) -> Result<Arc<dyn ArtifactStore>> {
    match config.backend {
        StorageBackend::S3 => Ok(Arc::new(S3Storage::new(config).await?)),
        StorageBackend::Local => Ok(Arc::new(LocalStorage::new(config.local_root))),
    }
}

// ============================================================================
// S3 / MinIO
// ============================================================================

#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    pub async fn new(config: StorageConfig) -> Result<Self> {
        debug!(
            bucket = %config.bucket,
            region = %config.region,
            endpoint = ?config.endpoint,
            path_style = config.path_style,
            "Initializing S3 storage"
        );

        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "lms-storage",
        );

        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .force_path_style(config.path_style);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(builder.build());

        info!("Storage client initialized for bucket: {}", config.bucket);

        Ok(Self {
            client,
            bucket: config.bucket,
        })
    }
}

#[async_trait]
impl ArtifactStore for S3Storage {
    #[instrument(skip(self, data))]
    async fn write(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<String> {
        debug!("Uploading {} bytes to s3://{}/{}", data.len(), self.bucket, key);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .context("Failed to upload to S3")?;

        info!("Successfully uploaded to s3://{}/{}", self.bucket, key);
        Ok(key.to_string())
    }

    #[instrument(skip(self))]
    async fn read(&self, reference: &str) -> Result<Option<Vec<u8>>> {
        let response = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(reference)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_key()) => {
                return Ok(None)
            },
            Err(e) => {
                return Err(e).context(format!("Failed to download from S3: {}", reference))
            },
        };

        let data = response
            .body
            .collect()
            .await
            .context("Failed to read S3 response body")?
            .into_bytes()
            .to_vec();

        debug!("Downloaded {} bytes from s3://{}/{}", data.len(), self.bucket, reference);
        Ok(Some(data))
    }

    #[instrument(skip(self))]
    async fn exists(&self, reference: &str) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(reference)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => Err(e).context("Failed to check S3 object existence"),
        }
    }
}

// ============================================================================
// Local filesystem
// ============================================================================

/// Stores artifacts under a root directory (development and single-node setups)
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a key below the root, refusing absolute paths and `..`
    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        if key.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            bail!("Invalid artifact key: '{}'", key);
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ArtifactStore for LocalStorage {
    #[instrument(skip(self, data))]
    async fn write(&self, key: &str, data: Vec<u8>, _content_type: &str) -> Result<String> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&path, data)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        debug!(path = %path.display(), "Artifact written");
        Ok(key.to_string())
    }

    #[instrument(skip(self))]
    async fn read(&self, reference: &str) -> Result<Option<Vec<u8>>> {
        let path = self.resolve(reference)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    #[instrument(skip(self))]
    async fn exists(&self, reference: &str) -> Result<bool> {
        let path = self.resolve(reference)?;
        Ok(tokio::fs::try_exists(&path).await.unwrap_or(false))
    }
}
