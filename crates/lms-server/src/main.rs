//! LMS Server - Main entry point

use anyhow::Result;
use lms_common::logging::{init_logging, LogConfig};
use std::sync::Arc;
use tracing::info;

use lms_server::{
    api,
    config::Config,
    db,
    features::{FeatureState, Settings},
    gateway::PaystackGateway,
    mail,
    storage::{self, config::StorageConfig},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with configuration from environment
    let log_config = LogConfig::builder()
        .log_file_prefix("lms-server".to_string())
        .filter_directives("lms_server=debug,tower_http=debug,sqlx=info".to_string())
        .build();

    // Environment variables take precedence
    let log_config = log_config.merge_env()?;

    init_logging(&log_config)?;

    info!("Starting LMS Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let pool = db::create_pool(&config.database).await?;
    db::run_migrations(&pool).await?;

    let storage_config = StorageConfig::from_env()?;
    let storage = storage::init(storage_config).await?;
    info!("Artifact storage initialized");

    let mailer = mail::build_mailer(&config.mail)?;
    let gateway = PaystackGateway::new(&config.gateway)?;

    let state = FeatureState {
        db: pool,
        storage,
        mailer,
        gateway: Arc::new(gateway),
        settings: Arc::new(Settings::from_config(&config)),
    };

    api::serve(&config, state).await
}
