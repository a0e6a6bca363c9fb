//! Configuration management
//!
//! Everything is read from the environment (after loading `.env` through
//! `dotenvy`) with the defaults below. Object storage has its own
//! [`StorageConfig`](crate::storage::config::StorageConfig).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default externally visible base URL, used in emails and gateway callbacks.
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://127.0.0.1:8000";

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/lms";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default database idle timeout in seconds (10 minutes).
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

/// Default CORS allowed origin for local development.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "http://localhost:3000";

/// Default sender address for outgoing mail.
pub const DEFAULT_FROM_EMAIL: &str = "ApiLearn <no-reply@apilearn.com>";

/// Default SMTP submission port.
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Default payment gateway API root.
pub const DEFAULT_PAYSTACK_BASE_URL: &str = "https://api.paystack.co";

/// Default gateway request timeout in seconds.
pub const DEFAULT_PAYSTACK_TIMEOUT_SECS: u64 = 15;

/// Default number of retries on gateway transport errors.
pub const DEFAULT_PAYSTACK_MAX_RETRIES: u32 = 2;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub mail: MailConfig,
    pub gateway: GatewayConfig,
    pub quiz: QuizConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
    /// Base URL clients reach the server on (no trailing slash)
    pub public_base_url: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

/// Which mail transport to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailBackend {
    Smtp,
    /// Write messages to the log instead of sending them
    Log,
}

impl FromStr for MailBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "smtp" => Ok(MailBackend::Smtp),
            "log" | "console" => Ok(MailBackend::Log),
            other => Err(anyhow::anyhow!("Invalid mail backend: {}", other)),
        }
    }
}

/// Outgoing mail configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub backend: MailBackend,
    pub from_email: String,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    #[serde(skip_serializing)]
    pub smtp_password: Option<String>,
    /// Plain connection without TLS (local relays such as MailHog)
    pub smtp_insecure: bool,
}

/// Payment gateway configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(skip_serializing)]
    pub secret_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("backend", &self.backend)
            .field("from_email", &self.from_email)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &self.smtp_password.as_ref().map(|_| REDACTED))
            .field("smtp_insecure", &self.smtp_insecure)
            .finish()
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("secret_key", &REDACTED)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

const REDACTED: &str = "[redacted]";

/// Quiz retake policy; `None` means unlimited / no cooldown
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuizConfig {
    pub max_attempts: Option<u32>,
    pub retry_cooldown_secs: Option<u64>,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_opt<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let mail_backend = match std::env::var("MAIL_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => MailBackend::Log,
        };

        let config = Config {
            server: ServerConfig {
                host: env_string("LMS_HOST", DEFAULT_SERVER_HOST),
                port: env_or("LMS_PORT", DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: env_or("LMS_SHUTDOWN_TIMEOUT", DEFAULT_SHUTDOWN_TIMEOUT_SECS),
                public_base_url: env_string("LMS_PUBLIC_BASE_URL", DEFAULT_PUBLIC_BASE_URL)
                    .trim_end_matches('/')
                    .to_string(),
            },
            database: DatabaseConfig {
                url: env_string("DATABASE_URL", DEFAULT_DATABASE_URL),
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", DEFAULT_DATABASE_MAX_CONNECTIONS),
                min_connections: env_or("DATABASE_MIN_CONNECTIONS", DEFAULT_DATABASE_MIN_CONNECTIONS),
                connect_timeout_secs: env_or(
                    "DATABASE_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                ),
                idle_timeout_secs: env_or("DATABASE_IDLE_TIMEOUT", DEFAULT_DATABASE_IDLE_TIMEOUT_SECS),
            },
            cors: CorsConfig {
                allowed_origins: env_string("CORS_ALLOWED_ORIGINS", DEFAULT_CORS_ALLOWED_ORIGIN)
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                allow_credentials: env_or("CORS_ALLOW_CREDENTIALS", true),
            },
            mail: MailConfig {
                backend: mail_backend,
                from_email: env_string("DEFAULT_FROM_EMAIL", DEFAULT_FROM_EMAIL),
                smtp_host: std::env::var("SMTP_HOST").ok(),
                smtp_port: env_or("SMTP_PORT", DEFAULT_SMTP_PORT),
                smtp_username: std::env::var("SMTP_USERNAME").ok(),
                smtp_password: std::env::var("SMTP_PASSWORD").ok(),
                smtp_insecure: env_or("SMTP_INSECURE", false),
            },
            gateway: GatewayConfig {
                secret_key: env_string("PAYSTACK_SECRET_KEY", ""),
                base_url: env_string("PAYSTACK_BASE_URL", DEFAULT_PAYSTACK_BASE_URL)
                    .trim_end_matches('/')
                    .to_string(),
                timeout_secs: env_or("PAYSTACK_TIMEOUT_SECS", DEFAULT_PAYSTACK_TIMEOUT_SECS),
                max_retries: env_or("PAYSTACK_MAX_RETRIES", DEFAULT_PAYSTACK_MAX_RETRIES),
            },
            quiz: QuizConfig {
                max_attempts: env_opt("QUIZ_MAX_ATTEMPTS"),
                retry_cooldown_secs: env_opt("QUIZ_RETRY_COOLDOWN_SECS"),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if !self.server.public_base_url.starts_with("http://")
            && !self.server.public_base_url.starts_with("https://")
        {
            anyhow::bail!(
                "Public base URL must start with http:// or https:// (got '{}')",
                self.server.public_base_url
            );
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.cors.allowed_origins.is_empty() {
            tracing::warn!("No CORS origins configured - all origins will be allowed");
        }

        if self.mail.from_email.trim().is_empty() {
            anyhow::bail!("DEFAULT_FROM_EMAIL cannot be empty");
        }

        if self.mail.backend == MailBackend::Smtp && self.mail.smtp_host.is_none() {
            anyhow::bail!("SMTP_HOST is required when MAIL_BACKEND=smtp");
        }

        if self.gateway.secret_key.is_empty() {
            tracing::warn!("PAYSTACK_SECRET_KEY is not set - paid enrollments will fail");
        }

        if self.gateway.timeout_secs == 0 {
            anyhow::bail!("PAYSTACK_TIMEOUT_SECS must be greater than 0");
        }

        if self.quiz.max_attempts == Some(0) {
            anyhow::bail!("QUIZ_MAX_ATTEMPTS must be greater than 0 when set");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
            },
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
                allow_credentials: true,
            },
            mail: MailConfig {
                backend: MailBackend::Log,
                from_email: DEFAULT_FROM_EMAIL.to_string(),
                smtp_host: None,
                smtp_port: DEFAULT_SMTP_PORT,
                smtp_username: None,
                smtp_password: None,
                smtp_insecure: false,
            },
            gateway: GatewayConfig {
                secret_key: String::new(),
                base_url: DEFAULT_PAYSTACK_BASE_URL.to_string(),
                timeout_secs: DEFAULT_PAYSTACK_TIMEOUT_SECS,
                max_retries: DEFAULT_PAYSTACK_MAX_RETRIES,
            },
            quiz: QuizConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_pool_inversion() {
        let mut config = Config::default();
        config.database.min_connections = 20;
        config.database.max_connections = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_smtp_backend_requires_host() {
        let mut config = Config::default();
        config.mail.backend = MailBackend::Smtp;
        assert!(config.validate().is_err());

        config.mail.smtp_host = Some("smtp.example.com".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_relative_public_base_url() {
        let mut config = Config::default();
        config.server.public_base_url = "apilearn.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_attempt_limit_rejected() {
        let mut config = Config::default();
        config.quiz.max_attempts = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mail_backend_parse() {
        assert_eq!("SMTP".parse::<MailBackend>().unwrap(), MailBackend::Smtp);
        assert_eq!("console".parse::<MailBackend>().unwrap(), MailBackend::Log);
        assert!("pigeon".parse::<MailBackend>().is_err());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let mut config = Config::default();
        config.gateway.secret_key = "sk_live_TOPSECRET".to_string();
        config.mail.smtp_password = Some("hunter2-smtp".to_string());

        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk_live_TOPSECRET"));
        assert!(!rendered.contains("hunter2-smtp"));
        assert!(rendered.contains("api.paystack.co"));
    }
}
