//! Payment gateway adapter
//!
//! The gateway is an opaque HTTP service with two calls: `initialize` hands
//! back a hosted checkout URL, `verify` reports what happened to a
//! reference. [`PaystackGateway`] talks to Paystack's REST API with a
//! request timeout and a bounded retry on transport errors.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::GatewayConfig;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request never produced a usable answer (connect error, timeout, 5xx)
    #[error("Gateway unreachable: {0}")]
    Transport(String),

    /// The gateway answered and refused the request
    #[error("Gateway rejected the request: {0}")]
    Rejected(String),

    #[error("Unexpected gateway response: {0}")]
    InvalidResponse(String),
}

/// Parameters for starting a checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitializeRequest {
    pub email: String,
    /// Amount in minor units (kobo / cents)
    pub amount: i64,
    pub reference: String,
    pub callback_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Authorization {
    pub authorization_url: String,
    #[serde(default)]
    pub access_code: Option<String>,
}

/// The gateway's answer to a verify call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    /// Top-level `status` flag of the API response
    pub status: bool,
    /// `data.status` of the transaction, e.g. `success`, `failed`, `abandoned`
    pub transaction_status: Option<String>,
    pub message: Option<String>,
}

impl Verification {
    pub fn is_success(&self) -> bool {
        self.status && self.transaction_status.as_deref() == Some("success")
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initialize(&self, request: &InitializeRequest) -> Result<Authorization, GatewayError>;

    async fn verify(&self, reference: &str) -> Result<Verification, GatewayError>;
}

// ============================================================================
// Paystack
// ============================================================================

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct TransactionData {
    #[serde(default)]
    status: Option<String>,
}

#[derive(Clone)]
pub struct PaystackGateway {
    client: Client,
    base_url: String,
    secret_key: String,
    max_retries: u32,
    retry_backoff: Duration,
}

impl PaystackGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(500),
        })
    }

    /// Base delay between retries; attempt `n` waits `n × backoff`
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Send a request, retrying up to `max_retries` times.
    /// Any answer below 500 is returned with its status and body.
    /// `ConnectOnly` requests are retried only when no connection was made,
    /// since the gateway may already have acted on them.
    async fn send_with_retry<F>(&self, retry: Retry, build: F) -> Result<(StatusCode, String), GatewayError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0u32;
        loop {
            let (reason, retryable) = match build().bearer_auth(&self.secret_key).send().await {
                Ok(response) if response.status().is_server_error() => (
                    format!("gateway returned {}", response.status()),
                    retry == Retry::Idempotent,
                ),
                Ok(response) => {
                    let status = response.status();
                    match response.text().await {
                        Ok(body) => return Ok((status, body)),
                        Err(e) => (e.to_string(), retry == Retry::Idempotent),
                    }
                },
                Err(e) => {
                    let retryable = retry == Retry::Idempotent || e.is_connect();
                    (e.to_string(), retryable)
                },
            };

            if !retryable || attempt >= self.max_retries {
                return Err(GatewayError::Transport(reason));
            }
            attempt += 1;
            warn!(attempt, max_retries = self.max_retries, error = %reason, "Retrying gateway call");
            tokio::time::sleep(self.retry_backoff * attempt).await;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Retry {
    Idempotent,
    ConnectOnly,
}

fn parse_envelope<T: for<'de> Deserialize<'de>>(body: &str) -> Result<Envelope<T>, GatewayError> {
    serde_json::from_str(body).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    #[instrument(skip(self, request), fields(reference = %request.reference, amount = request.amount))]
    async fn initialize(&self, request: &InitializeRequest) -> Result<Authorization, GatewayError> {
        let url = format!("{}/transaction/initialize", self.base_url);
        let (status, body) = self
            .send_with_retry(Retry::ConnectOnly, || self.client.post(&url).json(request))
            .await?;

        debug!(%status, "Gateway initialize answered");

        let envelope: Envelope<Authorization> = parse_envelope(&body)?;
        match envelope.data {
            Some(authorization) if envelope.status => Ok(authorization),
            _ => Err(GatewayError::Rejected(
                envelope
                    .message
                    .unwrap_or_else(|| format!("initialize returned {}", status)),
            )),
        }
    }

    #[instrument(skip(self))]
    async fn verify(&self, reference: &str) -> Result<Verification, GatewayError> {
        let url = format!("{}/transaction/verify/{}", self.base_url, reference);
        let (status, body) = self.send_with_retry(Retry::Idempotent, || self.client.get(&url)).await?;

        debug!(%status, "Gateway verify answered");

        let envelope: Envelope<TransactionData> = parse_envelope(&body)?;
        Ok(Verification {
            status: envelope.status,
            transaction_status: envelope.data.and_then(|d| d.status),
            message: envelope.message,
        })
    }
}
