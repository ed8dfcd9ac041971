//! Scan requests against the Observatory API
//!
//! The HTTP layer sits behind [`ScanTransport`] so the poll loop and change
//! detection can be driven by scripted responses in tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;

use crate::core::validation::ValidationError;
use crate::observatory::error::{ObservatoryError, ObservatoryResult};
use crate::observatory::options::AgentConfig;
use crate::observatory::types::{ApiVariant, ScanResult};

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// Status and body of one HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

/// Issues a body-less POST and hands back the raw reply
#[async_trait]
pub trait ScanTransport: Send + Sync {
    async fn post(&self, url: &Url) -> ObservatoryResult<HttpReply>;
}

/// Production transport built on reqwest with rustls
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> ObservatoryResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("observatory-watch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ObservatoryError::Transport {
                url: String::new(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ScanTransport for ReqwestTransport {
    async fn post(&self, url: &Url) -> ObservatoryResult<HttpReply> {
        let transport_error = |e: reqwest::Error| ObservatoryError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self
            .client
            .post(url.clone())
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_error)?;

        Ok(HttpReply { status, body })
    }
}

/// Builds the scan URL for one site and performs single scan requests
#[derive(Clone)]
pub struct ScanRequester {
    config: AgentConfig,
    transport: Arc<dyn ScanTransport>,
}

impl ScanRequester {
    pub fn new(config: AgentConfig, transport: Arc<dyn ScanTransport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Endpoint URL including the query string for the configured site
    pub fn scan_url(&self) -> ObservatoryResult<Url> {
        let variant = self.config.variant;
        let raw = format!("{}{}", self.config.api_base_url, variant.endpoint_path());
        let mut url = Url::parse(&raw).map_err(|e| {
            ValidationError::new(&format!("Cannot build scan URL from '{}': {}", raw, e))
        })?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("host", &self.config.site);
            if variant.supports_scan_flags() {
                query.append_pair("hidden", &self.config.hidden.to_string());
                query.append_pair("rescan", &self.config.rescan.to_string());
            }
        }

        Ok(url)
    }

    /// Issue one scan request and parse the reply.
    ///
    /// The HTTP status is logged but not interpreted; the API reports scan
    /// progress in the body.
    pub async fn request(&self) -> ObservatoryResult<ScanResult> {
        let url = self.scan_url()?;
        log::debug!("POST {}", url);

        let reply = self.transport.post(&url).await?;
        log::info!("request status : {}", reply.status);

        let payload = ScanResult::from_json_str(&reply.body).map_err(|e| {
            ObservatoryError::MalformedResponse {
                status: reply.status,
                message: e.to_string(),
            }
        })?;

        if self.config.debug {
            log::info!(
                "payload: {}",
                serde_json::to_string(&payload).unwrap_or_else(|_| payload.summary())
            );
        }

        if self.config.variant == ApiVariant::LegacyV1 && payload.is_database_down() {
            log::error!("Unable to connect to database");
            return Err(ObservatoryError::DatabaseDown);
        }

        Ok(payload)
    }
}
