//! Event sink implementations

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use crate::notifications::error::NotificationError;
use crate::notifications::event::ChangeEvent;
use crate::notifications::traits::{EventSink, SinkStatistics};

fn encode(event: &ChangeEvent) -> Result<String, NotificationError> {
    event
        .to_json_line()
        .map_err(|e| NotificationError::Serialization(e.to_string()))
}

/// Writes one JSON line per event to standard output
#[derive(Default)]
pub struct StdoutSink {
    stats: SinkStatistics,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventSink for StdoutSink {
    async fn create_event(&self, event: &ChangeEvent) -> Result<(), NotificationError> {
        let result = async {
            let mut line = encode(event)?;
            line.push('\n');
            let io_error = |e: std::io::Error| NotificationError::Io {
                target: "stdout".to_string(),
                message: e.to_string(),
            };
            let mut stdout = tokio::io::stdout();
            stdout.write_all(line.as_bytes()).await.map_err(io_error)?;
            stdout.flush().await.map_err(io_error)
        }
        .await;
        self.stats.track(result)
    }

    fn sink_id(&self) -> &str {
        "stdout"
    }

    fn statistics(&self) -> &SinkStatistics {
        &self.stats
    }
}

/// Appends one JSON line per event to a file
pub struct JsonLinesFileSink {
    path: PathBuf,
    id: String,
    stats: SinkStatistics,
}

impl JsonLinesFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            id: format!("file:{}", path.display()),
            path,
            stats: SinkStatistics::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, line: &str) -> Result<(), NotificationError> {
        let io_error = |e: std::io::Error| NotificationError::Io {
            target: self.path.display().to_string(),
            message: e.to_string(),
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(io_error)?;
        file.write_all(line.as_bytes()).await.map_err(io_error)?;
        file.write_all(b"\n").await.map_err(io_error)?;
        file.flush().await.map_err(io_error)
    }
}

#[async_trait]
impl EventSink for JsonLinesFileSink {
    async fn create_event(&self, event: &ChangeEvent) -> Result<(), NotificationError> {
        let result = match encode(event) {
            Ok(line) => self.append(&line).await,
            Err(e) => Err(e),
        };
        self.stats.track(result)
    }

    fn sink_id(&self) -> &str {
        &self.id
    }

    fn statistics(&self) -> &SinkStatistics {
        &self.stats
    }
}

/// POSTs each event as JSON to a URL; any non-2xx answer is a failure
pub struct WebhookSink {
    url: String,
    id: String,
    client: reqwest::Client,
    stats: SinkStatistics,
}

impl WebhookSink {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotificationError::Http {
                url: url.to_string(),
                status: None,
                message: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self {
            url: url.to_string(),
            id: format!("webhook:{}", url),
            client,
            stats: SinkStatistics::new(),
        })
    }

    async fn deliver(&self, body: String) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| NotificationError::Http {
                url: self.url.clone(),
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotificationError::Http {
                url: self.url.clone(),
                status: Some(status.as_u16()),
                message: status.canonical_reason().unwrap_or("Unknown error").to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl EventSink for WebhookSink {
    async fn create_event(&self, event: &ChangeEvent) -> Result<(), NotificationError> {
        let result = match encode(event) {
            Ok(body) => self.deliver(body).await,
            Err(e) => Err(e),
        };
        self.stats.track(result)
    }

    fn sink_id(&self) -> &str {
        &self.id
    }

    fn statistics(&self) -> &SinkStatistics {
        &self.stats
    }
}

/// Forwards events into an in-process channel
pub struct ChannelSink {
    sender: mpsc::Sender<ChangeEvent>,
    stats: SinkStatistics,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ChangeEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                sender,
                stats: SinkStatistics::new(),
            },
            receiver,
        )
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn create_event(&self, event: &ChangeEvent) -> Result<(), NotificationError> {
        let result = self
            .sender
            .send(event.clone())
            .await
            .map_err(|_| NotificationError::ChannelClosed(self.sink_id().to_string()));
        self.stats.track(result)
    }

    fn sink_id(&self) -> &str {
        "channel"
    }

    fn statistics(&self) -> &SinkStatistics {
        &self.stats
    }
}

/// Delivers every event to each inner sink in order.
///
/// Delivery continues past a failing sink. The event counts as delivered
/// when at least one sink accepted it; failures are logged.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
    stats: SinkStatistics,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self {
            sinks,
            stats: SinkStatistics::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl EventSink for FanoutSink {
    async fn create_event(&self, event: &ChangeEvent) -> Result<(), NotificationError> {
        let mut failed_sinks = Vec::new();
        for sink in &self.sinks {
            if let Err(e) = sink.create_event(event).await {
                log::error!("Sink {} failed: {}", sink.sink_id(), e);
                failed_sinks.push(sink.sink_id().to_string());
            }
        }

        let result = if failed_sinks.is_empty() {
            Ok(())
        } else if failed_sinks.len() < self.sinks.len() {
            log::warn!(
                "Event for {} delivered to {} of {} sinks",
                event.site,
                self.sinks.len() - failed_sinks.len(),
                self.sinks.len()
            );
            Ok(())
        } else {
            Err(NotificationError::DeliveryFailed { failed_sinks })
        };
        self.stats.track(result)
    }

    fn sink_id(&self) -> &str {
        "fanout"
    }

    fn statistics(&self) -> &SinkStatistics {
        &self.stats
    }
}
