//! Last-known scan result storage
//!
//! One slot per agent instance, no history. The check cycle reads it before
//! deciding and writes it afterwards; nothing else touches it.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::core::version::state_format_version;
use crate::observatory::error::{ObservatoryError, ObservatoryResult};
use crate::observatory::types::ScanResult;

#[async_trait]
pub trait StateStore: Send + Sync {
    /// Last stored result, `None` before the first accepted cycle
    async fn load(&self) -> ObservatoryResult<Option<ScanResult>>;

    /// Replace the stored result
    async fn save(&self, result: &ScanResult) -> ObservatoryResult<()>;
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    slot: Mutex<Option<ScanResult>>,
    writes: AtomicUsize,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(result: ScanResult) -> Self {
        Self {
            slot: Mutex::new(Some(result)),
            writes: AtomicUsize::new(0),
        }
    }

    /// Number of `save` calls so far
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    pub async fn snapshot(&self) -> Option<ScanResult> {
        self.slot.lock().await.clone()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> ObservatoryResult<Option<ScanResult>> {
        Ok(self.slot.lock().await.clone())
    }

    async fn save(&self, result: &ScanResult) -> ObservatoryResult<()> {
        *self.slot.lock().await = Some(result.clone());
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    format: u32,
    site: String,
    last_status: ScanResult,
}

/// Store backed by a small JSON document on disk.
///
/// Writes go to a sibling temp file that is then renamed over the target, so
/// a crash mid-write leaves the previous state intact.
#[derive(Debug, Clone)]
pub struct JsonFileStateStore {
    path: PathBuf,
    site: String,
}

impl JsonFileStateStore {
    pub fn new(path: impl Into<PathBuf>, site: &str) -> Self {
        Self {
            path: path.into(),
            site: site.to_string(),
        }
    }

    /// `<data dir>/ObservatoryWatch/<site>.json`
    pub fn default_path(site: &str) -> Option<PathBuf> {
        let file_name = format!("{}.json", site.replace([':', '/', '\\'], "_"));
        dirs::data_dir().map(|d| d.join("ObservatoryWatch").join(file_name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn state_error(&self, action: &str, cause: impl std::fmt::Display) -> ObservatoryError {
        ObservatoryError::State {
            message: format!("Failed to {} {}: {}", action, self.path.display(), cause),
        }
    }
}

#[async_trait]
impl StateStore for JsonFileStateStore {
    async fn load(&self) -> ObservatoryResult<Option<ScanResult>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.state_error("read", e)),
        };

        let file: StateFile =
            serde_json::from_str(&contents).map_err(|e| self.state_error("parse", e))?;

        if file.site != self.site {
            log::warn!(
                "State file {} belongs to '{}', not '{}'; starting fresh",
                self.path.display(),
                file.site,
                self.site
            );
            return Ok(None);
        }
        if file.format != state_format_version() {
            log::debug!(
                "State file format {} differs from current {}",
                file.format,
                state_format_version()
            );
        }

        Ok(Some(file.last_status))
    }

    async fn save(&self, result: &ScanResult) -> ObservatoryResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.state_error("create directory for", e))?;
        }

        let file = StateFile {
            format: state_format_version(),
            site: self.site.clone(),
            last_status: result.clone(),
        };
        let contents =
            serde_json::to_string_pretty(&file).map_err(|e| self.state_error("serialize", e))?;

        let mut tmp_name = self.path.clone().into_os_string();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        tokio::fs::write(&tmp_path, contents)
            .await
            .map_err(|e| self.state_error("write", e))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| self.state_error("replace", e))?;

        log::debug!("Stored last status in {}", self.path.display());
        Ok(())
    }
}
