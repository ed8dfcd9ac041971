//! Change events handed to sinks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::observatory::types::{ApiVariant, ScanResult};

/// A terminal scan result that passed change detection.
///
/// `payload` is the API document exactly as received; the other fields say
/// where and when it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub site: String,
    pub variant: ApiVariant,
    pub created_at: DateTime<Utc>,
    pub payload: ScanResult,
}

impl ChangeEvent {
    pub fn new(site: &str, variant: ApiVariant, created_at: DateTime<Utc>, payload: ScanResult) -> Self {
        Self {
            site: site.to_string(),
            variant,
            created_at,
            payload,
        }
    }

    /// Single-line JSON encoding used by the stream and webhook sinks
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
