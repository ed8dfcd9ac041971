//! Observatory data types
//!
//! A scan result is kept as the JSON object the API returned. Only a handful of
//! fields drive the poll and change-detection logic; everything else is carried
//! through to emitted events untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// HTTP-style status code the API reports for a completed scan
pub const SUCCESS_STATUS_CODE: u64 = 200;

/// `state` value the analyze endpoint reports while a scan is queued
pub const PENDING_STATE: &str = "PENDING";

/// `error` value the scan endpoint reports when its backing store is down
pub const DATABASE_DOWN: &str = "database-down";

/// Which generation of the Observatory API to talk to
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(ascii_case_insensitive)]
pub enum ApiVariant {
    /// `POST /api/v2/scan?host=`; finished when `status_code` is 200
    #[default]
    #[strum(to_string = "legacy-v1", serialize = "v1")]
    LegacyV1,
    /// `POST /api/v1/analyze?host=&hidden=&rescan=`; finished when `state` is not PENDING
    #[strum(to_string = "current-v2", serialize = "v2")]
    CurrentV2,
}

impl ApiVariant {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ApiVariant::LegacyV1 => "https://observatory-api.mdn.mozilla.net",
            ApiVariant::CurrentV2 => "https://http-observatory.security.mozilla.org",
        }
    }

    pub fn endpoint_path(&self) -> &'static str {
        match self {
            ApiVariant::LegacyV1 => "/api/v2/scan",
            ApiVariant::CurrentV2 => "/api/v1/analyze",
        }
    }

    /// Whether `hidden` and `rescan` are sent to (and validated for) this API
    pub fn supports_scan_flags(&self) -> bool {
        matches!(self, ApiVariant::CurrentV2)
    }

    /// Whether the remote scan behind `result` has finished
    pub fn is_terminal(&self, result: &ScanResult) -> bool {
        match self {
            ApiVariant::LegacyV1 => result.is_success(),
            ApiVariant::CurrentV2 => result.state() != Some(PENDING_STATE),
        }
    }
}

/// One scan document as returned by the API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanResult(Map<String, Value>);

impl ScanResult {
    /// Parse a response body. Anything other than a JSON object is rejected.
    pub fn from_json_str(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    /// Wrap an already parsed value; `None` unless it is an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn status_code(&self) -> Option<u64> {
        self.0.get("status_code").and_then(Value::as_u64)
    }

    pub fn is_success(&self) -> bool {
        self.status_code() == Some(SUCCESS_STATUS_CODE)
    }

    /// Raw score value, `null` and absent are kept apart
    pub fn score(&self) -> Option<&Value> {
        self.0.get("score")
    }

    /// Numeric scores compare by value (`80` equals `80.0`); anything else
    /// compares structurally, so `null` and absent differ.
    pub fn score_differs(&self, other: &ScanResult) -> bool {
        match (
            self.score().and_then(Value::as_f64),
            other.score().and_then(Value::as_f64),
        ) {
            (Some(ours), Some(theirs)) => ours != theirs,
            _ => self.score() != other.score(),
        }
    }

    pub fn grade(&self) -> Option<&str> {
        self.0.get("grade").and_then(Value::as_str)
    }

    pub fn state(&self) -> Option<&str> {
        self.0.get("state").and_then(Value::as_str)
    }

    pub fn error(&self) -> Option<&str> {
        self.0.get("error").and_then(Value::as_str)
    }

    pub fn is_database_down(&self) -> bool {
        self.error() == Some(DATABASE_DOWN)
    }

    /// Short human readable description for log lines
    pub fn summary(&self) -> String {
        let field = |v: Option<&Value>| v.map_or_else(|| "-".to_string(), Value::to_string);
        format!(
            "status_code={} state={} grade={} score={}",
            self.status_code()
                .map_or_else(|| "-".to_string(), |c| c.to_string()),
            self.state().unwrap_or("-"),
            self.grade().unwrap_or("-"),
            field(self.score())
        )
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for ScanResult {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
