//! Shared helpers for observatory tests

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;

use crate::observatory::error::{ObservatoryError, ObservatoryResult};
use crate::observatory::requester::{HttpReply, ScanTransport};
use crate::observatory::types::ScanResult;

/// Transport that replays a fixed list of replies and records every URL
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<ObservatoryResult<HttpReply>>>,
    urls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<ObservatoryResult<HttpReply>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn from_replies(replies: Vec<HttpReply>) -> Self {
        Self::new(replies.into_iter().map(Ok).collect())
    }

    /// Every body is answered with HTTP 200
    pub fn from_bodies(bodies: &[&str]) -> Self {
        Self::from_replies(
            bodies
                .iter()
                .map(|body| HttpReply {
                    status: 200,
                    body: body.to_string(),
                })
                .collect(),
        )
    }

    pub fn from_json(values: Vec<Value>) -> Self {
        Self::from_replies(
            values
                .into_iter()
                .map(|value| HttpReply {
                    status: 200,
                    body: value.to_string(),
                })
                .collect(),
        )
    }

    pub fn calls(&self) -> usize {
        self.urls.lock().unwrap().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScanTransport for ScriptedTransport {
    async fn post(&self, url: &Url) -> ObservatoryResult<HttpReply> {
        self.urls.lock().unwrap().push(url.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(ObservatoryError::Transport {
                    url: url.to_string(),
                    message: "scripted transport has no replies left".to_string(),
                })
            })
    }
}

pub fn scan(value: Value) -> ScanResult {
    ScanResult::from_value(value).expect("scan fixtures must be JSON objects")
}
