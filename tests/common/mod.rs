//! Common test utilities and helpers
//!
//! A fake Observatory endpoint that answers from a queue of scan payloads.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;

use observatory_watch::observatory::api::{
    HttpReply, ObservatoryError, ObservatoryResult, ScanTransport,
};

pub struct FakeObservatory {
    answers: Mutex<VecDeque<Value>>,
    requests: Mutex<Vec<Url>>,
}

impl FakeObservatory {
    pub fn new(answers: Vec<Value>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, answer: Value) {
        self.answers.lock().unwrap().push_back(answer);
    }

    pub fn requests(&self) -> Vec<Url> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScanTransport for FakeObservatory {
    async fn post(&self, url: &Url) -> ObservatoryResult<HttpReply> {
        self.requests.lock().unwrap().push(url.clone());
        match self.answers.lock().unwrap().pop_front() {
            Some(answer) => Ok(HttpReply {
                status: 200,
                body: answer.to_string(),
            }),
            None => Err(ObservatoryError::Transport {
                url: url.to_string(),
                message: "connection refused".to_string(),
            }),
        }
    }
}

/// A finished scan as the MDN endpoint reports it
pub fn mdn_scan(score: i64, grade: &str) -> Value {
    serde_json::json!({
        "id": 53621004,
        "details_url": "https://developer.mozilla.org/en-US/observatory/analyze?host=example.com",
        "algorithm_version": 4,
        "scanned_at": "2024-10-22T22:53:21.572Z",
        "error": null,
        "grade": grade,
        "score": score,
        "status_code": 200,
        "tests_failed": 4,
        "tests_passed": 6,
        "tests_quantity": 10
    })
}
