//! Tests for event delivery

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::json;

use crate::notifications::api::*;
use crate::observatory::types::{ApiVariant, ScanResult};

fn sample_event(score: i64) -> ChangeEvent {
    let payload = ScanResult::from_value(json!({
        "id": 53621004,
        "details_url": "https://developer.mozilla.org/en-US/observatory/analyze?host=example.com",
        "algorithm_version": 4,
        "scanned_at": "2024-10-22T22:53:21.572Z",
        "error": null,
        "grade": "D",
        "score": score,
        "status_code": 200,
        "tests_failed": 4,
        "tests_passed": 6,
        "tests_quantity": 10
    }))
    .unwrap();
    ChangeEvent::new(
        "example.com",
        ApiVariant::LegacyV1,
        Utc.with_ymd_and_hms(2024, 10, 22, 22, 54, 0).unwrap(),
        payload,
    )
}

#[test]
fn test_event_json_shape() {
    let line = sample_event(30).to_json_line().unwrap();
    let value: serde_json::Value = serde_json::from_str(&line).unwrap();

    assert_eq!(value["site"], "example.com");
    assert_eq!(value["variant"], "legacy-v1");
    assert_eq!(value["created_at"], "2024-10-22T22:54:00Z");
    assert_eq!(value["payload"]["score"], 30);
    assert_eq!(value["payload"]["tests_quantity"], 10);
    assert!(value["payload"]["error"].is_null());
}

#[tokio::test]
async fn test_channel_sink_forwards_events() {
    let (sink, mut receiver) = ChannelSink::new(4);

    sink.create_event(&sample_event(30)).await.unwrap();
    sink.create_event(&sample_event(45)).await.unwrap();

    assert_eq!(receiver.recv().await.unwrap().payload.score(), Some(&json!(30)));
    assert_eq!(receiver.recv().await.unwrap().payload.score(), Some(&json!(45)));
    assert_eq!(sink.statistics().delivered(), 2);
    assert!(sink.statistics().last_delivery_time().is_some());
}

#[tokio::test]
async fn test_channel_sink_reports_closed_receiver() {
    let (sink, receiver) = ChannelSink::new(1);
    drop(receiver);

    let err = sink.create_event(&sample_event(30)).await.unwrap_err();
    assert!(matches!(err, NotificationError::ChannelClosed(_)));
    assert_eq!(sink.statistics().failed(), 1);
    assert_eq!(sink.statistics().delivered(), 0);
}

#[tokio::test]
async fn test_file_sink_appends_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("events.jsonl");
    let sink = JsonLinesFileSink::new(&path);

    sink.create_event(&sample_event(30)).await.unwrap();
    sink.create_event(&sample_event(60)).await.unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let events: Vec<ChangeEvent> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1], sample_event(60));
    assert_eq!(sink.sink_id(), format!("file:{}", path.display()));
}

#[tokio::test]
async fn test_file_sink_reports_unwritable_path() {
    let dir = tempfile::tempdir().unwrap();
    // A directory cannot be opened for appending
    let sink = JsonLinesFileSink::new(dir.path());

    let err = sink.create_event(&sample_event(30)).await.unwrap_err();
    assert!(matches!(err, NotificationError::Io { .. }));
    assert_eq!(sink.statistics().failed(), 1);
}

#[tokio::test]
async fn test_fanout_succeeds_when_one_sink_accepts() {
    let (healthy, mut receiver) = ChannelSink::new(2);
    let (broken, closed) = ChannelSink::new(2);
    drop(closed);
    let broken = Arc::new(broken);

    let sinks: Vec<Arc<dyn EventSink>> = vec![broken.clone(), Arc::new(healthy)];
    let fanout = FanoutSink::new(sinks);
    assert_eq!(fanout.len(), 2);

    fanout.create_event(&sample_event(30)).await.unwrap();

    assert!(receiver.recv().await.is_some());
    assert_eq!(broken.statistics().failed(), 1);
    assert_eq!(fanout.statistics().delivered(), 1);
    assert_eq!(fanout.statistics().failed(), 0);
}

#[tokio::test]
async fn test_fanout_fails_when_every_sink_fails() {
    let (first, first_rx) = ChannelSink::new(1);
    let dir = tempfile::tempdir().unwrap();
    drop(first_rx);

    let fanout = FanoutSink::new(vec![
        Arc::new(first),
        Arc::new(JsonLinesFileSink::new(dir.path())),
    ]);

    let err = fanout.create_event(&sample_event(30)).await.unwrap_err();
    match err {
        NotificationError::DeliveryFailed { failed_sinks } => assert_eq!(
            failed_sinks,
            vec!["channel".to_string(), format!("file:{}", dir.path().display())]
        ),
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(fanout.statistics().failed(), 1);
}

#[tokio::test]
async fn test_stdout_sink_writes_event() {
    let sink = StdoutSink::new();

    sink.create_event(&sample_event(30)).await.unwrap();

    assert_eq!(sink.sink_id(), "stdout");
    assert_eq!(sink.statistics().delivered(), 1);
}

#[test]
fn test_error_display() {
    let err = NotificationError::Http {
        url: "https://hooks.example/observatory".to_string(),
        status: Some(500),
        message: "Internal Server Error".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "Webhook https://hooks.example/observatory answered HTTP 500: Internal Server Error"
    );
}
