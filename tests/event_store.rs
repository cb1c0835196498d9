//! Query Store Integration Tests
//!
//! Tests for event log format, append operations, replay order and
//! reconstruction of query records.

use chakravyuh::annotation::ConflictVerdict;
use chakravyuh::core::QueryStore;
use chakravyuh::domain::{EventType, LifecycleEvent, ProcessingStage, StageCursor};
use tempfile::TempDir;
use uuid::Uuid;

#[tokio::test]
async fn test_event_append_format() {
    let query_id = Uuid::new_v4();

    let event = LifecycleEvent::new(query_id, EventType::StageAdvanced, "listen")
        .with_cursor(StageCursor::At(ProcessingStage::Listen));

    let json = serde_json::to_string(&event).unwrap();
    let parsed: LifecycleEvent = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed.query_id, query_id);
    assert_eq!(parsed.event_type, EventType::StageAdvanced);
    assert_eq!(parsed.cursor, Some(StageCursor::At(ProcessingStage::Listen)));
    assert!(parsed.verdict.is_none());

    // Optional fields are omitted from the line
    assert!(!json.contains("duration_ms"));
    assert!(json.contains("\"event_type\":\"stage_advanced\""));

    let timestamp_str = parsed.timestamp.to_rfc3339();
    assert!(timestamp_str.contains('T'));
}

#[tokio::test]
async fn test_event_with_duration_verdict_and_error() {
    let query_id = Uuid::new_v4();

    let completed = LifecycleEvent::new(query_id, EventType::QueryCompleted, "done")
        .with_duration(1500)
        .with_verdict(ConflictVerdict::new(true, 0.92));
    assert_eq!(completed.duration_ms, Some(1500));
    assert_eq!(completed.verdict.map(|v| v.flagged), Some(true));

    let fallback = LifecycleEvent::new(query_id, EventType::FallbackUsed, "fallback")
        .with_error("connection refused");
    assert_eq!(fallback.error.as_deref(), Some("connection refused"));
}

#[tokio::test]
async fn test_replay_order_and_record() {
    let temp = TempDir::new().unwrap();
    let query_id = Uuid::new_v4();
    let store = QueryStore::open_in(temp.path(), query_id).await.unwrap();

    store
        .append(&LifecycleEvent::new(query_id, EventType::QueryStarted, "When do we ship?"))
        .await
        .unwrap();
    for stage in ProcessingStage::ALL {
        store
            .append(
                &LifecycleEvent::new(query_id, EventType::StageAdvanced, stage.id())
                    .with_cursor(StageCursor::At(stage)),
            )
            .await
            .unwrap();
    }
    store
        .append(
            &LifecycleEvent::new(query_id, EventType::QueryCompleted, "done")
                .with_cursor(StageCursor::Done)
                .with_verdict(ConflictVerdict::new(false, 0.85)),
        )
        .await
        .unwrap();

    let events = store.replay().await.unwrap();
    assert_eq!(events.len(), 7);
    for (event, stage) in events[1..6].iter().zip(ProcessingStage::ALL) {
        assert_eq!(event.cursor, Some(StageCursor::At(stage)));
    }

    let record = store.record().await.unwrap().unwrap();
    assert_eq!(record.question, "When do we ship?");
    assert!(record.is_finished());
    assert!(!record.degraded);
    assert_eq!(record.verdict, Some(ConflictVerdict::new(false, 0.85)));
}

#[tokio::test]
async fn test_log_is_jsonl_on_disk() {
    let temp = TempDir::new().unwrap();
    let query_id = Uuid::new_v4();
    let store = QueryStore::open_in(temp.path(), query_id).await.unwrap();

    for i in 0..3 {
        store
            .append(&LifecycleEvent::new(query_id, EventType::StageAdvanced, format!("{}", i)))
            .await
            .unwrap();
    }

    let raw = std::fs::read_to_string(store.events_path()).unwrap();
    let lines: Vec<&str> = raw.lines().collect();
    assert_eq!(lines.len(), 3);
    for line in lines {
        assert!(serde_json::from_str::<serde_json::Value>(line).is_ok());
    }
    assert_eq!(store.query_dir(), temp.path().join(query_id.to_string()));
}

#[tokio::test]
async fn test_corrupt_line_is_an_error() {
    let temp = TempDir::new().unwrap();
    let store = QueryStore::open_in(temp.path(), Uuid::new_v4()).await.unwrap();
    std::fs::write(store.events_path(), "{not json}\n").unwrap();

    assert!(store.replay().await.is_err());
}
