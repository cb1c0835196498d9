//! Orchestrator Integration Tests
//!
//! Drives full queries against a mock backend: success, fallback on
//! failure, structured conflict verdicts, stage ordering and persistence.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chakravyuh::adapters::{Backend, BackendError};
use chakravyuh::annotation::{ConflictVerdict, Modality};
use chakravyuh::config::ConflictSettings;
use chakravyuh::core::{NoStages, Orchestrator, QueryStore, SimulatedStages, StageDelays};
use chakravyuh::domain::{
    EventType, ProcessingStage, QueryResponse, SourceRecord, StageCursor, UploadResponse,
};
use tempfile::TempDir;

/// Backend that answers (or fails) after an optional delay
struct MockBackend {
    response: Option<QueryResponse>,
    delay: Duration,
}

impl MockBackend {
    fn answering(answer: &str) -> Self {
        Self {
            response: Some(QueryResponse {
                answer: answer.to_string(),
                sources: Vec::new(),
                conflict: None,
            }),
            delay: Duration::ZERO,
        }
    }

    fn failing() -> Self {
        Self {
            response: None,
            delay: Duration::ZERO,
        }
    }

    fn with_conflict(mut self, verdict: ConflictVerdict) -> Self {
        if let Some(ref mut response) = self.response {
            response.conflict = Some(verdict);
        }
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn query(&self, _question: &str) -> Result<QueryResponse, BackendError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.response.clone().ok_or(BackendError::Status {
            status: 500,
            body: "internal error".to_string(),
        })
    }

    async fn upload(&self, path: &Path) -> Result<UploadResponse, BackendError> {
        Ok(UploadResponse {
            message: format!("Successfully processed {}", path.display()),
            chunks_added: Some(1),
            url: None,
        })
    }

    async fn health_check(&self) -> Result<String, BackendError> {
        Ok("Chakravyuh backend is running".to_string())
    }
}

fn orchestrator(backend: MockBackend) -> Orchestrator {
    Orchestrator::new(
        Arc::new(backend),
        Arc::new(SimulatedStages::new(StageDelays::zero())),
    )
}

#[tokio::test]
async fn test_successful_query_is_parsed() {
    let mut orchestrator = orchestrator(MockBackend::answering(
        "Shipping slipped. [Source: plan.pdf | Page: 3] [Source: call.mp3 | Time: 90s] CONFLICT DETECTED",
    ));

    let answer = orchestrator.ask("When do we ship?").await.unwrap();

    assert!(!answer.degraded);
    assert!(answer.verdict.flagged);
    assert_eq!(answer.verdict.confidence, 0.85);

    let cited = answer.citations();
    assert_eq!(cited.len(), 2);
    assert_eq!(cited[0].evidence.modality, Modality::Pdf);
    assert_eq!(cited[1].evidence.timestamp_seconds, 90);
    assert_eq!(orchestrator.session().cursor(), StageCursor::Done);
}

#[tokio::test]
async fn test_failing_backend_yields_degraded_answer() {
    let mut orchestrator = orchestrator(MockBackend::failing());

    let answer = orchestrator.ask("When do we ship?").await.unwrap();

    assert!(answer.degraded);
    assert!(answer.verdict.flagged);
    assert_eq!(answer.verdict.confidence, 0.92);
    assert!(answer.text.contains("CONFLICT DETECTED"));
    assert_eq!(answer.citations().len(), 2);
    assert_eq!(answer.citations()[1].evidence.timestamp_seconds, 45);
}

#[tokio::test]
async fn test_fallback_confidence_is_configurable() {
    let mut orchestrator = orchestrator(MockBackend::failing()).with_conflict(ConflictSettings {
        default_confidence: 0.85,
        fallback_confidence: 0.6,
    });

    let answer = orchestrator.ask("q").await.unwrap();
    assert_eq!(answer.verdict.confidence, 0.6);
}

#[tokio::test]
async fn test_structured_conflict_overrides_marker() {
    let backend = MockBackend::answering("Quoting the memo: CONFLICT DETECTED was a test.")
        .with_conflict(ConflictVerdict::new(false, 0.3));
    let mut orchestrator = orchestrator(backend);

    let answer = orchestrator.ask("Is there a conflict?").await.unwrap();
    assert!(!answer.verdict.flagged);
    assert_eq!(answer.verdict.confidence, 0.3);
}

#[tokio::test]
async fn test_sources_are_passed_through() {
    let mut backend = MockBackend::answering("See [Source: plan.pdf | Page: 1]");
    if let Some(ref mut response) = backend.response {
        response.sources.push(SourceRecord {
            source: "plan.pdf".to_string(),
            kind: Some("pdf".to_string()),
            page: Some(1),
            ..Default::default()
        });
    }

    let answer = orchestrator(backend).ask("q").await.unwrap();
    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].display_ref(), "plan.pdf");
}

#[tokio::test(start_paused = true)]
async fn test_done_waits_for_slow_backend() {
    let backend = MockBackend::answering("ok").with_delay(Duration::from_secs(10));
    let mut orchestrator = orchestrator(backend);
    let mut seen = Vec::new();

    orchestrator
        .ask_with("q", |lifecycle| seen.push(lifecycle.cursor()))
        .await
        .unwrap();

    let generate = seen
        .iter()
        .position(|c| *c == StageCursor::At(ProcessingStage::Generate))
        .unwrap();
    assert_eq!(seen.last(), Some(&StageCursor::Done));
    assert_eq!(generate, seen.len() - 2);
}

#[tokio::test(start_paused = true)]
async fn test_done_waits_for_stage_stream() {
    let start = tokio::time::Instant::now();
    let mut orchestrator = Orchestrator::new(
        Arc::new(MockBackend::answering("ok")),
        Arc::new(SimulatedStages::default()),
    );
    let mut seen = Vec::new();

    orchestrator
        .ask_with("q", |lifecycle| seen.push(lifecycle.cursor()))
        .await
        .unwrap();

    assert!(start.elapsed() >= Duration::from_millis(4300));
    let expected: Vec<StageCursor> = std::iter::once(StageCursor::Idle)
        .chain(ProcessingStage::ALL.into_iter().map(StageCursor::At))
        .chain(std::iter::once(StageCursor::Done))
        .collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn test_no_stages_jumps_to_done() {
    let mut orchestrator =
        orchestrator(MockBackend::answering("ok")).with_stages(Arc::new(NoStages));
    let mut seen = Vec::new();

    orchestrator
        .ask_with("q", |lifecycle| seen.push(lifecycle.cursor()))
        .await
        .unwrap();

    assert_eq!(seen, vec![StageCursor::Idle, StageCursor::Done]);
}

#[tokio::test]
async fn test_each_query_gets_fresh_lifecycle() {
    let mut orchestrator = orchestrator(MockBackend::answering("ok"));

    let first = orchestrator.ask("one").await.unwrap();
    let second = orchestrator.ask("two").await.unwrap();

    assert_ne!(first.query_id, second.query_id);
    assert_eq!(
        orchestrator.session().current().map(|l| l.query_id),
        Some(second.query_id)
    );
}

#[tokio::test]
async fn test_queries_are_logged() {
    let temp = TempDir::new().unwrap();
    let mut orchestrator =
        orchestrator(MockBackend::failing()).with_store(temp.path().to_path_buf());

    let answer = orchestrator.ask("  Why the delay?  ").await.unwrap();

    let store = QueryStore::open_in(temp.path(), answer.query_id).await.unwrap();
    let events = store.replay().await.unwrap();
    let types: Vec<EventType> = events.iter().map(|e| e.event_type).collect();

    assert_eq!(types.first(), Some(&EventType::QueryStarted));
    assert_eq!(types.last(), Some(&EventType::QueryCompleted));
    assert_eq!(
        types.iter().filter(|t| **t == EventType::StageAdvanced).count(),
        5
    );
    assert!(types.contains(&EventType::FallbackUsed));

    let record = store.record().await.unwrap().unwrap();
    assert_eq!(record.question, "Why the delay?");
    assert!(record.degraded);
    assert!(record.is_finished());

    assert_eq!(store.load_answer().await.unwrap(), Some(answer.text));
    assert_eq!(
        QueryStore::list_queries_in(temp.path()).await.unwrap(),
        vec![answer.query_id]
    );
}

#[tokio::test]
async fn test_unwritable_store_does_not_fail_query() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("queries");
    std::fs::write(&blocker, "not a directory").unwrap();

    let mut orchestrator = orchestrator(MockBackend::answering("ok")).with_store(blocker);
    let answer = orchestrator.ask("q").await.unwrap();
    assert_eq!(answer.text, "ok");
}

#[tokio::test(start_paused = true)]
async fn test_new_query_supersedes_interrupted_one() {
    let temp = TempDir::new().unwrap();
    let mut orchestrator = Orchestrator::new(
        Arc::new(MockBackend::answering("ok")),
        Arc::new(SimulatedStages::default()),
    )
    .with_store(temp.path().to_path_buf());

    // abandon the first query partway through its stages
    let interrupted =
        tokio::time::timeout(Duration::from_millis(1500), orchestrator.ask("one")).await;
    assert!(interrupted.is_err());

    let mut seen = Vec::new();
    let answer = orchestrator
        .ask_with("two", |lifecycle| seen.push(lifecycle.cursor()))
        .await
        .unwrap();

    let expected: Vec<StageCursor> = std::iter::once(StageCursor::Idle)
        .chain(ProcessingStage::ALL.into_iter().map(StageCursor::At))
        .chain(std::iter::once(StageCursor::Done))
        .collect();
    assert_eq!(seen, expected);

    let queries = QueryStore::list_queries_in(temp.path()).await.unwrap();
    assert_eq!(queries.len(), 2);
    let first_id = queries
        .into_iter()
        .find(|id| *id != answer.query_id)
        .unwrap();

    let first = QueryStore::open_in(temp.path(), first_id).await.unwrap();
    let types: Vec<EventType> = first
        .replay()
        .await
        .unwrap()
        .iter()
        .map(|e| e.event_type)
        .collect();
    assert_eq!(types.first(), Some(&EventType::QueryStarted));
    assert_eq!(types.last(), Some(&EventType::QuerySuperseded));
    assert!(!types.contains(&EventType::QueryCompleted));

    let record = first.record().await.unwrap().unwrap();
    assert!(record.superseded);
    assert!(!record.is_finished());
}
