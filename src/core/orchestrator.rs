//! Main orchestrator for query execution.
//!
//! Runs the backend request and the stage stream side by side, keeps the
//! lifecycle of the current query, falls back to the demo answer when the
//! backend is unreachable, and logs every transition to the query store.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{fallback_answer, Backend, BackendError};
use crate::annotation::{CitationParser, ConflictVerdict, EvidenceClassifier};
use crate::config::{ConflictSettings, ResolvedConfig, StageMode};
use crate::domain::{
    Answer, EventType, LifecycleEvent, QueryResponse, StageCursor, StageUpdate,
};

use super::event_store::QueryStore;
use super::progress::QueryLifecycle;
use super::session::{QuerySession, UpdateOutcome};
use super::staging::{NoStages, SimulatedStages, StageSource};

const STAGE_CHANNEL_CAPACITY: usize = 32;

/// Main query orchestrator
pub struct Orchestrator {
    backend: Arc<dyn Backend>,
    stages: Arc<dyn StageSource>,
    parser: CitationParser,
    conflict: ConflictSettings,
    session: QuerySession,

    /// Shared by every query; stale updates are filtered by `seq`
    tx: mpsc::Sender<StageUpdate>,
    rx: mpsc::Receiver<StageUpdate>,

    /// Stage task of the query in flight
    stage_task: Option<AbortHandle>,

    /// Directory for query logs (none disables persistence)
    store_root: Option<PathBuf>,
}

impl Orchestrator {
    /// Create an orchestrator with default parsing and confidence settings
    pub fn new(backend: Arc<dyn Backend>, stages: Arc<dyn StageSource>) -> Self {
        let (tx, rx) = mpsc::channel(STAGE_CHANNEL_CAPACITY);

        Self {
            backend,
            stages,
            parser: CitationParser::default(),
            conflict: ConflictSettings::default(),
            session: QuerySession::new(),
            tx,
            rx,
            stage_task: None,
            store_root: None,
        }
    }

    /// Build from resolved configuration
    pub fn from_config(config: &ResolvedConfig, backend: Arc<dyn Backend>) -> Self {
        let stages: Arc<dyn StageSource> = match config.stages.mode {
            StageMode::Simulated => Arc::new(SimulatedStages::new(config.stages.delays)),
            StageMode::None => Arc::new(NoStages),
        };

        Self::new(backend, stages)
            .with_parser(CitationParser::new(EvidenceClassifier::new(
                config.static_base.clone(),
            )))
            .with_conflict(config.conflict)
            .with_store(config.queries_dir())
    }

    pub fn with_parser(mut self, parser: CitationParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_conflict(mut self, conflict: ConflictSettings) -> Self {
        self.conflict = conflict;
        self
    }

    pub fn with_stages(mut self, stages: Arc<dyn StageSource>) -> Self {
        self.stages = stages;
        self
    }

    /// Persist query logs under `root`
    pub fn with_store(mut self, root: PathBuf) -> Self {
        self.store_root = Some(root);
        self
    }

    pub fn session(&self) -> &QuerySession {
        &self.session
    }

    /// Ask a question without observing stage progress
    pub async fn ask(&mut self, question: &str) -> Result<Answer> {
        self.ask_with(question, |_| {}).await
    }

    /// Ask a question, calling `observer` each time the cursor moves
    ///
    /// Never fails on backend errors; those produce the degraded fallback
    /// answer instead. The cursor reaches `done` only once both the stage
    /// stream has ended and the backend has answered.
    #[instrument(skip(self, question, observer), fields(backend = %self.backend.name()))]
    pub async fn ask_with<F>(&mut self, question: &str, mut observer: F) -> Result<Answer>
    where
        F: FnMut(&QueryLifecycle) + Send,
    {
        let question = question.trim();
        anyhow::ensure!(!question.is_empty(), "Query must not be empty");

        let started = Instant::now();
        let (lifecycle, superseded) = self.session.begin();
        let (seq, query_id) = (lifecycle.seq, lifecycle.query_id);
        info!(%query_id, seq, stages = %self.stages.name(), "Starting query");

        if let Some(previous) = self.stage_task.take() {
            previous.abort();
        }
        if let Some(previous) = superseded {
            let log = QueryLog::open(self.store_root.as_deref(), previous.query_id).await;
            log.record(LifecycleEvent::new(
                previous.query_id,
                EventType::QuerySuperseded,
                format!("Superseded by {}", query_id),
            ))
            .await;
        }

        let log = QueryLog::open(self.store_root.as_deref(), query_id).await;
        log.record(LifecycleEvent::new(query_id, EventType::QueryStarted, question))
            .await;
        observer(&lifecycle);

        let stages = Arc::clone(&self.stages);
        let tx = self.tx.clone();
        let mut stage_handle = tokio::spawn(async move {
            if let Err(e) = stages.drive(seq, tx).await {
                warn!(seq, error = %e, "Stage source failed");
            }
        });
        self.stage_task = Some(stage_handle.abort_handle());

        let backend = Arc::clone(&self.backend);
        let request = backend.query(question);
        tokio::pin!(request);

        let session = &mut self.session;
        let rx = &mut self.rx;
        let mut response: Option<Result<QueryResponse, BackendError>> = None;
        let mut stages_done = false;

        while response.is_none() || !stages_done {
            tokio::select! {
                Some(update) = rx.recv() => {
                    apply_update(session, update, &log, &mut observer).await;
                }
                result = &mut request, if response.is_none() => {
                    response = Some(result);
                }
                joined = &mut stage_handle, if !stages_done => {
                    stages_done = true;
                    if let Err(e) = joined {
                        if !e.is_cancelled() {
                            warn!(seq, error = %e, "Stage task panicked");
                        }
                    }
                }
            }
        }

        while let Ok(update) = rx.try_recv() {
            apply_update(session, update, &log, &mut observer).await;
        }
        self.stage_task = None;

        let Some(result) = response else {
            anyhow::bail!("Query {} finished without a backend result", query_id);
        };

        let (response, degraded) = match result {
            Ok(response) => (response, false),
            Err(e) => {
                warn!(%query_id, error = %e, "Backend unavailable, using fallback answer");
                log.record(
                    LifecycleEvent::new(query_id, EventType::FallbackUsed, "Fallback answer used")
                        .with_error(e.to_string()),
                )
                .await;
                (fallback_answer(question), true)
            }
        };

        let verdict = if degraded {
            ConflictVerdict::new(true, self.conflict.fallback_confidence)
        } else {
            ConflictVerdict::resolve(
                response.conflict,
                &response.answer,
                self.conflict.default_confidence,
            )
        };

        let segments = self.parser.parse(&response.answer);
        debug!(%query_id, segments = segments.len(), "Parsed answer");

        log.record(
            LifecycleEvent::new(
                query_id,
                EventType::AnswerReceived,
                format!("{} segments, {} sources", segments.len(), response.sources.len()),
            )
            .with_verdict(verdict),
        )
        .await;

        self.session.finish(seq);
        if let Some(current) = self.session.current() {
            observer(current);
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        log.record(
            LifecycleEvent::new(
                query_id,
                EventType::QueryCompleted,
                format!("Query completed in {}ms", duration_ms),
            )
            .with_cursor(StageCursor::Done)
            .with_verdict(verdict)
            .with_duration(duration_ms),
        )
        .await;
        log.store_answer(&response.answer).await;

        info!(%query_id, degraded, flagged = verdict.flagged, duration_ms, "Query completed");

        Ok(Answer {
            query_id,
            text: response.answer,
            segments,
            verdict,
            sources: response.sources,
            degraded,
        })
    }
}

/// Apply one stage update, reporting and logging it if the cursor moved
async fn apply_update<F>(
    session: &mut QuerySession,
    update: StageUpdate,
    log: &QueryLog,
    observer: &mut F,
) where
    F: FnMut(&QueryLifecycle),
{
    if session.apply(update) != UpdateOutcome::Applied {
        return;
    }

    let Some(current) = session.current() else {
        return;
    };

    observer(current);
    log.record(
        LifecycleEvent::new(
            current.query_id,
            EventType::StageAdvanced,
            update.cursor.to_string(),
        )
        .with_cursor(update.cursor),
    )
    .await;
}

/// Best-effort event log; store failures are reported and swallowed
struct QueryLog {
    store: Option<QueryStore>,
}

impl QueryLog {
    async fn open(root: Option<&Path>, query_id: Uuid) -> Self {
        let store = match root {
            Some(root) => match QueryStore::open_in(root, query_id).await {
                Ok(store) => Some(store),
                Err(e) => {
                    warn!(%query_id, error = %e, "Query log unavailable");
                    None
                }
            },
            None => None,
        };
        Self { store }
    }

    async fn record(&self, event: LifecycleEvent) {
        if let Some(ref store) = self.store {
            if let Err(e) = store.append(&event).await {
                warn!(query_id = %event.query_id, error = %e, "Failed to record event");
            }
        }
    }

    async fn store_answer(&self, content: &str) {
        if let Some(ref store) = self.store {
            if let Err(e) = store.store_answer(content).await {
                warn!(error = %e, "Failed to store answer");
            }
        }
    }
}
