//! Lifecycle events for a single query.
//!
//! Everything that happens to a query is recorded as an immutable event in
//! an append-only log, so the query's history can be replayed later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::annotation::ConflictVerdict;

use super::stage::StageCursor;

/// A single event in a query's append-only log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Unique identifier for this event
    pub id: Uuid,

    /// When this event occurred (ISO 8601)
    pub timestamp: DateTime<Utc>,

    /// The query this event belongs to
    pub query_id: Uuid,

    /// Type of event
    pub event_type: EventType,

    /// Stage position after this event (if it moved)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<StageCursor>,

    /// Human-readable summary
    pub summary: String,

    /// Verdict attached to the answer (answer events only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<ConflictVerdict>,

    /// Time taken in milliseconds (completion events)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    /// Error message if the backend failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LifecycleEvent {
    /// Create a new event with the current timestamp
    pub fn new(query_id: Uuid, event_type: EventType, summary: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            query_id,
            event_type,
            cursor: None,
            summary: summary.into(),
            verdict: None,
            duration_ms: None,
            error: None,
        }
    }

    pub fn with_cursor(mut self, cursor: StageCursor) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn with_verdict(mut self, verdict: ConflictVerdict) -> Self {
        self.verdict = Some(verdict);
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Types of events that can occur while a query is processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A query was submitted; the summary holds the question
    QueryStarted,

    /// The pipeline reported a new stage
    StageAdvanced,

    /// The backend was unreachable; the fallback answer was used
    FallbackUsed,

    /// An answer was parsed and judged
    AnswerReceived,

    /// The lifecycle reached `done`
    QueryCompleted,

    /// A newer query replaced this one before it finished
    QuerySuperseded,
}
