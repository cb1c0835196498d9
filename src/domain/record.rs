//! Query state reconstructed from its event log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::annotation::ConflictVerdict;

use super::events::{EventType, LifecycleEvent};
use super::stage::StageCursor;

/// Summary of one past query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRecord {
    pub query_id: Uuid,

    /// The question as submitted
    pub question: String,

    /// Last stage position reached
    pub cursor: StageCursor,

    pub started_at: DateTime<Utc>,

    pub completed_at: Option<DateTime<Utc>>,

    /// Whether the fallback answer was used
    pub degraded: bool,

    /// Whether a newer query replaced this one
    pub superseded: bool,

    pub verdict: Option<ConflictVerdict>,
}

impl QueryRecord {
    /// Reconstruct query state from a sequence of events
    pub fn from_events(events: &[LifecycleEvent]) -> Option<Self> {
        let first = events.first()?;

        let mut record = Self {
            query_id: first.query_id,
            question: String::new(),
            cursor: StageCursor::Idle,
            started_at: first.timestamp,
            completed_at: None,
            degraded: false,
            superseded: false,
            verdict: None,
        };

        for event in events {
            record.apply_event(event);
        }

        Some(record)
    }

    /// Apply a single event to update query state
    pub fn apply_event(&mut self, event: &LifecycleEvent) {
        match event.event_type {
            EventType::QueryStarted => {
                self.question = event.summary.clone();
                self.started_at = event.timestamp;
            }
            EventType::StageAdvanced => {
                if let Some(cursor) = event.cursor {
                    self.cursor = cursor;
                }
            }
            EventType::FallbackUsed => {
                self.degraded = true;
            }
            EventType::AnswerReceived => {
                if event.verdict.is_some() {
                    self.verdict = event.verdict;
                }
            }
            EventType::QueryCompleted => {
                self.cursor = StageCursor::Done;
                self.completed_at = Some(event.timestamp);
                if event.verdict.is_some() {
                    self.verdict = event.verdict;
                }
            }
            EventType::QuerySuperseded => {
                self.superseded = true;
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.cursor.is_done()
    }
}
