//! Ownership of the active query lifecycle.
//!
//! Each query gets a fresh `QueryLifecycle` tagged with the next sequence
//! number. Stage updates carry that number; anything addressed to an
//! earlier (abandoned) query is discarded rather than applied.

use tracing::debug;
use uuid::Uuid;

use crate::domain::{StageCursor, StageUpdate};

use super::progress::QueryLifecycle;

/// Outcome of applying a stage update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The cursor moved
    Applied,
    /// Duplicate or out-of-order update for the current query
    Ignored,
    /// Update for a query that is no longer current
    Stale,
}

/// Holds the lifecycle of the query currently in flight
#[derive(Debug, Default)]
pub struct QuerySession {
    next_seq: u64,
    current: Option<QueryLifecycle>,
}

impl QuerySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new query, replacing any lifecycle still in flight
    ///
    /// Returns the new lifecycle and the one it superseded, if that one
    /// had not reached `done`.
    pub fn begin(&mut self) -> (QueryLifecycle, Option<QueryLifecycle>) {
        self.next_seq += 1;
        let lifecycle = QueryLifecycle::new(self.next_seq, Uuid::new_v4());

        let superseded = self
            .current
            .replace(lifecycle.clone())
            .filter(|previous| !previous.is_done());

        if let Some(ref previous) = superseded {
            debug!(seq = previous.seq, "Superseding unfinished query");
        }

        (lifecycle, superseded)
    }

    /// Apply a stage update to the current lifecycle
    pub fn apply(&mut self, update: StageUpdate) -> UpdateOutcome {
        let Some(lifecycle) = self.current.as_mut().filter(|l| l.seq == update.seq) else {
            debug!(seq = update.seq, "Discarding stale stage update");
            return UpdateOutcome::Stale;
        };

        if lifecycle.advance(update.cursor) {
            UpdateOutcome::Applied
        } else {
            UpdateOutcome::Ignored
        }
    }

    /// Mark the current query finished
    pub fn finish(&mut self, seq: u64) -> UpdateOutcome {
        self.apply(StageUpdate::done(seq))
    }

    pub fn current(&self) -> Option<&QueryLifecycle> {
        self.current.as_ref()
    }

    /// Cursor of the current query (`Idle` if none)
    pub fn cursor(&self) -> StageCursor {
        self.current
            .as_ref()
            .map(QueryLifecycle::cursor)
            .unwrap_or_default()
    }
}
