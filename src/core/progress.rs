//! Stage progress derivation.
//!
//! The tracker is a pure function of the current cursor: it performs no
//! timing and holds no state. `QueryLifecycle` holds the cursor for one
//! query and enforces that it only ever moves forward.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{ProcessingStage, StageCursor, StageStatus};

/// Derives per-stage display status from the reported cursor
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressTracker;

impl ProgressTracker {
    /// Status of `stage` given the currently-reported cursor
    ///
    /// - `Done` → every stage completed
    /// - `Idle` → every stage pending
    /// - otherwise earlier stages completed, the current one active,
    ///   later ones pending
    pub fn status_of(stage: ProcessingStage, cursor: StageCursor) -> StageStatus {
        let current = match cursor {
            StageCursor::Done => return StageStatus::Completed,
            StageCursor::Idle => return StageStatus::Pending,
            StageCursor::At(current) => current.index(),
        };

        let index = stage.index();
        if index < current {
            StageStatus::Completed
        } else if index == current {
            StageStatus::Active
        } else {
            StageStatus::Pending
        }
    }

    /// Status of every stage, in pipeline order
    pub fn statuses(cursor: StageCursor) -> Vec<(ProcessingStage, StageStatus)> {
        ProcessingStage::ALL
            .into_iter()
            .map(|stage| (stage, Self::status_of(stage, cursor)))
            .collect()
    }
}

/// Stage state for one query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryLifecycle {
    /// Monotonic sequence number within the session
    pub seq: u64,

    /// Identifier used for the query's event log
    pub query_id: Uuid,

    cursor: StageCursor,
}

impl QueryLifecycle {
    pub fn new(seq: u64, query_id: Uuid) -> Self {
        Self {
            seq,
            query_id,
            cursor: StageCursor::Idle,
        }
    }

    pub fn cursor(&self) -> StageCursor {
        self.cursor
    }

    pub fn is_done(&self) -> bool {
        self.cursor.is_done()
    }

    /// Move the cursor forward
    ///
    /// Returns `true` if the cursor changed. Updates at or behind the
    /// current stage, updates after `Done`, and `Idle` are no-ops, so
    /// duplicate or out-of-order events can never regress a stage.
    pub fn advance(&mut self, next: StageCursor) -> bool {
        let advanced = match (self.cursor, next) {
            (StageCursor::Done, _) | (_, StageCursor::Idle) => false,
            (_, StageCursor::Done) => true,
            (StageCursor::Idle, StageCursor::At(_)) => true,
            (StageCursor::At(current), StageCursor::At(stage)) => stage > current,
        };

        if advanced {
            self.cursor = next;
        }
        advanced
    }

    pub fn status_of(&self, stage: ProcessingStage) -> StageStatus {
        ProgressTracker::status_of(stage, self.cursor)
    }

    pub fn statuses(&self) -> Vec<(ProcessingStage, StageStatus)> {
        ProgressTracker::statuses(self.cursor)
    }
}
