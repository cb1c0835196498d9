//! Core orchestration logic.
//!
//! This module contains:
//! - QueryStore: Append-only query logging
//! - Progress: Stage status derivation and per-query lifecycle
//! - Session: Sequence-numbered ownership of the query in flight
//! - Staging: Producers of stage updates
//! - Orchestrator: Main query engine

pub mod event_store;
pub mod orchestrator;
pub mod progress;
pub mod session;
pub mod staging;

// Re-export commonly used types
pub use event_store::QueryStore;
pub use orchestrator::Orchestrator;
pub use progress::{ProgressTracker, QueryLifecycle};
pub use session::{QuerySession, UpdateOutcome};
pub use staging::{NoStages, SimulatedStages, StageDelays, StageSource};
