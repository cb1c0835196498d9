//! Domain types for chakravyuh.
//!
//! This module contains the core data structures:
//! - Stages: Pipeline phases, cursor and display status
//! - Events: Immutable records of a query's lifecycle
//! - Record: Query state replayed from events
//! - Answer: Backend wire types and the processed answer

pub mod answer;
pub mod events;
pub mod record;
pub mod stage;

// Re-export commonly used types
pub use answer::{Answer, QueryRequest, QueryResponse, SourceRecord, UploadResponse};
pub use events::{EventType, LifecycleEvent};
pub use record::QueryRecord;
pub use stage::{ProcessingStage, StageCursor, StageStatus, StageUpdate};
