//! chakravyuh - Evidence-linked answers from a multimodal RAG backend
//!
//! Turns raw answer text into renderable segments with inline citations,
//! links each citation to the document, recording or image it came from,
//! flags contradictions between sources, and tracks the backend's
//! processing stages while a query is in flight.
//!
//! # Architecture
//!
//! - Annotation is pure: text in, segments and descriptors out
//! - Every query is recorded as an append-only event log
//! - Stage updates are sequence-numbered so a newer query supersedes an older one
//! - Backend failures never surface as errors; a deterministic offline answer is used
//!
//! # Modules
//!
//! - `annotation`: Citation parsing, evidence classification, conflict detection
//! - `adapters`: Backend integrations (HTTP, fallback)
//! - `core`: Orchestration logic (QueryStore, QuerySession, StageSource)
//! - `domain`: Data structures (ProcessingStage, LifecycleEvent, Answer)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Ask a question
//! chakravyuh ask "When will the project ship?"
//!
//! # Parse answer text offline
//! echo "Late. [Source: plan.pdf | Page: 3]" | chakravyuh parse
//!
//! # Inspect a past query
//! chakravyuh show <query-id>
//! ```

pub mod adapters;
pub mod annotation;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{Backend, BackendError, HttpBackend};
pub use annotation::{CitationParser, CitationRef, ConflictVerdict, EvidenceClassifier, Segment};
pub use crate::core::{Orchestrator, QuerySession, QueryStore};
pub use domain::{Answer, EventType, LifecycleEvent, ProcessingStage, StageCursor};
