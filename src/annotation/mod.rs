//! Answer annotation engine
//!
//! Turns a backend answer with inline citation markers into renderable
//! segments and evidence descriptors, and recognizes announced conflicts.
//!
//! # Example
//!
//! ```
//! use chakravyuh::annotation::{CitationParser, Modality, detect};
//!
//! let answer = "Delayed to Q4 [Source: meeting_rec.mp3 | Time: 45s]";
//! let segments = CitationParser::default().parse(answer);
//!
//! let citation = segments[1].as_citation().unwrap();
//! assert_eq!(citation.evidence.modality, Modality::Audio);
//! assert_eq!(citation.evidence.timestamp_seconds, 45);
//! assert!(!detect(answer));
//! ```

pub mod citation;
pub mod classify;
pub mod conflict;
pub mod timestamp;

pub use citation::{
    citations, compute_citation_id, render_plain, CitationForm, CitationParser, CitationRef,
    Segment,
};
pub use classify::{extension, EvidenceClassifier, EvidenceDescriptor, Modality};
pub use conflict::{detect, ConfidenceLevel, ConflictVerdict, CONFLICT_MARKER};
pub use timestamp::{find_time_token, format_timestamp, resolve};
