//! Deterministic answer used when the backend cannot be reached.

use crate::domain::QueryResponse;

/// Fixed demo answer: a PDF/audio discrepancy with two citations
const FALLBACK_ANSWER: &str = "I found a discrepancy. The PDF timeline states completion in Q3, \
but the audio recording explicitly mentions a delay to Q4 due to supply chain issues. \n\n\
[Source: project_plan.pdf | Page: 3]\n\
[Source: meeting_rec.mp3 | Time: 45s]\n\n\
**CONFLICT DETECTED**: The project deadline is contested.";

/// Degraded response substituted for a failed `/query`
///
/// The question is ignored so the output is identical for every query.
pub fn fallback_answer(_question: &str) -> QueryResponse {
    QueryResponse {
        answer: FALLBACK_ANSWER.to_string(),
        sources: Vec::new(),
        conflict: None,
    }
}
