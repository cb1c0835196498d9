//! Conflict recognition
//!
//! The backend's judge announces contradictory sources either through a
//! structured `conflict` field or, for older backends, by embedding the
//! literal `CONFLICT DETECTED` in the answer text. This module only
//! recognizes that announcement; it performs no reasoning of its own.

use serde::{Deserialize, Serialize};

/// Marker literal agreed with the backend (case-sensitive)
pub const CONFLICT_MARKER: &str = "CONFLICT DETECTED";

/// Confidence above which an answer is shown as high confidence
pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.8;

/// True iff the answer text announces a contradiction
pub fn detect(answer_text: &str) -> bool {
    answer_text.contains(CONFLICT_MARKER)
}

/// Conflict flag and confidence attached to one answer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConflictVerdict {
    pub flagged: bool,
    pub confidence: f64,
}

impl ConflictVerdict {
    /// Create a verdict, clamping confidence into `[0, 1]`
    pub fn new(flagged: bool, confidence: f64) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            flagged,
            confidence,
        }
    }

    /// Verdict from marker detection on the answer text
    pub fn from_text(answer_text: &str, confidence: f64) -> Self {
        Self::new(detect(answer_text), confidence)
    }

    /// Prefer the backend's structured verdict, fall back to the marker
    pub fn resolve(
        structured: Option<ConflictVerdict>,
        answer_text: &str,
        default_confidence: f64,
    ) -> Self {
        match structured {
            Some(verdict) => Self::new(verdict.flagged, verdict.confidence),
            None => Self::from_text(answer_text, default_confidence),
        }
    }

    pub fn level(&self) -> ConfidenceLevel {
        if self.confidence > HIGH_CONFIDENCE_THRESHOLD {
            ConfidenceLevel::High
        } else {
            ConfidenceLevel::Low
        }
    }

    /// Confidence as a whole percentage, e.g. `"85%"`
    pub fn percent(&self) -> String {
        format!("{:.0}%", self.confidence * 100.0)
    }
}

/// Coarse confidence bucket for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    High,
    Low,
}
