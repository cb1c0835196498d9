//! Terminal rendering for answers, citations and stage progress.
//!
//! Everything here returns a `String` so the CLI decides where it goes
//! (stdout for answers, stderr for progress).

use std::fmt::Write;

use crate::annotation::{format_timestamp, CitationRef, ConfidenceLevel, ConflictVerdict, Modality, Segment};
use crate::core::ProgressTracker;
use crate::domain::{Answer, SourceRecord, StageCursor, StageStatus};

fn status_icon(status: StageStatus) -> &'static str {
    match status {
        StageStatus::Completed => "✓",
        StageStatus::Active => "▶",
        StageStatus::Pending => "·",
    }
}

fn modality_icon(modality: Modality) -> &'static str {
    match modality {
        Modality::Pdf => "📄",
        Modality::Audio => "🎧",
        Modality::Image => "🖼",
    }
}

/// One line per stage with its status marker
pub fn stage_board(cursor: StageCursor) -> String {
    let mut out = String::new();
    for (stage, status) in ProgressTracker::statuses(cursor) {
        let _ = writeln!(out, "  {} {}", status_icon(status), stage.label());
    }
    out
}

/// Single status line for the current cursor
pub fn stage_line(cursor: StageCursor) -> String {
    match cursor {
        StageCursor::Idle => "⏳ Waiting for pipeline...".to_string(),
        StageCursor::At(stage) => format!(
            "▶ [{}/{}] {}...",
            stage.index() + 1,
            crate::domain::ProcessingStage::ALL.len(),
            stage.label()
        ),
        StageCursor::Done => "✓ Pipeline complete".to_string(),
    }
}

/// Answer body with citation markers replaced by numbered labels
pub fn answer_body(segments: &[Segment]) -> String {
    let mut out = String::new();
    let mut n = 0;
    for segment in segments {
        match segment {
            Segment::PlainText { content } => out.push_str(content),
            Segment::Citation(citation) => {
                n += 1;
                let _ = write!(out, "[{}: {}]", n, citation.display_label());
            }
        }
    }
    out
}

/// Evidence pointer for one citation
pub fn citation_line(n: usize, citation: &CitationRef) -> String {
    let evidence = &citation.evidence;
    let mut line = format!(
        "  [{}] {} {} ({})",
        n,
        modality_icon(evidence.modality),
        citation.display_label(),
        evidence.locator
    );
    if let Some(offset) = evidence.seek_offset() {
        let _ = write!(line, " @ {}", format_timestamp(offset));
    }
    line
}

/// Conflict banner with confidence
pub fn verdict_line(verdict: &ConflictVerdict) -> String {
    let level = match verdict.level() {
        ConfidenceLevel::High => "high",
        ConfidenceLevel::Low => "low",
    };

    if verdict.flagged {
        format!(
            "⚠️  CONFLICT DETECTED (confidence {}, {})",
            verdict.percent(),
            level
        )
    } else {
        format!("✅ No conflict detected (confidence {}, {})", verdict.percent(), level)
    }
}

/// Table of retrieved sources
pub fn evidence_board(sources: &[SourceRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<8} {:<40} {:<10}", "TYPE", "REFERENCE", "AT");
    let _ = writeln!(out, "{}", "-".repeat(60));

    for source in sources {
        let at = match (source.page, source.timestamp.as_deref()) {
            (Some(page), _) => format!("p. {}", page),
            (None, Some(ts)) => ts.to_string(),
            (None, None) => String::new(),
        };
        let _ = writeln!(out, "{:<8} {:<40} {:<10}", source.kind(), source.display_ref(), at);
    }
    out
}

/// Full answer report
pub fn answer_report(answer: &Answer) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", answer_body(&answer.segments).trim_end());

    let citations = answer.citations();
    if !citations.is_empty() {
        let _ = writeln!(out, "\nCitations:");
        for (i, citation) in citations.iter().enumerate() {
            let _ = writeln!(out, "{}", citation_line(i + 1, citation));
        }
    }

    let _ = writeln!(out, "\n{}", verdict_line(&answer.verdict));

    if !answer.sources.is_empty() {
        let _ = writeln!(out, "\nEvidence:");
        out.push_str(&evidence_board(&answer.sources));
    }

    out
}
