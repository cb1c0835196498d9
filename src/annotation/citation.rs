//! Citation marker parsing
//!
//! Splits an annotated answer into an ordered sequence of plain-text and
//! citation segments. Two marker conventions are accepted by one scanner:
//!
//! - **Pipe**: `[Source: meeting_rec.mp3 | Time: 45s]`
//! - **Bare**: `[Source: meeting.mp3 at 02:30]`
//!
//! Each `[Source:...]` marker is tried against the candidate grammars in
//! priority order (pipe first). A marker no grammar accepts stays in the
//! output as plain text, so no characters are ever dropped.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::classify::{extension, EvidenceClassifier, EvidenceDescriptor};
use super::timestamp::find_time_token;

/// Separator between the file and the extra info in a bare label
const BARE_TIME_SEPARATOR: &str = " at ";

/// Grammar variant a citation marker matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationForm {
    /// `[Source: <file> | <info>]`
    Pipe,
    /// `[Source: <label>]`
    Bare,
}

impl CitationForm {
    /// Candidate grammars in priority order
    pub const CANDIDATES: [CitationForm; 2] = [CitationForm::Pipe, CitationForm::Bare];

    /// Try to read `(file, info)` out of a marker body
    fn accept(self, body: &str) -> MarkerMatch {
        match self {
            CitationForm::Pipe => {
                let Some((file, info)) = body.split_once('|') else {
                    return MarkerMatch::NotApplicable;
                };
                let (file, info) = (file.trim(), info.trim());
                if file.is_empty() || info.is_empty() {
                    return MarkerMatch::Malformed;
                }
                MarkerMatch::Accepted(file.to_string(), info.to_string())
            }
            CitationForm::Bare => {
                let label = body.trim();
                if label.is_empty() {
                    return MarkerMatch::Malformed;
                }
                let (file, info) = split_bare_label(label);
                MarkerMatch::Accepted(file, info)
            }
        }
    }
}

/// Outcome of trying one grammar on a marker body
#[derive(Debug, PartialEq, Eq)]
enum MarkerMatch {
    /// `(file, info)` read out of the body
    Accepted(String, String),
    /// The grammar does not apply; try the next candidate
    NotApplicable,
    /// The body commits to this grammar but breaks it; reject the marker
    Malformed,
}

/// Split a free-form label into `(file, info)`
///
/// - `"<file> at <time>"` splits at the last `" at "` whose suffix holds
///   a time token.
/// - Otherwise a leading token with a file extension is the file and the
///   remainder is the info (`"plan.pdf Page 3"`).
/// - Otherwise the whole label is the file.
fn split_bare_label(label: &str) -> (String, String) {
    if let Some(pos) = label.rfind(BARE_TIME_SEPARATOR) {
        let (file, rest) = (&label[..pos], &label[pos + BARE_TIME_SEPARATOR.len()..]);
        if !file.trim().is_empty() && find_time_token(rest).is_some() {
            return (file.trim().to_string(), rest.trim().to_string());
        }
    }

    if let Some((first, rest)) = label.split_once(char::is_whitespace) {
        if extension(first).is_some() {
            return (first.to_string(), rest.trim().to_string());
        }
    }

    (label.to_string(), String::new())
}

/// A citation found in an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationRef {
    /// Deterministic identifier (marker text + byte offset)
    pub id: String,
    pub form: CitationForm,
    pub source_file: String,
    pub extra_info: String,
    pub evidence: EvidenceDescriptor,
}

impl CitationRef {
    /// Human-readable label shown in place of the marker
    pub fn display_label(&self) -> String {
        match self.form {
            CitationForm::Pipe => format!("{} | {}", self.source_file, self.extra_info),
            CitationForm::Bare if self.extra_info.is_empty() => self.source_file.clone(),
            CitationForm::Bare => {
                // keep the label's own separator for the time form
                if find_time_token(&self.extra_info).is_some() {
                    format!("{}{}{}", self.source_file, BARE_TIME_SEPARATOR, self.extra_info)
                } else {
                    format!("{} {}", self.source_file, self.extra_info)
                }
            }
        }
    }
}

/// One renderable piece of an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    PlainText { content: String },
    Citation(CitationRef),
}

impl Segment {
    /// Text this segment contributes to the readable answer
    pub fn display_text(&self) -> String {
        match self {
            Segment::PlainText { content } => content.clone(),
            Segment::Citation(citation) => citation.display_label(),
        }
    }

    pub fn as_citation(&self) -> Option<&CitationRef> {
        match self {
            Segment::Citation(citation) => Some(citation),
            Segment::PlainText { .. } => None,
        }
    }
}

/// Concatenate the display text of all segments
pub fn render_plain(segments: &[Segment]) -> String {
    segments.iter().map(Segment::display_text).collect()
}

/// All citations in order of appearance
pub fn citations(segments: &[Segment]) -> Vec<&CitationRef> {
    segments.iter().filter_map(Segment::as_citation).collect()
}

/// Compute a deterministic citation ID
///
/// sha256(marker + offset)[0:8] as 16 hex chars.
pub fn compute_citation_id(marker: &str, offset: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(marker.as_bytes());
    hasher.update(offset.to_string().as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..8])
}

/// Scanner for annotated answers
#[derive(Debug, Clone, Default)]
pub struct CitationParser {
    classifier: EvidenceClassifier,
}

impl CitationParser {
    pub fn new(classifier: EvidenceClassifier) -> Self {
        Self { classifier }
    }

    /// Parse an answer into ordered segments
    ///
    /// Empty input yields no segments; input without markers yields one
    /// plain-text segment. Adjacent text runs (including rejected markers)
    /// are merged, and empty text segments are never emitted.
    pub fn parse(&self, text: &str) -> Vec<Segment> {
        static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"\[Source:([^\[\]\n]*)\]").expect("valid regex")
        });

        let mut segments = Vec::new();
        let mut last_end = 0;

        for caps in MARKER_RE.captures_iter(text) {
            let (Some(whole), Some(body)) = (caps.get(0), caps.get(1)) else {
                continue;
            };

            let Some((form, file, info)) = match_marker(body.as_str()) else {
                // rejected marker: leave it in the surrounding text
                continue;
            };

            push_text(&mut segments, &text[last_end..whole.start()]);

            let evidence = self.classifier.classify(&file, &info);
            segments.push(Segment::Citation(CitationRef {
                id: compute_citation_id(whole.as_str(), whole.start()),
                form,
                source_file: file,
                extra_info: info,
                evidence,
            }));

            last_end = whole.end();
        }

        push_text(&mut segments, &text[last_end..]);
        segments
    }
}

/// Run the candidate grammars over a marker body
fn match_marker(body: &str) -> Option<(CitationForm, String, String)> {
    for form in CitationForm::CANDIDATES {
        match form.accept(body) {
            MarkerMatch::Accepted(file, info) => return Some((form, file, info)),
            MarkerMatch::NotApplicable => continue,
            MarkerMatch::Malformed => return None,
        }
    }
    None
}

/// Append text, merging into a trailing plain-text segment
fn push_text(segments: &mut Vec<Segment>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Segment::PlainText { content }) = segments.last_mut() {
        content.push_str(text);
        return;
    }
    segments.push(Segment::PlainText {
        content: text.to_string(),
    });
}
