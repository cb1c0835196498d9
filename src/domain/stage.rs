//! Pipeline stages reported while a query is processed.

use serde::{Deserialize, Serialize};

/// A named phase of the backend's multi-modal retrieval pipeline.
///
/// Variants are declared in pipeline order; `index()` is that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStage {
    /// Loading and indexing documents
    Ingest,

    /// Speech transcription of audio sources
    Listen,

    /// Vision analysis of charts and images
    Vision,

    /// Contradiction check across sources
    Conflict,

    /// Answer generation
    Generate,
}

impl ProcessingStage {
    /// All stages in pipeline order
    pub const ALL: [ProcessingStage; 5] = [
        ProcessingStage::Ingest,
        ProcessingStage::Listen,
        ProcessingStage::Vision,
        ProcessingStage::Conflict,
        ProcessingStage::Generate,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Stable identifier used on the wire and in the CLI
    pub fn id(self) -> &'static str {
        match self {
            ProcessingStage::Ingest => "ingest",
            ProcessingStage::Listen => "listen",
            ProcessingStage::Vision => "vision",
            ProcessingStage::Conflict => "conflict",
            ProcessingStage::Generate => "generate",
        }
    }

    /// Display label for progress rendering
    pub fn label(self) -> &'static str {
        match self {
            ProcessingStage::Ingest => "Ingesting Documents",
            ProcessingStage::Listen => "Listening to Audio (Whisper)",
            ProcessingStage::Vision => "Analyzing Charts (Vision)",
            ProcessingStage::Conflict => "Checking for Conflicts",
            ProcessingStage::Generate => "Generating Answer",
        }
    }
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl std::str::FromStr for ProcessingStage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        ProcessingStage::ALL
            .into_iter()
            .find(|stage| stage.id() == s.trim().to_lowercase())
            .ok_or_else(|| anyhow::anyhow!("Unknown stage: {}", s))
    }
}

/// Currently-reported position of a query in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "stage")]
pub enum StageCursor {
    /// Nothing reported yet
    Idle,

    /// The given stage is in progress
    At(ProcessingStage),

    /// Terminal: every stage is complete
    Done,
}

impl StageCursor {
    /// Position in the stage order (`None` for `Idle` and `Done`)
    pub fn index(&self) -> Option<usize> {
        match self {
            StageCursor::At(stage) => Some(stage.index()),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, StageCursor::Done)
    }
}

impl Default for StageCursor {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for StageCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageCursor::Idle => write!(f, "idle"),
            StageCursor::At(stage) => write!(f, "{}", stage),
            StageCursor::Done => write!(f, "done"),
        }
    }
}

impl std::str::FromStr for StageCursor {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "done" => Ok(StageCursor::Done),
            "idle" | "none" | "" => Ok(StageCursor::Idle),
            other => other.parse().map(StageCursor::At),
        }
    }
}

/// Display status of one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Completed,
    Active,
    Pending,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Completed => "completed",
            StageStatus::Active => "active",
            StageStatus::Pending => "pending",
        }
    }
}

/// A stage-update event from the pipeline (or its simulation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageUpdate {
    /// Sequence number of the query this update belongs to
    pub seq: u64,

    pub cursor: StageCursor,
}

impl StageUpdate {
    pub fn new(seq: u64, cursor: StageCursor) -> Self {
        Self { seq, cursor }
    }

    pub fn stage(seq: u64, stage: ProcessingStage) -> Self {
        Self::new(seq, StageCursor::At(stage))
    }

    pub fn done(seq: u64) -> Self {
        Self::new(seq, StageCursor::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        let indices: Vec<usize> = ProcessingStage::ALL.iter().map(|s| s.index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert!(ProcessingStage::Ingest < ProcessingStage::Generate);
    }

    #[test]
    fn test_cursor_parsing() {
        assert_eq!("listen".parse::<StageCursor>().unwrap(), StageCursor::At(ProcessingStage::Listen));
        assert_eq!("DONE".parse::<StageCursor>().unwrap(), StageCursor::Done);
        assert_eq!("none".parse::<StageCursor>().unwrap(), StageCursor::Idle);
        assert!("upload".parse::<StageCursor>().is_err());
    }

    #[test]
    fn test_cursor_serialization() {
        let json = serde_json::to_string(&StageCursor::At(ProcessingStage::Vision)).unwrap();
        assert_eq!(json, r#"{"state":"at","stage":"vision"}"#);

        let parsed: StageCursor = serde_json::from_str(r#"{"state":"done"}"#).unwrap();
        assert_eq!(parsed, StageCursor::Done);
    }
}
