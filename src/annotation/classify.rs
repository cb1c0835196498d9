//! Evidence classification
//!
//! Maps a citation's source filename to an evidence modality and builds
//! the descriptor handed to the evidence viewer. Pure string mapping; no
//! filesystem or network access.

use serde::{Deserialize, Serialize};

use super::timestamp::{find_time_token, resolve};

/// Default base path under which the backend serves uploaded files
pub const DEFAULT_STATIC_BASE: &str = "/static";

/// Evidentiary medium of a citation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    /// PDF document (also the fallback for unknown extensions)
    Pdf,
    /// Audio recording
    Audio,
    /// Image or chart
    Image,
}

impl Modality {
    /// Infer modality from a filename extension (case-insensitive)
    pub fn from_file_name(file_name: &str) -> Self {
        match extension(file_name).as_deref() {
            Some("mp3" | "wav") => Modality::Audio,
            Some("png" | "jpg" | "jpeg") => Modality::Image,
            _ => Modality::Pdf,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Pdf => "pdf",
            Modality::Audio => "audio",
            Modality::Image => "image",
        }
    }
}

impl Default for Modality {
    fn default() -> Self {
        Self::Pdf
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Modality {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "pdf" => Ok(Modality::Pdf),
            "audio" => Ok(Modality::Audio),
            "image" => Ok(Modality::Image),
            _ => anyhow::bail!("Unknown modality: {}", s),
        }
    }
}

/// Lowercased file extension
///
/// Only the alphanumeric run after the last `.` counts, so
/// `"project_plan.pdf Page 3"` yields `pdf`.
pub fn extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.trim().rsplit_once('.')?;
    let ext: String = ext
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();

    if ext.is_empty() {
        None
    } else {
        Some(ext.to_ascii_lowercase())
    }
}

/// Pointer for the evidence viewer: what to open, where, and (audio) where to seek
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceDescriptor {
    pub modality: Modality,
    /// URL or path of the evidence file
    pub locator: String,
    /// Seek offset; only meaningful for audio, 0 otherwise
    pub timestamp_seconds: u64,
}

impl EvidenceDescriptor {
    /// Seek offset for audio evidence, `None` for other modalities
    pub fn seek_offset(&self) -> Option<u64> {
        match self.modality {
            Modality::Audio => Some(self.timestamp_seconds),
            _ => None,
        }
    }
}

/// Builds evidence descriptors from citation fields
#[derive(Debug, Clone)]
pub struct EvidenceClassifier {
    static_base: String,
}

impl Default for EvidenceClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_STATIC_BASE)
    }
}

impl EvidenceClassifier {
    /// Create a classifier serving evidence under `static_base`
    pub fn new(static_base: impl Into<String>) -> Self {
        let base: String = static_base.into();
        Self {
            static_base: base.trim_end_matches('/').to_string(),
        }
    }

    /// Deterministic locator for a source file
    pub fn locator(&self, source_file: &str) -> String {
        format!("{}/{}", self.static_base, source_file.trim())
    }

    /// Classify a citation into an evidence descriptor
    ///
    /// The timestamp is resolved only for audio evidence whose extra info
    /// carries a recognizable time token.
    pub fn classify(&self, source_file: &str, extra_info: &str) -> EvidenceDescriptor {
        let modality = Modality::from_file_name(source_file);

        let timestamp_seconds = match modality {
            Modality::Audio => find_time_token(extra_info).map(resolve).unwrap_or(0),
            _ => 0,
        };

        EvidenceDescriptor {
            modality,
            locator: self.locator(source_file),
            timestamp_seconds,
        }
    }
}
