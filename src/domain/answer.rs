//! Backend wire types and the rendered answer.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::annotation::{citations, CitationRef, ConflictVerdict, Segment};

/// Body of `POST /query`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

/// Success body of `POST /query`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Answer text with inline citation markers
    pub answer: String,

    /// Retrieved context metadata
    #[serde(default)]
    pub sources: Vec<SourceRecord>,

    /// Structured verdict, when the backend provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict: Option<ConflictVerdict>,
}

/// Metadata of one retrieved context chunk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Source filename
    #[serde(default)]
    pub source: String,

    /// Modality reported by the backend (`pdf`, `audio`, `image`, `text`)
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    /// Start time of an audio chunk (`MM:SS`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// Reference the model was asked to cite
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation_ref: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,

    /// Any other metadata, preserved verbatim
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl SourceRecord {
    /// Label for the evidence board
    pub fn display_ref(&self) -> &str {
        self.citation_ref
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(if self.source.is_empty() {
                "Unknown Source"
            } else {
                &self.source
            })
    }

    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or("text")
    }
}

/// Body of `POST /upload` (and `GET /`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks_added: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A fully processed answer, ready for rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub query_id: Uuid,

    /// Raw answer text
    pub text: String,

    pub segments: Vec<Segment>,

    pub verdict: ConflictVerdict,

    #[serde(default)]
    pub sources: Vec<SourceRecord>,

    /// Produced by the fallback path rather than the backend
    #[serde(default)]
    pub degraded: bool,
}

impl Answer {
    pub fn citations(&self) -> Vec<&CitationRef> {
        citations(&self.segments)
    }
}
