//! Adapter interfaces for the RAG backend.
//!
//! The core never talks HTTP directly; it goes through the `Backend`
//! trait so the transport can be swapped (or mocked in tests).

pub mod fallback;
pub mod http;

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{QueryResponse, UploadResponse};

pub use fallback::fallback_answer;
pub use http::{validate_upload, HttpBackend, UPLOAD_EXTENSIONS};

/// Errors surfaced by backend adapters
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("File too large: {actual} bytes (limit {limit})")]
    FileTooLarge { actual: u64, limit: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for RAG backends
#[async_trait]
pub trait Backend: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Ask a question (`POST /query`)
    async fn query(&self, question: &str) -> Result<QueryResponse, BackendError>;

    /// Upload a document for ingestion (`POST /upload`)
    async fn upload(&self, path: &Path) -> Result<UploadResponse, BackendError>;

    /// Health check (`GET /`)
    async fn health_check(&self) -> Result<String, BackendError>;
}
