//! HTTP client for the FastAPI RAG backend.
//!
//! Endpoints:
//! - `POST /query`  JSON `{ "query": ... }`
//! - `POST /upload` multipart field `file`
//! - `GET /`        health message

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{Backend, BackendError};
use crate::annotation::extension;
use crate::domain::{QueryRequest, QueryResponse, UploadResponse};

/// File types the backend knows how to ingest
pub const UPLOAD_EXTENSIONS: [&str; 7] = ["pdf", "mp3", "wav", "jpg", "png", "jpeg", "txt"];

/// Backend client over HTTP
pub struct HttpBackend {
    base_url: String,
    max_upload_bytes: u64,
    client: reqwest::Client,
}

impl HttpBackend {
    /// Create a new client
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        max_upload_bytes: u64,
    ) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url: String = base_url.into();

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            max_upload_bytes,
            client,
        })
    }

    /// Create from resolved configuration
    pub fn from_config(config: &crate::config::ResolvedConfig) -> Result<Self, BackendError> {
        Self::new(
            config.backend.url.clone(),
            Duration::from_secs(config.backend.timeout_seconds),
            config.upload_max_bytes,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build endpoint URL
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Decode a JSON body, turning non-2xx into `BackendError::Status`
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

/// Check an upload against the accepted types and size ceiling
pub fn validate_upload(path: &Path, size: u64, limit: u64) -> Result<(), BackendError> {
    let name = path.file_name().unwrap_or_default().to_string_lossy();

    match extension(&name) {
        Some(ext) if UPLOAD_EXTENSIONS.contains(&ext.as_str()) => {}
        _ => return Err(BackendError::UnsupportedFileType(name.to_string())),
    }

    if size > limit {
        return Err(BackendError::FileTooLarge {
            actual: size,
            limit,
        });
    }

    Ok(())
}

#[async_trait]
impl Backend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn query(&self, question: &str) -> Result<QueryResponse, BackendError> {
        debug!(url = %self.url("query"), "Sending query");

        let response = self
            .client
            .post(self.url("query"))
            .json(&QueryRequest {
                query: question.to_string(),
            })
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn upload(&self, path: &Path) -> Result<UploadResponse, BackendError> {
        let metadata = tokio::fs::metadata(path).await?;
        validate_upload(path, metadata.len(), self.max_upload_bytes)?;

        let file_name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        let file_bytes = tokio::fs::read(path).await?;
        debug!(file = %file_name, bytes = file_bytes.len(), "Uploading file");

        let form = Form::new().part("file", Part::bytes(file_bytes).file_name(file_name));

        let response = self
            .client
            .post(self.url("upload"))
            .multipart(form)
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn health_check(&self) -> Result<String, BackendError> {
        let response = self.client.get(self.url("")).send().await?;
        let body: UploadResponse = Self::decode(response).await?;
        Ok(body.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_url_building() {
        let backend =
            HttpBackend::new("http://localhost:8000/", Duration::from_secs(5), 1024).unwrap();
        assert_eq!(backend.url("query"), "http://localhost:8000/query");
        assert_eq!(backend.url("/upload"), "http://localhost:8000/upload");
        assert_eq!(backend.url(""), "http://localhost:8000/");
    }

    #[test]
    fn test_validate_upload_types() {
        assert!(validate_upload(&PathBuf::from("/tmp/plan.pdf"), 10, 100).is_ok());
        assert!(validate_upload(&PathBuf::from("rec.WAV"), 10, 100).is_ok());
        assert!(matches!(
            validate_upload(&PathBuf::from("tool.exe"), 10, 100),
            Err(BackendError::UnsupportedFileType(_))
        ));
        assert!(matches!(
            validate_upload(&PathBuf::from("noext"), 10, 100),
            Err(BackendError::UnsupportedFileType(_))
        ));
    }

    #[test]
    fn test_validate_upload_size() {
        let result = validate_upload(&PathBuf::from("big.mp3"), 200, 100);
        assert!(matches!(
            result,
            Err(BackendError::FileTooLarge { actual: 200, limit: 100 })
        ));
    }

    #[tokio::test]
    async fn test_query_unreachable_is_transport_error() {
        // port 9 (discard) on localhost is not an HTTP server
        let backend =
            HttpBackend::new("http://127.0.0.1:9", Duration::from_secs(2), 1024).unwrap();
        let result = backend.query("anything").await;
        assert!(matches!(result, Err(BackendError::Transport(_))));
    }
}
