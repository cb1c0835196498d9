//! Append-only query log with file-based persistence.
//!
//! Each query gets its own directory holding `events.jsonl` (one
//! `LifecycleEvent` per line) and the final `answer.md`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use uuid::Uuid;

use crate::domain::{LifecycleEvent, QueryRecord};

const EVENTS_FILE: &str = "events.jsonl";
const ANSWER_FILE: &str = "answer.md";

/// File-based event store for one query
pub struct QueryStore {
    /// Directory containing the query
    query_dir: PathBuf,

    /// Path to the events.jsonl file
    events_path: PathBuf,
}

impl QueryStore {
    /// Create or open the store for a query under the configured home
    pub async fn open(query_id: Uuid) -> Result<Self> {
        let base_dir = Self::base_directory()?;
        Self::open_in(&base_dir, query_id).await
    }

    /// Create or open the store for a query under `base_dir`
    pub async fn open_in(base_dir: &Path, query_id: Uuid) -> Result<Self> {
        let query_dir = base_dir.join(query_id.to_string());

        fs::create_dir_all(&query_dir)
            .await
            .with_context(|| format!("Failed to create query directory: {}", query_dir.display()))?;

        let events_path = query_dir.join(EVENTS_FILE);

        Ok(Self {
            query_dir,
            events_path,
        })
    }

    /// Get the base directory for all queries (~/.chakravyuh/queries or $CHAKRAVYUH_HOME/queries)
    pub fn base_directory() -> Result<PathBuf> {
        crate::config::queries_dir()
    }

    /// Get the path to the events file
    pub fn events_path(&self) -> &Path {
        &self.events_path
    }

    /// Get the query directory
    pub fn query_dir(&self) -> &Path {
        &self.query_dir
    }

    /// Store the rendered answer
    pub async fn store_answer(&self, content: &str) -> Result<PathBuf> {
        let answer_path = self.query_dir.join(ANSWER_FILE);

        fs::write(&answer_path, content)
            .await
            .with_context(|| format!("Failed to write answer: {}", answer_path.display()))?;

        Ok(answer_path)
    }

    /// Load the stored answer, if any
    pub async fn load_answer(&self) -> Result<Option<String>> {
        let answer_path = self.query_dir.join(ANSWER_FILE);

        if !answer_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&answer_path)
            .await
            .with_context(|| format!("Failed to read answer: {}", answer_path.display()))?;

        Ok(Some(content))
    }

    /// Append an event to the log
    pub async fn append(&self, event: &LifecycleEvent) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.events_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to open events file: {}",
                    self.events_path.display()
                )
            })?;

        let json = serde_json::to_string(event).context("Failed to serialize event")?;
        file.write_all(format!("{}\n", json).as_bytes())
            .await
            .context("Failed to write event")?;
        file.flush().await.context("Failed to flush event")?;

        Ok(())
    }

    /// Replay all events in order
    pub async fn replay(&self) -> Result<Vec<LifecycleEvent>> {
        if !self.events_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.events_path)
            .await
            .with_context(|| format!("Failed to open events file: {}", self.events_path.display()))?;

        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut events = Vec::new();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let event: LifecycleEvent = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse event: {}", line))?;
            events.push(event);
        }

        Ok(events)
    }

    /// Rebuild the query summary from its log
    pub async fn record(&self) -> Result<Option<QueryRecord>> {
        let events = self.replay().await?;
        Ok(QueryRecord::from_events(&events))
    }

    /// List all query IDs under the configured home
    pub async fn list_queries() -> Result<Vec<Uuid>> {
        let base_dir = Self::base_directory()?;
        Self::list_queries_in(&base_dir).await
    }

    /// List all query IDs under `base_dir`
    pub async fn list_queries_in(base_dir: &Path) -> Result<Vec<Uuid>> {
        if !base_dir.exists() {
            return Ok(Vec::new());
        }

        let mut queries = Vec::new();
        let mut entries = fs::read_dir(base_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    if let Ok(uuid) = Uuid::parse_str(name) {
                        queries.push(uuid);
                    }
                }
            }
        }

        Ok(queries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventType, ProcessingStage, StageCursor};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_event_append_and_replay() {
        let temp = TempDir::new().unwrap();
        let query_id = Uuid::new_v4();
        let store = QueryStore::open_in(temp.path(), query_id).await.unwrap();

        store
            .append(&LifecycleEvent::new(query_id, EventType::QueryStarted, "q"))
            .await
            .unwrap();
        store
            .append(
                &LifecycleEvent::new(query_id, EventType::StageAdvanced, "ingest")
                    .with_cursor(StageCursor::At(ProcessingStage::Ingest)),
            )
            .await
            .unwrap();

        let events = store.replay().await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, EventType::QueryStarted);
        assert_eq!(events[1].cursor, Some(StageCursor::At(ProcessingStage::Ingest)));
    }

    #[tokio::test]
    async fn test_replay_missing_log_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = QueryStore::open_in(temp.path(), Uuid::new_v4()).await.unwrap();
        assert!(store.replay().await.unwrap().is_empty());
        assert!(store.record().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_answer_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = QueryStore::open_in(temp.path(), Uuid::new_v4()).await.unwrap();

        assert!(store.load_answer().await.unwrap().is_none());
        store.store_answer("# Answer\n\nQ4.").await.unwrap();
        assert_eq!(
            store.load_answer().await.unwrap().as_deref(),
            Some("# Answer\n\nQ4.")
        );
    }

    #[tokio::test]
    async fn test_list_queries_skips_foreign_entries() {
        let temp = TempDir::new().unwrap();
        let id = Uuid::new_v4();
        QueryStore::open_in(temp.path(), id).await.unwrap();
        std::fs::create_dir_all(temp.path().join("not-a-uuid")).unwrap();
        std::fs::write(temp.path().join(Uuid::new_v4().to_string()), "file").unwrap();

        let ids = QueryStore::list_queries_in(temp.path()).await.unwrap();
        assert_eq!(ids, vec![id]);
    }
}
