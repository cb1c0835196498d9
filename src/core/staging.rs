//! Producers of stage-update events.
//!
//! The orchestrator consumes stage updates from a channel and does not
//! care who produces them. `SimulatedStages` walks the pipeline with fixed
//! pauses as a stand-in until the backend pushes real progress; a
//! server-push or polling source only needs to implement `StageSource`.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::domain::{ProcessingStage, StageUpdate};

/// Source of stage updates for one query
#[async_trait]
pub trait StageSource: Send + Sync {
    /// Human-readable source name
    fn name(&self) -> &str;

    /// Emit updates tagged with `seq` until this query's stream ends
    ///
    /// Returning ends the stream. A closed receiver is not an error.
    async fn drive(&self, seq: u64, tx: mpsc::Sender<StageUpdate>) -> Result<()>;
}

/// Pause after each stage is reported, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDelays {
    #[serde(default = "default_ingest_ms")]
    pub ingest: u64,
    #[serde(default = "default_listen_ms")]
    pub listen: u64,
    #[serde(default = "default_vision_ms")]
    pub vision: u64,
    #[serde(default = "default_conflict_ms")]
    pub conflict: u64,
    #[serde(default)]
    pub generate: u64,
}

fn default_ingest_ms() -> u64 {
    1000
}
fn default_listen_ms() -> u64 {
    1500
}
fn default_vision_ms() -> u64 {
    1000
}
fn default_conflict_ms() -> u64 {
    800
}

impl Default for StageDelays {
    fn default() -> Self {
        Self {
            ingest: default_ingest_ms(),
            listen: default_listen_ms(),
            vision: default_vision_ms(),
            conflict: default_conflict_ms(),
            generate: 0,
        }
    }
}

impl StageDelays {
    /// No pauses at all (tests, `--no-stages`)
    pub fn zero() -> Self {
        Self {
            ingest: 0,
            listen: 0,
            vision: 0,
            conflict: 0,
            generate: 0,
        }
    }

    pub fn after(&self, stage: ProcessingStage) -> Duration {
        let ms = match stage {
            ProcessingStage::Ingest => self.ingest,
            ProcessingStage::Listen => self.listen,
            ProcessingStage::Vision => self.vision,
            ProcessingStage::Conflict => self.conflict,
            ProcessingStage::Generate => self.generate,
        };
        Duration::from_millis(ms)
    }
}

/// Fixed-delay walk through every stage in order
#[derive(Debug, Clone, Default)]
pub struct SimulatedStages {
    delays: StageDelays,
}

impl SimulatedStages {
    pub fn new(delays: StageDelays) -> Self {
        Self { delays }
    }
}

#[async_trait]
impl StageSource for SimulatedStages {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn drive(&self, seq: u64, tx: mpsc::Sender<StageUpdate>) -> Result<()> {
        for stage in ProcessingStage::ALL {
            if tx.send(StageUpdate::stage(seq, stage)).await.is_err() {
                debug!(seq, "Stage receiver closed, stopping simulation");
                return Ok(());
            }

            let pause = self.delays.after(stage);
            if !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
        }
        Ok(())
    }
}

/// Emits nothing; the tracker jumps straight from idle to done
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStages;

#[async_trait]
impl StageSource for NoStages {
    fn name(&self) -> &str {
        "none"
    }

    async fn drive(&self, _seq: u64, _tx: mpsc::Sender<StageUpdate>) -> Result<()> {
        Ok(())
    }
}
