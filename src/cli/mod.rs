//! Command-line interface for chakravyuh.
//!
//! Provides commands for asking questions, parsing answer text offline,
//! uploading evidence, and inspecting past queries.

use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::adapters::{Backend, HttpBackend};
use crate::annotation::{citations, CitationParser, ConflictVerdict, EvidenceClassifier, Segment};
use crate::config::{self, ResolvedConfig};
use crate::core::{NoStages, Orchestrator, QueryStore};
use crate::domain::{QueryRecord, StageCursor};

pub mod render;

/// chakravyuh - Evidence-linked answers from a multimodal RAG backend
#[derive(Parser, Debug)]
#[command(name = "chakravyuh")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask the backend a question
    Ask {
        /// The question
        query: String,

        /// Skip the stage progress display
        #[arg(long)]
        no_stages: bool,

        /// Print the processed answer as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse answer text for citations and conflicts (no backend needed)
    Parse {
        /// Input file (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Print segments as JSON
        #[arg(long)]
        json: bool,
    },

    /// Upload a document, recording or image to the backend
    Upload {
        /// File to upload
        file: PathBuf,
    },

    /// Show the processing stages
    Stages {
        /// Current stage id (ingest, listen, vision, conflict, generate, done)
        #[arg(short, long)]
        current: Option<String>,
    },

    /// List recent queries
    History {
        /// Maximum number of queries to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show a past query and its answer
    Show {
        /// Query ID (UUID)
        query_id: String,
    },

    /// Check that the backend is reachable
    Health,

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Ask {
                query,
                no_stages,
                json,
            } => ask(&query, no_stages, json).await,
            Commands::Parse { input, json } => parse_answer(input, json),
            Commands::Upload { file } => upload(&file).await,
            Commands::Stages { current } => show_stages(current.as_deref()),
            Commands::History { limit } => list_history(limit).await,
            Commands::Show { query_id } => show_query(&query_id).await,
            Commands::Health => health().await,
            Commands::Config => show_config(),
        }
    }
}

fn backend(cfg: &ResolvedConfig) -> Result<Arc<dyn Backend>> {
    let backend = HttpBackend::from_config(cfg).context("Failed to create backend client")?;
    Ok(Arc::new(backend))
}

fn parser(cfg: &ResolvedConfig) -> CitationParser {
    CitationParser::new(EvidenceClassifier::new(cfg.static_base.clone()))
}

/// Ask a question and render the answer
async fn ask(query: &str, no_stages: bool, json: bool) -> Result<()> {
    let cfg = config::config()?;
    let mut orchestrator = Orchestrator::from_config(cfg, backend(cfg)?);
    if no_stages {
        orchestrator = orchestrator.with_stages(Arc::new(NoStages));
    }

    eprintln!("🔎 Asking: {}", query.trim());

    let mut last = None;
    let answer = orchestrator
        .ask_with(query, |lifecycle| {
            let cursor = lifecycle.cursor();
            if !no_stages && last != Some(cursor) {
                eprintln!("{}", render::stage_line(cursor));
                last = Some(cursor);
            }
        })
        .await?;

    if answer.degraded {
        eprintln!("⚠️  Backend unreachable, showing the offline demo answer");
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&answer).context("Failed to serialize answer")?
        );
    } else {
        println!("\n{}", render::answer_report(&answer));
    }

    eprintln!("[Query {} completed]", answer.query_id);
    Ok(())
}

/// Parse answer text from a file or stdin
fn parse_answer(input_file: Option<PathBuf>, json: bool) -> Result<()> {
    let text = if let Some(path) = input_file {
        std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?
    } else if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        buffer
    } else {
        anyhow::bail!("No input provided. Use --input <file> or pipe to stdin");
    };

    let cfg = config::config()?;
    let segments = parser(cfg).parse(&text);
    let verdict = ConflictVerdict::from_text(&text, cfg.conflict.default_confidence);

    if json {
        let report = serde_json::json!({
            "segments": segments,
            "conflict": verdict,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize segments")?
        );
        return Ok(());
    }

    print_segments(&segments, &verdict);
    Ok(())
}

fn print_segments(segments: &[Segment], verdict: &ConflictVerdict) {
    println!("{}", render::answer_body(segments).trim_end());

    let cited = citations(segments);
    if !cited.is_empty() {
        println!("\nCitations:");
        for (i, citation) in cited.iter().enumerate() {
            println!("{}", render::citation_line(i + 1, citation));
        }
    }

    println!("\n{}", render::verdict_line(verdict));
}

/// Upload a file to the backend
async fn upload(path: &Path) -> Result<()> {
    let cfg = config::config()?;
    let backend = backend(cfg)?;

    eprintln!("📤 Uploading {}...", path.display());

    let response = backend
        .upload(path)
        .await
        .with_context(|| format!("Upload failed: {}", path.display()))?;

    println!("{}", response.message);
    if let Some(chunks) = response.chunks_added {
        eprintln!("   Chunks added: {}", chunks);
    }
    if let Some(url) = response.url {
        eprintln!("   URL: {}", url);
    }

    Ok(())
}

/// Print the stage board for a given cursor
fn show_stages(current: Option<&str>) -> Result<()> {
    let cursor: StageCursor = match current {
        Some(id) => id.parse()?,
        None => StageCursor::Idle,
    };

    print!("{}", render::stage_board(cursor));
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

fn record_state(record: &QueryRecord) -> &'static str {
    if record.is_finished() {
        "done"
    } else if record.superseded {
        "superseded"
    } else {
        "incomplete"
    }
}

/// List recent queries
async fn list_history(limit: usize) -> Result<()> {
    let query_ids = QueryStore::list_queries().await?;
    let mut records = Vec::new();

    for query_id in query_ids {
        let store = QueryStore::open(query_id).await?;
        match store.record().await {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) => tracing::debug!(%query_id, error = %e, "Skipping unreadable query log"),
        }
    }

    if records.is_empty() {
        println!("No queries found");
        return Ok(());
    }

    // Most recent first
    records.sort_by(|a, b| b.started_at.cmp(&a.started_at));

    println!("{:<38} {:<12} {:<10} {:<40}", "QUERY ID", "STATE", "CONFLICT", "QUESTION");
    println!("{}", "-".repeat(100));

    for record in records.iter().take(limit) {
        let conflict = match (record.verdict, record.degraded) {
            (_, true) => "fallback".to_string(),
            (Some(v), false) if v.flagged => v.percent(),
            (Some(_), false) => "none".to_string(),
            (None, false) => "-".to_string(),
        };
        println!(
            "{:<38} {:<12} {:<10} {:<40}",
            record.query_id,
            record_state(record),
            conflict,
            truncate(&record.question, 40)
        );
    }

    Ok(())
}

/// Show a past query
async fn show_query(query_id_str: &str) -> Result<()> {
    let query_id = Uuid::parse_str(query_id_str)
        .with_context(|| format!("Invalid query ID: {}", query_id_str))?;

    let store = QueryStore::open(query_id).await?;
    let record = store
        .record()
        .await?
        .with_context(|| format!("Query {} not found", query_id))?;

    println!("Query ID: {}", record.query_id);
    println!("Question: {}", record.question);
    println!("State: {}", record_state(&record));
    println!("Started: {}", record.started_at);
    if let Some(completed) = record.completed_at {
        println!("Completed: {}", completed);
    }
    if record.degraded {
        println!("Answer: offline fallback");
    }
    println!("\nStages:");
    print!("{}", render::stage_board(record.cursor));

    if let Some(text) = store.load_answer().await? {
        let cfg = config::config()?;
        let verdict = record
            .verdict
            .unwrap_or_else(|| ConflictVerdict::from_text(&text, cfg.conflict.default_confidence));

        println!();
        print_segments(&parser(cfg).parse(&text), &verdict);
    }

    Ok(())
}

/// Check backend reachability
async fn health() -> Result<()> {
    let cfg = config::config()?;
    let backend = backend(cfg)?;

    let message = backend
        .health_check()
        .await
        .with_context(|| format!("Backend at {} is not reachable", cfg.backend.url))?;

    eprintln!("✅ Backend at {} is up", cfg.backend.url);
    println!("{}", message);
    Ok(())
}

/// Show the resolved configuration (for debugging)
fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("Chakravyuh Configuration");
    println!("{}", "=".repeat(40));
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:    {}", cfg.home.display());
    println!("  Queries: {}", cfg.queries_dir().display());
    println!();
    println!("Backend:");
    println!("  URL:     {}", cfg.backend.url);
    println!("  Timeout: {}s", cfg.backend.timeout_seconds);
    println!();
    println!("Evidence:");
    println!("  Static base: {}", cfg.static_base);
    println!();
    println!("Stages:");
    println!("  Mode: {}", cfg.stages.mode);
    let d = &cfg.stages.delays;
    println!(
        "  Delays (ms): ingest {}, listen {}, vision {}, conflict {}, generate {}",
        d.ingest, d.listen, d.vision, d.conflict, d.generate
    );
    println!();
    println!("Conflict:");
    println!("  Default confidence:  {}", cfg.conflict.default_confidence);
    println!("  Fallback confidence: {}", cfg.conflict.fallback_confidence);
    println!();
    println!("Upload limit: {} bytes", cfg.upload_max_bytes);

    Ok(())
}
