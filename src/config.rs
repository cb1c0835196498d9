//! Configuration for chakravyuh.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (CHAKRAVYUH_HOME, CHAKRAVYUH_BACKEND_URL, CHAKRAVYUH_STATIC_BASE)
//! 2. Config file (.chakravyuh/config.yaml)
//! 3. Defaults (~/.chakravyuh, http://localhost:8000, /static)
//!
//! Config file discovery:
//! - Searches current directory and parents for .chakravyuh/config.yaml
//! - `paths.home` is relative to the .chakravyuh/ directory

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::annotation::classify::DEFAULT_STATIC_BASE;
use crate::core::staging::StageDelays;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

pub const CONFIG_DIR: &str = ".chakravyuh";
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_CONFIDENCE: f64 = 0.85;
pub const FALLBACK_CONFIDENCE: f64 = 0.92;
pub const DEFAULT_UPLOAD_MAX_BYTES: u64 = 50 * 1024 * 1024;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub backend: Option<BackendConfig>,
    #[serde(default)]
    pub evidence: Option<EvidenceConfig>,
    #[serde(default)]
    pub stages: Option<StagesConfig>,
    #[serde(default)]
    pub conflict: Option<ConflictConfig>,
    #[serde(default)]
    pub upload: Option<UploadConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Query log directory (relative to .chakravyuh/)
    pub home: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub url: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvidenceConfig {
    pub static_base: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StagesConfig {
    pub mode: Option<StageMode>,
    pub delays: Option<StageDelays>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConflictConfig {
    pub default_confidence: Option<f64>,
    pub fallback_confidence: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub max_bytes: Option<u64>,
}

/// Where stage updates come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageMode {
    /// Fixed-delay walk through every stage
    #[default]
    Simulated,
    /// No stage updates; idle until the answer lands
    None,
}

impl fmt::Display for StageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageMode::Simulated => write!(f, "simulated"),
            StageMode::None => write!(f, "none"),
        }
    }
}

impl FromStr for StageMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "simulated" => Ok(StageMode::Simulated),
            "none" | "off" => Ok(StageMode::None),
            other => anyhow::bail!("Unknown stage mode: {}", other),
        }
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to chakravyuh home (query logs)
    pub home: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub backend: BackendSettings,
    /// Base path prepended to evidence file names
    pub static_base: String,
    pub stages: StageSettings,
    pub conflict: ConflictSettings,
    pub upload_max_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub url: String,
    pub timeout_seconds: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_BACKEND_URL.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StageSettings {
    pub mode: StageMode,
    pub delays: StageDelays,
}

#[derive(Debug, Clone, Copy)]
pub struct ConflictSettings {
    /// Confidence reported for a marker-detected conflict
    pub default_confidence: f64,
    /// Confidence reported with the degraded demo answer
    pub fallback_confidence: f64,
}

impl Default for ConflictSettings {
    fn default() -> Self {
        Self {
            default_confidence: DEFAULT_CONFIDENCE,
            fallback_confidence: FALLBACK_CONFIDENCE,
        }
    }
}

impl ResolvedConfig {
    /// Defaults rooted at the given home directory
    pub fn with_home(home: PathBuf) -> Self {
        Self {
            home,
            config_file: None,
            backend: BackendSettings::default(),
            static_base: DEFAULT_STATIC_BASE.to_string(),
            stages: StageSettings::default(),
            conflict: ConflictSettings::default(),
            upload_max_bytes: DEFAULT_UPLOAD_MAX_BYTES,
        }
    }

    /// Directory holding one subdirectory per query
    pub fn queries_dir(&self) -> PathBuf {
        self.home.join("queries")
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(CONFIG_DIR).join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Merge config file and environment over the defaults
fn resolve(
    default_home: PathBuf,
    config_file: Option<PathBuf>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedConfig> {
    let mut resolved = ResolvedConfig::with_home(default_home);

    if let Some(ref config_path) = config_file {
        let config = load_config_file(config_path)?;

        if let Some(ref home_path) = config.paths.home {
            // home is relative to .chakravyuh/ directory
            let config_dir = config_path.parent().unwrap_or(Path::new("."));
            resolved.home = resolve_path(config_dir, home_path);
        }

        if let Some(backend) = config.backend {
            if let Some(url) = backend.url {
                resolved.backend.url = url;
            }
            if let Some(timeout) = backend.timeout_seconds {
                resolved.backend.timeout_seconds = timeout;
            }
        }

        if let Some(base) = config.evidence.and_then(|e| e.static_base) {
            resolved.static_base = base;
        }

        if let Some(stages) = config.stages {
            resolved.stages.mode = stages.mode.unwrap_or_default();
            resolved.stages.delays = stages.delays.unwrap_or_default();
        }

        if let Some(conflict) = config.conflict {
            if let Some(c) = conflict.default_confidence {
                resolved.conflict.default_confidence = c.clamp(0.0, 1.0);
            }
            if let Some(c) = conflict.fallback_confidence {
                resolved.conflict.fallback_confidence = c.clamp(0.0, 1.0);
            }
        }

        if let Some(max) = config.upload.and_then(|u| u.max_bytes) {
            resolved.upload_max_bytes = max;
        }
    }

    if let Some(home) = env("CHAKRAVYUH_HOME") {
        resolved.home = PathBuf::from(home);
    }
    if let Some(url) = env("CHAKRAVYUH_BACKEND_URL") {
        resolved.backend.url = url;
    }
    if let Some(base) = env("CHAKRAVYUH_STATIC_BASE") {
        resolved.static_base = base;
    }

    resolved.config_file = config_file;
    Ok(resolved)
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(CONFIG_DIR);

    resolve(default_home, find_config_file(), |key| {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Get the queries directory ($CHAKRAVYUH_HOME/queries)
pub fn queries_dir() -> Result<PathBuf> {
    Ok(config()?.queries_dir())
}
