//! TOML configuration file loading
//!
//! Supports `~/.config/jarvis/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct JarvisConfigFile {
    /// Listener and session limits
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Memory store settings
    #[serde(default)]
    pub memory: MemoryFileConfig,

    /// Identity facts seeded at startup
    #[serde(default)]
    pub identity: IdentityFileConfig,

    /// Information retrieval settings
    #[serde(default)]
    pub retriever: RetrieverFileConfig,

    /// Response shaping
    #[serde(default)]
    pub processor: ProcessorFileConfig,

    /// LLM configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Voice/audio configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub max_request_bytes: Option<usize>,
    pub read_timeout_secs: Option<u64>,
    pub max_sessions: Option<usize>,
}

/// Memory store configuration
#[derive(Debug, Default, Deserialize)]
pub struct MemoryFileConfig {
    /// Path to the `SQLite` database
    pub db_path: Option<String>,
    /// How long conversation entries stay visible
    pub retention_secs: Option<u64>,
    /// Interval between background sweeps
    pub sweep_interval_secs: Option<u64>,
}

/// Identity facts
#[derive(Debug, Default, Deserialize)]
pub struct IdentityFileConfig {
    pub user_name: Option<String>,
    pub assistant_name: Option<String>,
    pub relationship: Option<String>,
}

/// Information retrieval configuration
#[derive(Debug, Default, Deserialize)]
pub struct RetrieverFileConfig {
    pub default_city: Option<String>,
    pub default_topic: Option<String>,
    pub summarize_timeout_secs: Option<u64>,
    pub provider_timeout_secs: Option<u64>,
    /// Summary cache capacity (0 = unbounded)
    pub summary_cache_capacity: Option<usize>,
    pub encyclopedia_language: Option<String>,
    pub search_results: Option<usize>,
    pub news_articles: Option<usize>,
    /// Whitelisted applications: spoken name -> executable path
    pub applications: Option<BTreeMap<String, String>>,
}

/// Response shaping configuration
#[derive(Debug, Default, Deserialize)]
pub struct ProcessorFileConfig {
    pub max_response_chars: Option<usize>,
}

/// LLM-related configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// OpenAI-compatible base URL (e.g. "http://localhost:11434/v1")
    pub base_url: Option<String>,
    /// Model identifier
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Voice synthesis configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// OpenAI-compatible speech base URL (e.g. a local TTS server)
    pub base_url: Option<String>,
    /// TTS model (e.g. "tts-1")
    pub model: Option<String>,
    /// TTS voice identifier (e.g. "alloy")
    pub voice: Option<String>,
    /// TTS speed multiplier
    pub speed: Option<f32>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub llm: Option<String>,
    pub openai: Option<String>,
    pub openweather: Option<String>,
    pub newsapi: Option<String>,
    pub serpapi: Option<String>,
}

/// Parse config file contents
///
/// # Errors
///
/// Returns error if the TOML is malformed
pub fn parse_config_file(content: &str) -> crate::Result<JarvisConfigFile> {
    Ok(toml::from_str(content)?)
}

/// Load the TOML config file from `path`, or the standard path when `None`
///
/// Returns `JarvisConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file(path: Option<&Path>) -> JarvisConfigFile {
    let Some(path) = path.map(Path::to_path_buf).or_else(config_file_path) else {
        return JarvisConfigFile::default();
    };

    if !path.exists() {
        return JarvisConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match parse_config_file(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                JarvisConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            JarvisConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/jarvis/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("jarvis").join("config.toml"))
}
