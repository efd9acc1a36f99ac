//! Configuration management for the Jarvis gateway
//!
//! Layers, lowest to highest precedence: built-in defaults, the TOML config
//! file, then environment variables.

pub mod file;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::db::memory::{DEFAULT_RETENTION, DEFAULT_SWEEP_INTERVAL};
use crate::{Error, Result};

pub use file::JarvisConfigFile;

/// Jarvis gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to data directory (database, cache, etc)
    pub data_dir: PathBuf,

    /// Listener configuration
    pub server: ServerConfig,

    /// Memory store configuration
    pub memory: MemoryConfig,

    /// Identity facts seeded at startup
    pub identity: IdentityConfig,

    /// Information retrieval configuration
    pub retriever: RetrieverConfig,

    /// Response shaping
    pub processor: ProcessorConfig,

    /// Generative model configuration
    pub llm: LlmConfig,

    /// Voice synthesis configuration
    pub voice: VoiceConfig,

    /// API keys
    pub api_keys: ApiKeys,
}

/// TCP listener configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind
    pub bind: String,

    /// Port to listen on
    pub port: u16,

    /// Upper bound on a single request read
    pub max_request_bytes: usize,

    /// How long to wait for the request bytes
    pub read_timeout: Duration,

    /// Maximum concurrently running sessions
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 65432,
            max_request_bytes: 4096,
            read_timeout: Duration::from_secs(30),
            max_sessions: 32,
        }
    }
}

/// Memory store configuration
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Path to the `SQLite` database
    pub db_path: PathBuf,

    /// How long conversation entries stay visible
    pub retention: Duration,

    /// Interval between background sweeps
    pub sweep_interval: Duration,
}

/// Identity facts
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub user_name: Option<String>,
    pub assistant_name: String,
    pub relationship: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            user_name: None,
            assistant_name: "Jarvis".to_string(),
            relationship: "Owner".to_string(),
        }
    }
}

/// Information retrieval configuration
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// City used when a weather request names none
    pub default_city: String,

    /// Topic used when a news request names none
    pub default_topic: String,

    /// Bound on a single summarization call
    pub summarize_timeout: Duration,

    /// Bound on a single provider call
    pub provider_timeout: Duration,

    /// Summary cache capacity (0 = unbounded)
    pub summary_cache_capacity: usize,

    /// Wikipedia language edition
    pub encyclopedia_language: String,

    /// Web search results requested per query
    pub search_results: usize,

    /// News articles requested per topic
    pub news_articles: usize,

    /// Whitelisted applications: spoken name -> executable path
    pub applications: BTreeMap<String, PathBuf>,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        let applications = [
            ("notepad", r"C:\Windows\System32\notepad.exe"),
            ("calculator", r"C:\Windows\System32\calc.exe"),
        ]
        .into_iter()
        .map(|(name, path)| (name.to_string(), PathBuf::from(path)))
        .collect();

        Self {
            default_city: "New York".to_string(),
            default_topic: "technology".to_string(),
            summarize_timeout: Duration::from_secs(30),
            provider_timeout: Duration::from_secs(15),
            summary_cache_capacity: 256,
            encyclopedia_language: "en".to_string(),
            search_results: 5,
            news_articles: 3,
            applications,
        }
    }
}

/// Response shaping
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Replies longer than this are truncated with an ellipsis
    pub max_response_chars: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_response_chars: 500,
        }
    }
}

/// Generative model configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// OpenAI-compatible base URL
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Bearer token; local servers usually need none
    pub api_key: Option<String>,

    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            temperature: 0.7,
            top_p: 0.9,
            max_tokens: 512,
        }
    }
}

/// Voice synthesis configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Base URL of an OpenAI-compatible speech endpoint
    pub base_url: String,

    /// TTS model (e.g. "tts-1")
    pub model: String,

    /// TTS voice identifier
    pub voice: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub speed: f32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
            speed: 1.0,
        }
    }
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (TTS, and the LLM when no dedicated key is set)
    pub openai: Option<String>,

    /// `OpenWeatherMap` API key
    pub openweather: Option<String>,

    /// `NewsAPI` key
    pub newsapi: Option<String>,

    /// `SerpApi` key for Google web search
    pub serpapi: Option<String>,
}

/// Default data directory: platform data dir + `jarvis`
#[must_use]
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "jarvis").map_or_else(
        || PathBuf::from(".jarvis"),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env_string(name)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "ignoring unparseable environment variable");
            None
        }
    }
}

impl Config {
    /// Load configuration from defaults, the config file, and the environment
    ///
    /// # Errors
    ///
    /// Returns error if the resulting configuration is invalid
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let file = file::load_config_file(config_path);
        let data_dir = env_string("JARVIS_DATA_DIR").map_or_else(default_data_dir, PathBuf::from);
        let mut config = Self::from_file(file, data_dir);
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Layer a parsed config file over the built-in defaults
    #[must_use]
    pub fn from_file(fc: JarvisConfigFile, data_dir: PathBuf) -> Self {
        let server_defaults = ServerConfig::default();
        let server = ServerConfig {
            bind: fc.server.bind.unwrap_or(server_defaults.bind),
            port: fc.server.port.unwrap_or(server_defaults.port),
            max_request_bytes: fc
                .server
                .max_request_bytes
                .unwrap_or(server_defaults.max_request_bytes),
            read_timeout: fc
                .server
                .read_timeout_secs
                .map_or(server_defaults.read_timeout, Duration::from_secs),
            max_sessions: fc.server.max_sessions.unwrap_or(server_defaults.max_sessions),
        };

        let memory = MemoryConfig {
            db_path: fc
                .memory
                .db_path
                .map_or_else(|| data_dir.join("memory.db"), PathBuf::from),
            retention: fc
                .memory
                .retention_secs
                .map_or(DEFAULT_RETENTION, Duration::from_secs),
            sweep_interval: fc
                .memory
                .sweep_interval_secs
                .map_or(DEFAULT_SWEEP_INTERVAL, Duration::from_secs),
        };

        let identity_defaults = IdentityConfig::default();
        let identity = IdentityConfig {
            user_name: fc.identity.user_name,
            assistant_name: fc
                .identity
                .assistant_name
                .unwrap_or(identity_defaults.assistant_name),
            relationship: fc
                .identity
                .relationship
                .unwrap_or(identity_defaults.relationship),
        };

        let rd = RetrieverConfig::default();
        let retriever = RetrieverConfig {
            default_city: fc.retriever.default_city.unwrap_or(rd.default_city),
            default_topic: fc.retriever.default_topic.unwrap_or(rd.default_topic),
            summarize_timeout: fc
                .retriever
                .summarize_timeout_secs
                .map_or(rd.summarize_timeout, Duration::from_secs),
            provider_timeout: fc
                .retriever
                .provider_timeout_secs
                .map_or(rd.provider_timeout, Duration::from_secs),
            summary_cache_capacity: fc
                .retriever
                .summary_cache_capacity
                .unwrap_or(rd.summary_cache_capacity),
            encyclopedia_language: fc
                .retriever
                .encyclopedia_language
                .unwrap_or(rd.encyclopedia_language),
            search_results: fc.retriever.search_results.unwrap_or(rd.search_results),
            news_articles: fc.retriever.news_articles.unwrap_or(rd.news_articles),
            applications: fc.retriever.applications.map_or(rd.applications, |apps| {
                apps.into_iter()
                    .map(|(name, path)| (name.to_ascii_lowercase(), PathBuf::from(path)))
                    .collect()
            }),
        };

        let processor = ProcessorConfig {
            max_response_chars: fc
                .processor
                .max_response_chars
                .unwrap_or_else(|| ProcessorConfig::default().max_response_chars),
        };

        let ld = LlmConfig::default();
        let llm = LlmConfig {
            base_url: fc.llm.base_url.unwrap_or(ld.base_url),
            model: fc.llm.model.unwrap_or(ld.model),
            api_key: fc.api_keys.llm,
            temperature: fc.llm.temperature.unwrap_or(ld.temperature),
            top_p: fc.llm.top_p.unwrap_or(ld.top_p),
            max_tokens: fc.llm.max_tokens.unwrap_or(ld.max_tokens),
        };

        let vd = VoiceConfig::default();
        let voice = VoiceConfig {
            base_url: fc.voice.base_url.unwrap_or(vd.base_url),
            model: fc.voice.model.unwrap_or(vd.model),
            voice: fc.voice.voice.unwrap_or(vd.voice),
            speed: fc.voice.speed.unwrap_or(vd.speed),
        };

        let api_keys = ApiKeys {
            openai: fc.api_keys.openai,
            openweather: fc.api_keys.openweather,
            newsapi: fc.api_keys.newsapi,
            serpapi: fc.api_keys.serpapi,
        };

        Self {
            data_dir,
            server,
            memory,
            identity,
            retriever,
            processor,
            llm,
            voice,
            api_keys,
        }
    }

    /// Override fields from `JARVIS_*` and provider key environment variables
    fn apply_env(&mut self) {
        if let Some(bind) = env_string("JARVIS_BIND") {
            self.server.bind = bind;
        }
        if let Some(port) = env_parse("JARVIS_PORT") {
            self.server.port = port;
        }
        if let Some(max) = env_parse("JARVIS_MAX_SESSIONS") {
            self.server.max_sessions = max;
        }
        if let Some(path) = env_string("JARVIS_DB_PATH") {
            self.memory.db_path = PathBuf::from(path);
        }
        if let Some(name) = env_string("JARVIS_USER_NAME") {
            self.identity.user_name = Some(name);
        }
        if let Some(name) = env_string("JARVIS_ASSISTANT_NAME") {
            self.identity.assistant_name = name;
        }
        if let Some(url) = env_string("JARVIS_LLM_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = env_string("JARVIS_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(key) = env_string("JARVIS_LLM_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = env_string("JARVIS_TTS_BASE_URL") {
            self.voice.base_url = url;
        }
        if let Some(voice) = env_string("JARVIS_TTS_VOICE") {
            self.voice.voice = voice;
        }

        let keys = &mut self.api_keys;
        keys.openai = env_string("OPENAI_API_KEY").or(keys.openai.take());
        keys.openweather = env_string("OPENWEATHER_API_KEY").or(keys.openweather.take());
        keys.newsapi = env_string("NEWSAPI_KEY").or(keys.newsapi.take());
        keys.serpapi = env_string("SERPAPI_API_KEY").or(keys.serpapi.take());

        if self.llm.api_key.is_none() {
            self.llm.api_key.clone_from(&self.api_keys.openai);
        }
    }

    /// Reject settings the pipeline cannot run with
    ///
    /// # Errors
    ///
    /// Returns a configuration error describing the first invalid field
    pub fn validate(&self) -> Result<()> {
        if self.server.max_sessions == 0 {
            return Err(Error::Config("server.max_sessions must be at least 1".to_string()));
        }
        if self.server.max_request_bytes == 0 {
            return Err(Error::Config("server.max_request_bytes must be at least 1".to_string()));
        }
        if self.processor.max_response_chars < 4 {
            return Err(Error::Config(
                "processor.max_response_chars must leave room for the ellipsis".to_string(),
            ));
        }
        if self.memory.retention.is_zero() || self.memory.sweep_interval.is_zero() {
            return Err(Error::Config("memory intervals must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Socket address string for the listener
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }
}
