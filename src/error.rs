//! Error types for the Jarvis gateway

use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Jarvis gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Database pool or lock error
    #[error("database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generative model error
    #[error("llm error: {0}")]
    Llm(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Information provider error (encyclopedia, weather, news, search)
    #[error("provider error: {0}")]
    Provider(String),

    /// Wire protocol error
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Operation exceeded its deadline
    #[error("timed out: {0}")]
    Timeout(String),
}
