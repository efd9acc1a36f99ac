//! Jarvis Gateway - command pipeline for a voice assistant
//!
//! A client sends recognized speech as text over TCP and receives synthesized
//! audio back. In between:
//! - Memory store (durable facts, time-bounded conversation log)
//! - Information retrieval (intent routing, provider fallback, summarization)
//! - Command processing (prompt assembly, generation, sanitizing)
//! - Session protocol (one request, one length-prefixed audio frame)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Client (wake word + STT)               │
//! └────────────────────┬────────────────────────────────┘
//!                      │ text            ▲ u32 len + audio
//! ┌────────────────────▼─────────────────┴──────────────┐
//! │   Session  →  Processor  →  Retriever  │  Memory    │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │  LLM  │  TTS  │  Wikipedia  │  Weather │ News │ Web │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod daemon;
pub mod db;
pub mod error;
pub mod processor;
pub mod providers;
pub mod retriever;
pub mod session;
pub mod voice;

pub use config::Config;
pub use daemon::Daemon;
pub use db::{ConversationEntry, DbConn, DbPool, MemoryStore};
pub use error::{Error, Result};
pub use processor::CommandProcessor;
pub use providers::{
    Encyclopedia, EncyclopediaLookup, Generator, NewsProvider, SearchProvider, Synthesizer,
    WeatherProvider,
};
pub use retriever::{InfoRetriever, Intent, Retrieval, RetrievalKind, Sources, classify_intent};
pub use session::{SessionHandler, SessionOutcome, SessionServer, SessionState};
