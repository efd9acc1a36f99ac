//! Daemon - the Jarvis gateway service
//!
//! Owns the process-wide collaborators (model client, synthesizer,
//! information providers) and hands shared handles to the pipeline.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::db::{self, MemoryStore, spawn_sweeper};
use crate::processor::{ASSISTANT_NAME_FACT, CommandProcessor, RELATIONSHIP_FACT, USER_NAME_FACT};
use crate::providers::{
    ChatCompletionClient, Generator, NewsApiClient, NewsProvider, OpenWeatherClient,
    SearchProvider, SerpApiClient, WeatherProvider, WikipediaClient,
};
use crate::retriever::{InfoRetriever, Sources};
use crate::session::{SessionHandler, SessionServer};
use crate::voice::TextToSpeech;
use crate::{Config, Error, Result};

/// The Jarvis daemon
pub struct Daemon {
    config: Config,
    memory: MemoryStore,
    processor: Arc<CommandProcessor>,
}

impl Daemon {
    /// Open the database, seed identity facts and build the pipeline
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be opened or a collaborator
    /// cannot be constructed
    pub fn new(config: Config) -> Result<Self> {
        let db = db::init(&config.memory.db_path)?;
        tracing::info!(path = %config.memory.db_path.display(), "database initialized");

        let memory = MemoryStore::with_retention(db, config.memory.retention);
        seed_identity(&memory, &config)?;

        let generator: Arc<dyn Generator> = Arc::new(ChatCompletionClient::new(&config.llm));
        let retriever = Arc::new(InfoRetriever::new(
            build_sources(&config)?,
            Arc::clone(&generator),
            config.retriever.clone(),
        ));
        let processor = Arc::new(CommandProcessor::new(
            memory.clone(),
            retriever,
            generator,
            config.processor.clone(),
        ));

        Ok(Self {
            config,
            memory,
            processor,
        })
    }

    /// Memory store shared by every session
    #[must_use]
    pub const fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    /// Command pipeline shared by every session
    #[must_use]
    pub fn processor(&self) -> Arc<CommandProcessor> {
        Arc::clone(&self.processor)
    }

    /// Run the session server until interrupted
    ///
    /// # Errors
    ///
    /// Returns error if the synthesizer is not configured or the listener
    /// cannot be bound
    pub async fn run(self) -> Result<()> {
        let synthesizer = Arc::new(build_synthesizer(&self.config)?);

        let sweeper = spawn_sweeper(self.memory.clone(), self.config.memory.sweep_interval);

        let addr = self.config.listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Config(format!("failed to bind {addr}: {e}")))?;

        tracing::info!(
            addr = %addr,
            max_sessions = self.config.server.max_sessions,
            "daemon running"
        );

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = shutdown_tx.send(()).await;
            }
        });

        let handler = SessionHandler::new(self.processor(), synthesizer, &self.config.server);
        let server = SessionServer::new(handler, self.config.server.max_sessions);
        let result = server
            .serve(listener, async move {
                shutdown_rx.recv().await;
                tracing::info!("shutdown requested");
            })
            .await;

        sweeper.abort();
        result
    }
}

/// Write the configured identity into the fact table
///
/// An unset user name leaves any stored name in place.
fn seed_identity(memory: &MemoryStore, config: &Config) -> Result<()> {
    let identity = &config.identity;
    if let Some(user_name) = &identity.user_name {
        memory.set_fact(USER_NAME_FACT, user_name)?;
    }
    memory.set_fact(ASSISTANT_NAME_FACT, &identity.assistant_name)?;
    memory.set_fact(RELATIONSHIP_FACT, &identity.relationship)?;

    tracing::debug!(assistant = %identity.assistant_name, "identity facts seeded");
    Ok(())
}

/// Build information sources for which credentials are configured
fn build_sources(config: &Config) -> Result<Sources> {
    let keys = &config.api_keys;

    let weather = keys.openweather.clone().map(|key| {
        tracing::info!("weather provider: OpenWeatherMap");
        Arc::new(OpenWeatherClient::new(key)) as Arc<dyn WeatherProvider>
    });
    if weather.is_none() {
        tracing::warn!("no weather API key configured, weather lookups unavailable");
    }

    let news = keys.newsapi.clone().map(|key| {
        tracing::info!("news provider: NewsAPI");
        Arc::new(NewsApiClient::new(key)) as Arc<dyn NewsProvider>
    });
    if news.is_none() {
        tracing::warn!("no news API key configured, news lookups unavailable");
    }

    let search = keys.serpapi.clone().map(|key| {
        tracing::info!("search provider: SerpApi");
        Arc::new(SerpApiClient::new(key)) as Arc<dyn SearchProvider>
    });
    if search.is_none() {
        tracing::warn!("no search API key configured, falling back to the encyclopedia");
    }

    Ok(Sources {
        encyclopedia: Arc::new(WikipediaClient::new(&config.retriever.encyclopedia_language)?),
        weather,
        news,
        search,
    })
}

fn build_synthesizer(config: &Config) -> Result<TextToSpeech> {
    TextToSpeech::from_config(&config.voice, config.api_keys.openai.clone())
}
