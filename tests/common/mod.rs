//! Shared test utilities

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jarvis_gateway::config::{ProcessorConfig, RetrieverConfig, ServerConfig};
use jarvis_gateway::providers::{Headline, SearchResult, WeatherReport};
use jarvis_gateway::{
    CommandProcessor, DbPool, Encyclopedia, EncyclopediaLookup, Error, Generator, InfoRetriever,
    MemoryStore, NewsProvider, Result, SearchProvider, SessionHandler, Sources, Synthesizer,
    WeatherProvider, db,
};

/// Set up an in-memory test database
#[must_use]
pub fn setup_test_db() -> DbPool {
    db::init_memory().expect("failed to init test db")
}

/// Memory store over a fresh in-memory database
#[must_use]
pub fn setup_memory() -> MemoryStore {
    MemoryStore::new(setup_test_db())
}

/// Generator that answers from the prompt it receives
///
/// Summarization prompts yield "Summary: <first line>"; conversation prompts
/// yield the first line of the information section, after the assistant
/// marker the way a completion endpoint would.
#[derive(Default)]
pub struct EchoGenerator {
    pub prompts: Mutex<Vec<String>>,
    pub fail: bool,
}

impl EchoGenerator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Generator for EchoGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            return Err(Error::Llm("model unavailable".to_string()));
        }

        if let Some(text) = prompt.strip_prefix("Summarize the following information professionally:\n\n") {
            return Ok(format!("Summary: {}", text.lines().next().unwrap_or_default()));
        }

        let info = ["information I found:\n", "information I could find:\n"]
            .iter()
            .find_map(|heading| prompt.split_once(heading))
            .and_then(|(_, rest)| rest.lines().next())
            .unwrap_or("I have nothing to add.");
        Ok(format!("Jarvis: {info}"))
    }
}

/// Synthesizer whose "audio" is the UTF-8 reply prefixed with `WAV:`
#[derive(Default)]
pub struct TextSynthesizer {
    pub texts: Mutex<Vec<String>>,
    pub fail: bool,
}

impl TextSynthesizer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }
}

#[async_trait]
impl Synthesizer for TextSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        self.texts.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(Error::Tts("voice offline".to_string()));
        }
        Ok(format!("WAV:{text}").into_bytes())
    }
}

/// Encyclopedia with scripted answers, recording every term
pub struct FakeEncyclopedia {
    pub lookup: EncyclopediaLookup,
    pub article: String,
    pub terms: Mutex<Vec<String>>,
}

impl FakeEncyclopedia {
    pub fn new(lookup: EncyclopediaLookup) -> Arc<Self> {
        Arc::new(Self {
            lookup,
            article: "The full article about the topic.".to_string(),
            terms: Mutex::new(Vec::new()),
        })
    }

    pub fn terms(&self) -> Vec<String> {
        self.terms.lock().unwrap().clone()
    }
}

#[async_trait]
impl Encyclopedia for FakeEncyclopedia {
    async fn summary(&self, term: &str) -> Result<EncyclopediaLookup> {
        self.terms.lock().unwrap().push(term.to_string());
        Ok(self.lookup.clone())
    }

    async fn full_article(&self, term: &str) -> Result<String> {
        self.terms.lock().unwrap().push(format!("full:{term}"));
        Ok(self.article.clone())
    }
}

/// Weather source reporting light rain everywhere but Atlantis
#[derive(Default)]
pub struct FakeWeather {
    pub cities: Mutex<Vec<String>>,
}

impl FakeWeather {
    pub fn cities(&self) -> Vec<String> {
        self.cities.lock().unwrap().clone()
    }
}

#[async_trait]
impl WeatherProvider for FakeWeather {
    async fn current(&self, city: &str) -> Result<Option<WeatherReport>> {
        self.cities.lock().unwrap().push(city.to_string());
        if city == "Atlantis" {
            return Ok(None);
        }
        Ok(Some(WeatherReport {
            description: "light rain".to_string(),
            temperature_c: 12.5,
        }))
    }
}

/// News source with a single headline per topic
pub struct FakeNews;

#[async_trait]
impl NewsProvider for FakeNews {
    async fn headlines(&self, topic: &str, _limit: usize) -> Result<Vec<Headline>> {
        Ok(vec![Headline {
            title: format!("{topic} breakthrough announced"),
            source: "Daily Wire Service".to_string(),
        }])
    }
}

/// Search source with fixed results, recording every query
#[derive(Default)]
pub struct FakeSearch {
    pub results: Vec<SearchResult>,
    pub queries: Mutex<Vec<String>>,
}

impl FakeSearch {
    pub fn with_results(results: Vec<SearchResult>) -> Arc<Self> {
        Arc::new(Self {
            results,
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search(&self, query: &str, _limit: usize) -> Result<Vec<SearchResult>> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self.results.clone())
    }
}

/// One search hit
pub fn search_result(title: &str, snippet: &str) -> SearchResult {
    SearchResult {
        title: title.to_string(),
        url: format!("https://example.com/{}", title.to_lowercase().replace(' ', "-")),
        snippet: snippet.to_string(),
    }
}

/// Fakes wired into a full pipeline
pub struct Harness {
    pub memory: MemoryStore,
    pub generator: Arc<EchoGenerator>,
    pub encyclopedia: Arc<FakeEncyclopedia>,
    pub weather: Arc<FakeWeather>,
    pub search: Option<Arc<FakeSearch>>,
    pub processor: Arc<CommandProcessor>,
}

impl Harness {
    /// Pipeline with every source present and no web search
    pub fn new() -> Self {
        Self::build(
            EchoGenerator::new(),
            FakeEncyclopedia::new(EncyclopediaLookup::Summary(
                "Paris is the capital and largest city of France.".to_string(),
            )),
            None,
        )
    }

    pub fn build(
        generator: Arc<EchoGenerator>,
        encyclopedia: Arc<FakeEncyclopedia>,
        search: Option<Arc<FakeSearch>>,
    ) -> Self {
        let memory = setup_memory();
        let weather = Arc::new(FakeWeather::default());
        let sources = Sources {
            encyclopedia: encyclopedia.clone(),
            weather: Some(weather.clone()),
            news: Some(Arc::new(FakeNews)),
            search: search.clone().map(|s| s as Arc<dyn SearchProvider>),
        };
        let retriever = Arc::new(InfoRetriever::new(
            sources,
            generator.clone(),
            RetrieverConfig::default(),
        ));
        let processor = Arc::new(CommandProcessor::new(
            memory.clone(),
            retriever,
            generator.clone(),
            ProcessorConfig::default(),
        ));

        Self {
            memory,
            generator,
            encyclopedia,
            weather,
            search,
            processor,
        }
    }

    /// Session handler over this pipeline
    pub fn handler(&self, synthesizer: Arc<TextSynthesizer>, read_timeout: Duration) -> SessionHandler {
        let config = ServerConfig {
            read_timeout,
            ..ServerConfig::default()
        };
        SessionHandler::new(self.processor.clone(), synthesizer, &config)
    }
}
