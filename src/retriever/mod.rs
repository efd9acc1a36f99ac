//! Information retrieval: intent routing over multiple sources with fallback
//!
//! The most specific source for an intent is tried first; general web search
//! and the encyclopedia back each other up, and long raw results pass through
//! the bounded-latency summarizer. No failure escapes as an error: every call
//! yields a [`Retrieval`] whose [`RetrievalKind`] tells answers from failures.

mod intent;
mod summarize;
mod system;

pub use intent::{Classification, GREETING_TOKEN, Intent, classify_intent, rule_order, title_case};
pub use summarize::{Summarizer, Summary};
pub use system::{AppWhitelist, list_files};

use std::fmt::Write as _;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use chrono::Datelike;

use crate::Result;
use crate::config::RetrieverConfig;
use crate::processor::greeting;
use crate::providers::{
    Encyclopedia, EncyclopediaLookup, Generator, NewsProvider, SearchProvider, WeatherProvider,
};

/// Success or failure kind of a retrieval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalKind {
    /// A genuine answer
    Answer,
    /// The term refers to several topics and no fallback resolved it
    Disambiguation,
    /// The source had nothing for the request
    NotFound,
    /// A required argument was missing from the command
    ClarificationNeeded,
    /// The source was unreachable or errored
    ProviderError,
    /// The source did not answer within its deadline
    Timeout,
    /// The feature or source is not available
    Unavailable,
}

/// Text produced for a command, tagged with its kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retrieval {
    pub kind: RetrievalKind,
    pub text: String,
}

impl Retrieval {
    fn new(kind: RetrievalKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// A genuine answer
    pub fn answer(text: impl Into<String>) -> Self {
        Self::new(RetrievalKind::Answer, text)
    }

    /// A request for the missing argument
    pub fn clarification(text: impl Into<String>) -> Self {
        Self::new(RetrievalKind::ClarificationNeeded, text)
    }

    /// Whether this carries a genuine answer
    #[must_use]
    pub fn is_answer(&self) -> bool {
        self.kind == RetrievalKind::Answer
    }
}

/// Reply for the disabled screen reading feature
pub const SCREEN_READ_UNAVAILABLE: &str =
    "I'm sorry, the 'read screen' feature is currently unavailable.";

/// Information sources consulted by the retriever
#[derive(Clone)]
pub struct Sources {
    pub encyclopedia: Arc<dyn Encyclopedia>,
    pub weather: Option<Arc<dyn WeatherProvider>>,
    pub news: Option<Arc<dyn NewsProvider>>,
    pub search: Option<Arc<dyn SearchProvider>>,
}

/// Maps free-text commands to answers
pub struct InfoRetriever {
    sources: Sources,
    summarizer: Summarizer,
    apps: AppWhitelist,
    config: RetrieverConfig,
}

impl InfoRetriever {
    /// Create a retriever; `generator` backs the summarization step
    #[must_use]
    pub fn new(sources: Sources, generator: Arc<dyn Generator>, config: RetrieverConfig) -> Self {
        let summarizer = Summarizer::new(
            generator,
            config.summarize_timeout,
            config.summary_cache_capacity,
        );
        let apps = AppWhitelist::new(config.applications.clone());
        Self {
            sources,
            summarizer,
            apps,
            config,
        }
    }

    /// Summarizer shared by every search path
    #[must_use]
    pub const fn summarizer(&self) -> &Summarizer {
        &self.summarizer
    }

    /// Resolve `query` to an answer or a tagged failure
    pub async fn retrieve(&self, query: &str) -> Retrieval {
        tracing::info!(query, "retrieving information");

        let intent = match classify_intent(query) {
            Classification::Resolved(intent) => intent,
            Classification::NeedsClarification(message) => {
                tracing::debug!(query, "clarification needed");
                return Retrieval::clarification(message);
            }
        };

        let retrieval = match intent {
            Intent::Greeting => Retrieval::answer(greeting(None)),
            Intent::CapitalLookup { country } => {
                self.encyclopedia_with_search_fallback(&format!("Capital of {country}"), query)
                    .await
            }
            Intent::Biographical { subject } => {
                self.encyclopedia_with_search_fallback(&subject, query).await
            }
            Intent::Weather { city } => {
                let city = city.unwrap_or_else(|| self.config.default_city.clone());
                self.weather(&city).await
            }
            Intent::News { topic } => {
                let topic = topic.unwrap_or_else(|| self.config.default_topic.clone());
                self.news(&topic).await
            }
            Intent::AgeCalc { age } => Self::birth_year(age, chrono::Local::now().year()),
            Intent::FileListing { path } => Self::file_listing(&path).await,
            Intent::AppLaunch { name } => self.launch(&name),
            Intent::ScreenRead => {
                tracing::warn!("the 'read screen' feature is currently disabled");
                Retrieval::new(RetrievalKind::Unavailable, SCREEN_READ_UNAVAILABLE)
            }
            Intent::GenericSearch { query } => self.generic_search(&query).await,
        };

        tracing::debug!(kind = ?retrieval.kind, "retrieval finished");
        retrieval
    }

    /// Run a provider call under the provider deadline
    async fn call<T>(
        &self,
        source: &str,
        fut: impl Future<Output = Result<T>>,
    ) -> std::result::Result<T, Retrieval> {
        match tokio::time::timeout(self.config.provider_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::warn!(source, error = %e, "provider call failed");
                Err(Retrieval::new(
                    RetrievalKind::ProviderError,
                    format!("An error occurred while contacting the {source}."),
                ))
            }
            Err(_) => {
                tracing::warn!(source, "provider call timed out");
                Err(Retrieval::new(
                    RetrievalKind::Timeout,
                    format!("The {source} did not respond in time."),
                ))
            }
        }
    }

    /// Encyclopedia summary; an ambiguous term falls back to web search
    async fn encyclopedia_with_search_fallback(&self, term: &str, query: &str) -> Retrieval {
        let lookup = match self.call("encyclopedia", self.sources.encyclopedia.summary(term)).await {
            Ok(lookup) => lookup,
            Err(failure) => return failure,
        };

        match lookup {
            EncyclopediaLookup::Summary(text) => Retrieval::answer(text),
            EncyclopediaLookup::Missing => Retrieval::new(
                RetrievalKind::NotFound,
                format!("No encyclopedia page found for '{term}'."),
            ),
            EncyclopediaLookup::Ambiguous => {
                tracing::info!(term, "ambiguous encyclopedia topic, falling back to web search");
                if self.sources.search.is_none() {
                    return Retrieval::new(
                        RetrievalKind::Disambiguation,
                        format!("Your query '{term}' resulted in multiple topics. Please be more specific."),
                    );
                }
                self.search_and_summarize(query).await
            }
        }
    }

    /// Web search whose raw result list is summarized
    async fn search_and_summarize(&self, query: &str) -> Retrieval {
        let Some(search) = &self.sources.search else {
            return Retrieval::new(
                RetrievalKind::Unavailable,
                "Search functionality is currently unavailable. Please try again later.",
            );
        };

        let results = match self
            .call("search service", search.search(query, self.config.search_results))
            .await
        {
            Ok(results) => results,
            Err(failure) => return failure,
        };

        if results.is_empty() {
            tracing::warn!(query, "no search results");
            return Retrieval::new(
                RetrievalKind::NotFound,
                format!("No search results found for '{query}'."),
            );
        }

        let mut raw = format!("Here are the top search results for '{query}':\n");
        for result in &results {
            let _ = writeln!(raw, "- {}: {} ({})", result.title, result.snippet, result.url);
        }

        Retrieval::answer(self.summarizer.summarize(&raw).await.or_raw(&raw))
    }

    /// Search first; on no usable results fall back to the encyclopedia,
    /// then to a full-article scrape when the topic is ambiguous
    async fn generic_search(&self, query: &str) -> Retrieval {
        let searched = self.search_and_summarize(query).await;
        if searched.is_answer() {
            return searched;
        }

        tracing::info!(query, kind = ?searched.kind, "falling back to encyclopedia");
        let raw = match self.call("encyclopedia", self.sources.encyclopedia.summary(query)).await {
            Ok(EncyclopediaLookup::Summary(text)) => text,
            Ok(EncyclopediaLookup::Missing) => {
                return Retrieval::new(
                    RetrievalKind::NotFound,
                    format!("No information found for '{query}'."),
                );
            }
            Ok(EncyclopediaLookup::Ambiguous) => {
                match self
                    .call("encyclopedia", self.sources.encyclopedia.full_article(query))
                    .await
                {
                    Ok(article) => article,
                    Err(failure) => return failure,
                }
            }
            Err(failure) => return failure,
        };

        Retrieval::answer(self.summarizer.summarize(&raw).await.or_raw(&raw))
    }

    async fn weather(&self, city: &str) -> Retrieval {
        let Some(weather) = &self.sources.weather else {
            return Retrieval::new(
                RetrievalKind::Unavailable,
                "Weather information is currently unavailable.",
            );
        };

        match self.call("weather service", weather.current(city)).await {
            Ok(Some(report)) => {
                tracing::info!(city, description = %report.description, temp = report.temperature_c, "weather fetched");
                Retrieval::answer(format!(
                    "The current weather in {city} is {} with a temperature of {}°C.",
                    report.description, report.temperature_c
                ))
            }
            Ok(None) => Retrieval::new(
                RetrievalKind::NotFound,
                format!("Weather data not found for '{city}'."),
            ),
            Err(failure) => failure,
        }
    }

    async fn news(&self, topic: &str) -> Retrieval {
        let Some(news) = &self.sources.news else {
            return Retrieval::new(
                RetrievalKind::Unavailable,
                "News information is currently unavailable.",
            );
        };

        match self
            .call("news service", news.headlines(topic, self.config.news_articles))
            .await
        {
            Ok(headlines) if headlines.is_empty() => Retrieval::new(
                RetrievalKind::NotFound,
                format!("No news articles found for '{topic}'."),
            ),
            Ok(headlines) => {
                let mut text = format!("Here are the latest news articles about {topic}:\n");
                for headline in &headlines {
                    let _ = writeln!(text, "- {} ({})", headline.title, headline.source);
                }
                Retrieval::answer(text)
            }
            Err(failure) => failure,
        }
    }

    fn birth_year(age: u32, current_year: i32) -> Retrieval {
        let birth_year = i64::from(current_year) - i64::from(age);
        tracing::info!(age, birth_year, "calculated birth year");
        Retrieval::answer(format!(
            "If you are {age} years old, you were born in {birth_year}."
        ))
    }

    async fn file_listing(path: &Path) -> Retrieval {
        match list_files(path).await {
            Ok(names) => Retrieval::answer(format!(
                "Files in '{}':\n{}",
                path.display(),
                names.join("\n")
            )),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to list files");
                Retrieval::new(
                    RetrievalKind::ProviderError,
                    format!("An error occurred while listing files in '{}'.", path.display()),
                )
            }
        }
    }

    fn launch(&self, name: &str) -> Retrieval {
        let Some(path) = self.apps.resolve(name) else {
            tracing::warn!(name, "application not recognized");
            return Retrieval::new(
                RetrievalKind::NotFound,
                format!("Application '{name}' not recognized."),
            );
        };

        match AppWhitelist::launch(path) {
            Ok(()) => Retrieval::answer(format!("Opened application at {}.", path.display())),
            Err(e) => {
                tracing::warn!(name, error = %e, "failed to open application");
                Retrieval::new(
                    RetrievalKind::ProviderError,
                    format!("An error occurred while opening '{name}'."),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::providers::{Headline, SearchResult, WeatherReport};
    use crate::{Error, Result};

    struct FakeEncyclopedia {
        summary: Mutex<Option<EncyclopediaLookup>>,
        article: Option<String>,
        terms: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Encyclopedia for FakeEncyclopedia {
        async fn summary(&self, term: &str) -> Result<EncyclopediaLookup> {
            self.terms.lock().unwrap().push(term.to_string());
            self.summary
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| Error::Provider("offline".to_string()))
        }

        async fn full_article(&self, term: &str) -> Result<String> {
            self.terms.lock().unwrap().push(format!("article:{term}"));
            self.article
                .clone()
                .ok_or_else(|| Error::Provider("no article".to_string()))
        }
    }

    struct FakeSearch {
        results: Vec<SearchResult>,
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SearchProvider for FakeSearch {
        async fn search(&self, query: &str, _limit: usize) -> Result<Vec<SearchResult>> {
            self.queries.lock().unwrap().push(query.to_string());
            Ok(self.results.clone())
        }
    }

    struct FakeWeather;

    #[async_trait]
    impl WeatherProvider for FakeWeather {
        async fn current(&self, city: &str) -> Result<Option<WeatherReport>> {
            if city == "Atlantis" {
                return Ok(None);
            }
            Ok(Some(WeatherReport {
                description: "clear sky".to_string(),
                temperature_c: 21.5,
            }))
        }
    }

    struct FakeNews;

    #[async_trait]
    impl NewsProvider for FakeNews {
        async fn headlines(&self, topic: &str, limit: usize) -> Result<Vec<Headline>> {
            Ok((0..limit)
                .map(|i| Headline {
                    title: format!("{topic} story {i}"),
                    source: "Wire".to_string(),
                })
                .collect())
        }
    }

    struct SlowNews;

    #[async_trait]
    impl NewsProvider for SlowNews {
        async fn headlines(&self, _topic: &str, _limit: usize) -> Result<Vec<Headline>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }
    }

    struct PrefixGenerator;

    #[async_trait]
    impl Generator for PrefixGenerator {
        async fn generate(&self, prompt: &str) -> Result<String> {
            Ok(format!("SUMMARY[{}]", prompt.lines().last().unwrap_or_default()))
        }
    }

    struct BrokenGenerator;

    #[async_trait]
    impl Generator for BrokenGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Err(Error::Llm("down".to_string()))
        }
    }

    fn search_with(results: Vec<SearchResult>) -> Arc<FakeSearch> {
        Arc::new(FakeSearch {
            results,
            queries: Mutex::new(Vec::new()),
        })
    }

    fn encyclopedia_with(lookup: Option<EncyclopediaLookup>, article: Option<&str>) -> Arc<FakeEncyclopedia> {
        Arc::new(FakeEncyclopedia {
            summary: Mutex::new(lookup),
            article: article.map(ToString::to_string),
            terms: Mutex::new(Vec::new()),
        })
    }

    fn retriever(
        encyclopedia: Arc<FakeEncyclopedia>,
        search: Option<Arc<FakeSearch>>,
        generator: Arc<dyn Generator>,
    ) -> InfoRetriever {
        let sources = Sources {
            encyclopedia,
            weather: Some(Arc::new(FakeWeather)),
            news: Some(Arc::new(FakeNews)),
            search: search.map(|s| s as Arc<dyn SearchProvider>),
        };
        InfoRetriever::new(sources, generator, RetrieverConfig::default())
    }

    fn paris() -> SearchResult {
        SearchResult {
            title: "Paris".to_string(),
            url: "https://example.com/paris".to_string(),
            snippet: "Capital of France".to_string(),
        }
    }

    #[tokio::test]
    async fn test_clarification_skips_every_source() {
        let encyclopedia = encyclopedia_with(None, None);
        let search = search_with(vec![paris()]);
        let r = retriever(encyclopedia.clone(), Some(search.clone()), Arc::new(PrefixGenerator));

        let result = r.retrieve("capital of").await;
        assert_eq!(result.kind, RetrievalKind::ClarificationNeeded);
        assert!(encyclopedia.terms.lock().unwrap().is_empty());
        assert!(search.queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_greeting_token_answers_without_sources() {
        let encyclopedia = encyclopedia_with(None, None);
        let r = retriever(encyclopedia.clone(), None, Arc::new(PrefixGenerator));

        let result = r.retrieve("system_greet").await;
        assert_eq!(result, Retrieval::answer("Hello there! How may I help you?"));
        assert!(encyclopedia.terms.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_capital_uses_encyclopedia() {
        let encyclopedia = encyclopedia_with(
            Some(EncyclopediaLookup::Summary("Paris is the capital of France.".to_string())),
            None,
        );
        let r = retriever(encyclopedia.clone(), None, Arc::new(PrefixGenerator));

        let result = r.retrieve("what is the capital of france").await;
        assert_eq!(result, Retrieval::answer("Paris is the capital of France."));
        assert_eq!(*encyclopedia.terms.lock().unwrap(), vec!["Capital of France"]);
    }

    #[tokio::test]
    async fn test_ambiguous_capital_falls_back_to_search() {
        let encyclopedia = encyclopedia_with(Some(EncyclopediaLookup::Ambiguous), None);
        let search = search_with(vec![paris()]);
        let r = retriever(encyclopedia, Some(search.clone()), Arc::new(PrefixGenerator));

        let result = r.retrieve("capital of Georgia").await;
        assert!(result.is_answer());
        assert!(result.text.starts_with("SUMMARY["));
        assert_eq!(*search.queries.lock().unwrap(), vec!["capital of Georgia"]);
    }

    #[tokio::test]
    async fn test_ambiguous_without_search_is_disambiguation() {
        let encyclopedia = encyclopedia_with(Some(EncyclopediaLookup::Ambiguous), None);
        let r = retriever(encyclopedia, None, Arc::new(PrefixGenerator));

        let result = r.retrieve("who is Mercury").await;
        assert_eq!(result.kind, RetrievalKind::Disambiguation);
    }

    #[tokio::test]
    async fn test_weather_sentence() {
        let r = retriever(encyclopedia_with(None, None), None, Arc::new(PrefixGenerator));

        let result = r.retrieve("weather in Berlin").await;
        assert_eq!(
            result,
            Retrieval::answer("The current weather in Berlin is clear sky with a temperature of 21.5°C.")
        );

        let missing = r.retrieve("weather in Atlantis").await;
        assert_eq!(missing.kind, RetrievalKind::NotFound);
    }

    #[tokio::test]
    async fn test_weather_default_city() {
        let r = retriever(encyclopedia_with(None, None), None, Arc::new(PrefixGenerator));
        let result = r.retrieve("what's the weather like").await;
        assert!(result.text.contains("New York"));
    }

    #[tokio::test]
    async fn test_news_default_topic() {
        let r = retriever(encyclopedia_with(None, None), None, Arc::new(PrefixGenerator));
        let result = r.retrieve("tell me the news").await;
        assert!(result.is_answer());
        assert!(result.text.starts_with("Here are the latest news articles about technology:"));
        assert_eq!(result.text.lines().count(), 4);
    }

    #[tokio::test]
    async fn test_provider_timeout() {
        let sources = Sources {
            encyclopedia: encyclopedia_with(None, None),
            weather: None,
            news: Some(Arc::new(SlowNews)),
            search: None,
        };
        let config = RetrieverConfig {
            provider_timeout: Duration::from_millis(20),
            ..RetrieverConfig::default()
        };
        let r = InfoRetriever::new(sources, Arc::new(PrefixGenerator), config);

        let result = r.retrieve("news about rust").await;
        assert_eq!(result.kind, RetrievalKind::Timeout);
    }

    #[tokio::test]
    async fn test_missing_weather_source_is_unavailable() {
        let sources = Sources {
            encyclopedia: encyclopedia_with(None, None),
            weather: None,
            news: None,
            search: None,
        };
        let r = InfoRetriever::new(sources, Arc::new(PrefixGenerator), RetrieverConfig::default());
        assert_eq!(r.retrieve("weather in Rome").await.kind, RetrievalKind::Unavailable);
    }

    #[test]
    fn test_birth_year() {
        assert_eq!(
            InfoRetriever::birth_year(30, 2026),
            Retrieval::answer("If you are 30 years old, you were born in 1996.")
        );
    }

    #[tokio::test]
    async fn test_screen_read_unavailable() {
        let r = retriever(encyclopedia_with(None, None), None, Arc::new(PrefixGenerator));
        let result = r.retrieve("read screen").await;
        assert_eq!(result.kind, RetrievalKind::Unavailable);
        assert_eq!(result.text, SCREEN_READ_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_unknown_app_not_recognized() {
        let r = retriever(encyclopedia_with(None, None), None, Arc::new(PrefixGenerator));
        let result = r.retrieve("open application minesweeper").await;
        assert_eq!(result.kind, RetrievalKind::NotFound);
        assert_eq!(result.text, "Application 'minesweeper' not recognized.");
    }

    #[tokio::test]
    async fn test_generic_search_summarizes_results() {
        let search = search_with(vec![paris()]);
        let r = retriever(encyclopedia_with(None, None), Some(search), Arc::new(PrefixGenerator));

        let result = r.retrieve("best cafes nearby").await;
        assert!(result.is_answer());
        assert_eq!(result.text, "SUMMARY[- Paris: Capital of France (https://example.com/paris)]");
    }

    #[tokio::test]
    async fn test_generic_search_summary_failure_returns_raw_results() {
        let search = search_with(vec![paris()]);
        let r = retriever(encyclopedia_with(None, None), Some(search), Arc::new(BrokenGenerator));

        let result = r.retrieve("best cafes nearby").await;
        assert!(result.is_answer());
        assert!(result.text.starts_with("Here are the top search results for 'best cafes nearby':"));
    }

    #[tokio::test]
    async fn test_empty_search_falls_back_to_encyclopedia() {
        let encyclopedia = encyclopedia_with(
            Some(EncyclopediaLookup::Summary("Quantum foam is a concept.".to_string())),
            None,
        );
        let r = retriever(encyclopedia.clone(), Some(search_with(Vec::new())), Arc::new(BrokenGenerator));

        let result = r.retrieve("quantum foam").await;
        assert_eq!(result, Retrieval::answer("Quantum foam is a concept."));
        assert_eq!(*encyclopedia.terms.lock().unwrap(), vec!["quantum foam"]);
    }

    #[tokio::test]
    async fn test_ambiguous_fallback_scrapes_full_article() {
        let encyclopedia = encyclopedia_with(Some(EncyclopediaLookup::Ambiguous), Some("Full article text."));
        let r = retriever(encyclopedia.clone(), None, Arc::new(PrefixGenerator));

        let result = r.retrieve("mercury").await;
        assert_eq!(result, Retrieval::answer("SUMMARY[Full article text.]"));
        assert_eq!(
            *encyclopedia.terms.lock().unwrap(),
            vec!["mercury", "article:mercury"]
        );
    }

    #[tokio::test]
    async fn test_generic_search_all_sources_fail() {
        let r = retriever(encyclopedia_with(None, None), None, Arc::new(PrefixGenerator));
        let result = r.retrieve("something obscure").await;
        assert_eq!(result.kind, RetrievalKind::ProviderError);
    }

    #[tokio::test]
    async fn test_file_listing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        let r = retriever(encyclopedia_with(None, None), None, Arc::new(PrefixGenerator));

        let result = r.retrieve(&format!("list files in {}", dir.path().display())).await;
        assert!(result.is_answer(), "{result:?}");
        assert!(result.text.ends_with("notes.txt"));
    }
}
