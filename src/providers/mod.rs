//! External collaborators consumed by the command pipeline
//!
//! Each collaborator is a narrow async trait injected as `Arc<dyn _>`, so the
//! process entry point owns their lifetime and tests substitute fakes.

#[cfg(test)]
pub(crate) mod fake_http;
mod llm;
mod news;
mod search;
mod weather;
mod wikipedia;

pub use llm::ChatCompletionClient;
pub use news::NewsApiClient;
pub use search::SerpApiClient;
pub use weather::OpenWeatherClient;
pub use wikipedia::WikipediaClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Turns a prompt into free-form text
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a completion for `prompt`
    ///
    /// # Errors
    ///
    /// Returns error if the model call fails
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Turns text into an audio byte stream
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text` into audio bytes
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// Outcome of a short encyclopedia lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncyclopediaLookup {
    /// A short summary of the matching article
    Summary(String),
    /// The term refers to several topics
    Ambiguous,
    /// No article matches the term
    Missing,
}

/// Encyclopedic lookup (summary and full article)
#[async_trait]
pub trait Encyclopedia: Send + Sync {
    /// Short summary for `term`
    ///
    /// # Errors
    ///
    /// Returns error if the provider is unreachable or errors
    async fn summary(&self, term: &str) -> Result<EncyclopediaLookup>;

    /// Full text of the top article matching `term`
    ///
    /// # Errors
    ///
    /// Returns error if no article matches or the page cannot be scraped
    async fn full_article(&self, term: &str) -> Result<String>;
}

/// Current weather conditions for a city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    /// Short description (e.g. "light rain")
    pub description: String,
    /// Temperature in degrees Celsius
    pub temperature_c: f64,
}

/// Weather lookup
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Current conditions for `city`; `None` when the city is unknown
    ///
    /// # Errors
    ///
    /// Returns error if the provider is unreachable or errors
    async fn current(&self, city: &str) -> Result<Option<WeatherReport>>;
}

/// One news headline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headline {
    /// Article title
    pub title: String,
    /// Publishing source name
    pub source: String,
}

/// News lookup
#[async_trait]
pub trait NewsProvider: Send + Sync {
    /// Latest headlines about `topic`
    ///
    /// # Errors
    ///
    /// Returns error if the provider is unreachable or errors
    async fn headlines(&self, topic: &str, limit: usize) -> Result<Vec<Headline>>;
}

/// Search result from web search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Result title
    pub title: String,
    /// Result URL
    pub url: String,
    /// Result snippet/description
    pub snippet: String,
}

/// Web search
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Search the web for `query`
    ///
    /// # Errors
    ///
    /// Returns error if the search request fails or response parsing fails
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>>;
}
