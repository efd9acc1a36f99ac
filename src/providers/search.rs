//! Google web search through `SerpApi`

use async_trait::async_trait;
use serde::Deserialize;

use super::{SearchProvider, SearchResult};
use crate::{Error, Result};

const SERPAPI_BASE_URL: &str = "https://serpapi.com";

/// `SerpApi` reports an empty result page as an error string
const NO_RESULTS_ERROR: &str = "hasn't returned any results";

/// Web search client backed by `SerpApi`'s Google engine
pub struct SerpApiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SerpApiResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

impl SerpApiClient {
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, SERPAPI_BASE_URL)
    }

    /// Client against a different `SerpApi`-compatible host
    #[must_use]
    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

fn into_results(response: SerpApiResponse, limit: usize) -> Result<Vec<SearchResult>> {
    if let Some(error) = response.error {
        if error.contains(NO_RESULTS_ERROR) {
            return Ok(Vec::new());
        }
        return Err(Error::Provider(format!("SerpApi: {error}")));
    }

    Ok(response
        .organic_results
        .into_iter()
        .take(limit)
        .map(|r| SearchResult {
            title: r.title,
            url: r.link,
            snippet: r.snippet,
        })
        .collect())
}

#[async_trait]
impl SearchProvider for SerpApiClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        tracing::info!(query, "performing web search");

        let response = self
            .client
            .get(format!("{}/search.json", self.base_url))
            .query(&[
                ("engine", "google"),
                ("q", query),
                ("num", &limit.to_string()),
                ("api_key", &self.api_key),
            ])
            .send()
            .await?
            .error_for_status()
            .map_err(Error::Http)?;

        let parsed: SerpApiResponse = response.json().await?;
        let results = into_results(parsed, limit)?;
        tracing::debug!(count = results.len(), "web search finished");
        Ok(results)
    }
}
