//! `NewsAPI` headline client

use async_trait::async_trait;
use serde::Deserialize;

use super::{Headline, NewsProvider};
use crate::{Error, Result};

const BASE_URL: &str = "https://newsapi.org/v2/everything";

/// News headline client
pub struct NewsApiClient {
    client: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    articles: Vec<NewsArticle>,
}

#[derive(Debug, Deserialize)]
struct NewsArticle {
    title: Option<String>,
    source: NewsSource,
}

#[derive(Debug, Deserialize)]
struct NewsSource {
    name: Option<String>,
}

impl NewsApiClient {
    /// Create a new news client
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }
}

fn into_headlines(response: NewsResponse) -> Vec<Headline> {
    response
        .articles
        .into_iter()
        .filter_map(|a| {
            Some(Headline {
                title: a.title?,
                source: a.source.name.unwrap_or_else(|| "unknown source".to_string()),
            })
        })
        .collect()
}

#[async_trait]
impl NewsProvider for NewsApiClient {
    async fn headlines(&self, topic: &str, limit: usize) -> Result<Vec<Headline>> {
        tracing::info!(topic, "fetching news");

        let response = self
            .client
            .get(BASE_URL)
            .header("X-Api-Key", &self.api_key)
            .header("User-Agent", "jarvis-gateway/0.1")
            .query(&[
                ("q", topic),
                ("language", "en"),
                ("sortBy", "publishedAt"),
                ("pageSize", &limit.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!("news API error {status}: {body}")));
        }

        let parsed: NewsResponse = response.json().await?;
        Ok(into_headlines(parsed))
    }
}
