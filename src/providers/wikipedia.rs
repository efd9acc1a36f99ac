//! Wikipedia lookups: short page summaries and full-article scraping

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::Deserialize;

use super::{Encyclopedia, EncyclopediaLookup};
use crate::{Error, Result};

/// Sentences kept from a page summary
const SUMMARY_SENTENCES: usize = 3;

/// Wikipedia client
pub struct WikipediaClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct PageSummary {
    #[serde(rename = "type", default)]
    page_type: String,
    #[serde(default)]
    extract: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

impl WikipediaClient {
    /// Create a client for the given language edition (e.g. "en")
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(language: &str) -> Result<Self> {
        Self::with_base_url(format!("https://{language}.wikipedia.org"))
    }

    /// Create a client against a `MediaWiki` host with the REST API enabled
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("jarvis-gateway/0.1 (voice assistant)")
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn page_slug(term: &str) -> String {
        urlencoding::encode(&term.trim().replace(' ', "_")).into_owned()
    }

    /// Title of the best search match for `term`
    async fn top_match(&self, term: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(format!("{}/w/api.php", self.base_url))
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", term),
                ("srlimit", "1"),
                ("format", "json"),
            ])
            .send()
            .await?
            .error_for_status()
            .map_err(Error::Http)?;

        let parsed: SearchResponse = response.json().await?;
        Ok(parsed
            .query
            .and_then(|q| q.search.into_iter().next())
            .map(|hit| hit.title))
    }
}

#[async_trait]
impl Encyclopedia for WikipediaClient {
    async fn summary(&self, term: &str) -> Result<EncyclopediaLookup> {
        tracing::info!(term, "searching Wikipedia");

        // Free-form terms ("Capital of Peru") rarely name a page exactly
        let Some(title) = self.top_match(term).await? else {
            tracing::warn!(term, "no Wikipedia page found");
            return Ok(EncyclopediaLookup::Missing);
        };
        tracing::debug!(term, title = %title, "resolved Wikipedia title");

        let url = format!("{}/api/rest_v1/page/summary/{}", self.base_url, Self::page_slug(&title));
        let response = self.client.get(url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::warn!(title = %title, "Wikipedia page vanished after search");
            return Ok(EncyclopediaLookup::Missing);
        }
        let response = response.error_for_status().map_err(Error::Http)?;
        let page: PageSummary = response.json().await?;

        Ok(classify_summary(page))
    }

    async fn full_article(&self, term: &str) -> Result<String> {
        tracing::info!(term, "scraping Wikipedia page");

        let title = self
            .top_match(term)
            .await?
            .ok_or_else(|| Error::Provider(format!("no Wikipedia article matches '{term}'")))?;

        let html = self
            .client
            .get(format!("{}/wiki/{}", self.base_url, Self::page_slug(&title)))
            .send()
            .await?
            .error_for_status()
            .map_err(Error::Http)?
            .text()
            .await?;

        let content = extract_paragraphs(&html)?;
        if content.is_empty() {
            return Err(Error::Provider(format!("Wikipedia page '{title}' has no text")));
        }
        Ok(content)
    }
}

fn classify_summary(page: PageSummary) -> EncyclopediaLookup {
    if page.page_type == "disambiguation" {
        return EncyclopediaLookup::Ambiguous;
    }
    let text = first_sentences(&page.extract, SUMMARY_SENTENCES);
    if text.is_empty() {
        EncyclopediaLookup::Missing
    } else {
        EncyclopediaLookup::Summary(text)
    }
}

/// Keep the first `count` sentences of `text`
fn first_sentences(text: &str, count: usize) -> String {
    let mut seen = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = chars.peek().is_none_or(|(_, next)| next.is_whitespace());
            if at_boundary {
                seen += 1;
                if seen == count {
                    return text[..idx + c.len_utf8()].trim().to_string();
                }
            }
        }
    }
    text.trim().to_string()
}

/// Plain text of the article body paragraphs
fn extract_paragraphs(html: &str) -> Result<String> {
    let selector = Selector::parse("div.mw-parser-output > p")
        .map_err(|e| Error::Provider(format!("invalid selector: {e}")))?;
    let document = Html::parse_document(html);

    let paragraphs: Vec<String> = document
        .select(&selector)
        .map(|p| p.text().collect::<String>().trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();

    Ok(paragraphs.join("\n\n"))
}
