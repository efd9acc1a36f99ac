//! Bounded-latency local summarization with a content-keyed memo cache

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use lru::LruCache;
use tokio::sync::Mutex;

use crate::providers::Generator;

/// Outcome of one summarization attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Summary {
    /// Summarized text (fresh or cached)
    Done(String),
    /// The deadline passed; the in-flight call was dropped
    TimedOut,
    /// The generator failed
    Failed(String),
}

impl Summary {
    /// Summarized text, or `fallback` when summarization did not complete
    #[must_use]
    pub fn or_raw(self, fallback: &str) -> String {
        match self {
            Self::Done(text) => text,
            Self::TimedOut | Self::Failed(_) => fallback.to_string(),
        }
    }
}

/// Wraps the generator with a deadline and memoizes successful summaries
///
/// The cache is keyed by the exact input text. Concurrent misses on the same
/// text may both call the generator; the last insert wins.
pub struct Summarizer {
    generator: Arc<dyn Generator>,
    timeout: Duration,
    cache: Mutex<LruCache<String, String>>,
}

impl Summarizer {
    /// Create a summarizer; a `cache_capacity` of 0 leaves the cache unbounded
    #[must_use]
    pub fn new(generator: Arc<dyn Generator>, timeout: Duration, cache_capacity: usize) -> Self {
        let cache = NonZeroUsize::new(cache_capacity).map_or_else(LruCache::unbounded, LruCache::new);
        Self {
            generator,
            timeout,
            cache: Mutex::new(cache),
        }
    }

    fn prompt(text: &str) -> String {
        format!("Summarize the following information professionally:\n\n{text}")
    }

    /// Summarize `text` within the configured deadline
    pub async fn summarize(&self, text: &str) -> Summary {
        {
            let mut cache = self.cache.lock().await;
            if let Some(cached) = cache.get(text) {
                tracing::debug!("summary cache hit");
                return Summary::Done(cached.clone());
            }
        }

        tracing::info!(chars = text.len(), "summarizing text");
        let prompt = Self::prompt(text);

        // Dropping the future on timeout cancels the in-flight request
        match tokio::time::timeout(self.timeout, self.generator.generate(&prompt)).await {
            Ok(Ok(summary)) => {
                let summary = summary.trim().to_string();
                self.cache.lock().await.put(text.to_string(), summary.clone());
                Summary::Done(summary)
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "local summarization failed");
                Summary::Failed(e.to_string())
            }
            Err(_) => {
                tracing::warn!(timeout_secs = self.timeout.as_secs(), "summarization timed out");
                Summary::TimedOut
            }
        }
    }

    /// Number of cached summaries
    pub async fn cached_len(&self) -> usize {
        self.cache.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::{Error, Result};

    struct CountingGenerator {
        calls: AtomicUsize,
        delay: Duration,
        fail: bool,
    }

    impl CountingGenerator {
        fn new(delay: Duration, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay,
                fail,
            })
        }
    }

    #[async_trait]
    impl Generator for CountingGenerator {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(Error::Llm("model offline".to_string()));
            }
            Ok(format!(" summary of {} chars ", prompt.len()))
        }
    }

    #[tokio::test]
    async fn test_summary_is_cached_by_input_text() {
        let generator = CountingGenerator::new(Duration::ZERO, false);
        let summarizer = Summarizer::new(generator.clone(), Duration::from_secs(5), 8);

        let first = summarizer.summarize("long text").await;
        let second = summarizer.summarize("long text").await;

        assert_eq!(first, second);
        assert!(matches!(first, Summary::Done(ref s) if s.starts_with("summary of")));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);

        summarizer.summarize("other text").await;
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
        assert_eq!(summarizer.cached_len().await, 2);
    }

    #[tokio::test]
    async fn test_timeout_is_not_cached() {
        let generator = CountingGenerator::new(Duration::from_secs(60), false);
        let summarizer = Summarizer::new(generator.clone(), Duration::from_millis(50), 8);

        let summary = summarizer.summarize("slow").await;
        assert_eq!(summary, Summary::TimedOut);
        assert_eq!(summary.or_raw("slow"), "slow");
        assert_eq!(summarizer.cached_len().await, 0);
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_raw() {
        let generator = CountingGenerator::new(Duration::ZERO, true);
        let summarizer = Summarizer::new(generator, Duration::from_secs(5), 8);

        let summary = summarizer.summarize("raw text").await;
        assert!(matches!(summary, Summary::Failed(_)));
        assert_eq!(summary.or_raw("raw text"), "raw text");
    }

    #[tokio::test]
    async fn test_bounded_cache_evicts_oldest() {
        let generator = CountingGenerator::new(Duration::ZERO, false);
        let summarizer = Summarizer::new(generator.clone(), Duration::from_secs(5), 1);

        summarizer.summarize("a").await;
        summarizer.summarize("b").await;
        summarizer.summarize("a").await;

        assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
        assert_eq!(summarizer.cached_len().await, 1);
    }
}
