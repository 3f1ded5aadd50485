//! News search through SerpApi's Google News engine, with memoization.
//!
//! # Architecture
//!
//! - [`NewsSearch`]: core trait turning a topic into article links
//! - [`SerpApiNews`]: the HTTP implementation
//! - [`Memoized`]: decorator that serves repeated topics from an LRU cache
//!   for [`CACHE_TTL`] without calling the wrapped search again
//!
//! Failures are never cached.

use crate::error::SearchError;
use crate::models::SearchResult;
use lru::LruCache;
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// How long a topic's links are reused.
pub const CACHE_TTL: Duration = Duration::from_secs(60 * 60);

const CACHE_CAPACITY: NonZeroUsize = NonZeroUsize::new(64).unwrap();

/// Trait for topic → article link lookups.
pub trait NewsSearch {
    /// Return the ordered article links for `topic`.
    async fn search(&mut self, topic: &str) -> Result<Vec<SearchResult>, SearchError>;
}

#[derive(Debug, Deserialize)]
struct SerpApiResponse {
    #[serde(default)]
    news_results: Vec<NewsResultItem>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsResultItem {
    link: Option<String>,
}

/// Google News search through SerpApi, localized for Brazil.
pub struct SerpApiNews {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl SerpApiNews {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }
}

impl fmt::Debug for SerpApiNews {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerpApiNews")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl NewsSearch for SerpApiNews {
    #[instrument(level = "info", skip(self))]
    async fn search(&mut self, topic: &str) -> Result<Vec<SearchResult>, SearchError> {
        let t0 = Instant::now();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", topic),
                ("tbm", "nws"),
                ("hl", "pt-br"),
                ("gl", "br"),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }

        let body: SerpApiResponse = response.json().await?;
        let links = links_from_response(body)?;
        info!(
            count = links.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Indexed news article URLs"
        );
        debug!(urls = ?links, "Search result URLs");
        Ok(links)
    }
}

fn links_from_response(body: SerpApiResponse) -> Result<Vec<SearchResult>, SearchError> {
    if let Some(message) = body.error {
        // SerpApi reports "no results" as an error string too
        if body.news_results.is_empty() && message.contains("hasn't returned any results") {
            return Ok(Vec::new());
        }
        return Err(SearchError::Provider(message));
    }
    Ok(body
        .news_results
        .into_iter()
        .filter_map(|item| item.link)
        .filter(|link| !link.trim().is_empty())
        .map(|url| SearchResult { url })
        .collect())
}

struct CachedLinks {
    fetched_at: Instant,
    results: Vec<SearchResult>,
}

/// Decorator caching successful searches per topic for a fixed window.
pub struct Memoized<T> {
    inner: T,
    ttl: Duration,
    cache: LruCache<String, CachedLinks>,
}

impl<T> Memoized<T>
where
    T: NewsSearch,
{
    /// Wrap `inner`, reusing results for `ttl` ([`CACHE_TTL`] in production).
    pub fn new(inner: T, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cache: LruCache::new(CACHE_CAPACITY),
        }
    }
}

impl<T> fmt::Debug for Memoized<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized")
            .field("ttl", &self.ttl)
            .field("cached_topics", &self.cache.len())
            .finish()
    }
}

impl<T> NewsSearch for Memoized<T>
where
    T: NewsSearch,
{
    async fn search(&mut self, topic: &str) -> Result<Vec<SearchResult>, SearchError> {
        if let Some(hit) = self.cache.get(topic) {
            if hit.fetched_at.elapsed() < self.ttl {
                debug!(topic, count = hit.results.len(), "Search cache hit");
                return Ok(hit.results.clone());
            }
        }

        match self.inner.search(topic).await {
            Ok(results) => {
                self.cache.put(
                    topic.to_string(),
                    CachedLinks {
                        fetched_at: Instant::now(),
                        results: results.clone(),
                    },
                );
                Ok(results)
            }
            Err(e) => {
                warn!(topic, error = %e, "News search failed");
                Err(e)
            }
        }
    }
}
