use std::sync::Arc;

use async_trait::async_trait;
use blobperf_store::{BlobLocation, BlobStore};
use bytes::Bytes;

use crate::error::{BenchError, BenchResult};
use crate::stages::link::RetrievalReference;
use crate::timing::{timed, Timed};

/// One way of retrieving the blob behind a reference.
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    /// Human-readable name of this strategy.
    fn name(&self) -> &str;

    async fn fetch(&self, reference: &RetrievalReference) -> BenchResult<Bytes>;
}

/// Plain HTTP GET of the reference URL, no credentials attached.
pub struct UrlFetch {
    client: reqwest::Client,
}

impl UrlFetch {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FetchStrategy for UrlFetch {
    fn name(&self) -> &str {
        "url"
    }

    async fn fetch(&self, reference: &RetrievalReference) -> BenchResult<Bytes> {
        let response = self
            .client
            .get(&reference.url)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.bytes().await?)
    }
}

/// Authenticated read through the store, ignoring the reference.
pub struct StoreFetch {
    store: Arc<dyn BlobStore>,
    location: BlobLocation,
}

impl StoreFetch {
    pub fn new(store: Arc<dyn BlobStore>, location: BlobLocation) -> Self {
        Self { store, location }
    }
}

#[async_trait]
impl FetchStrategy for StoreFetch {
    fn name(&self) -> &str {
        "store"
    }

    async fn fetch(&self, _reference: &RetrievalReference) -> BenchResult<Bytes> {
        Ok(self.store.get(&self.location).await?)
    }
}

/// Downloads content by trying strategies in order.
///
/// The first strategy is the primary path. If every strategy fails the
/// last strategy's error is returned; earlier errors are only logged.
pub struct ContentFetcher {
    strategies: Vec<Box<dyn FetchStrategy>>,
}

impl ContentFetcher {
    /// URL download only. Without a fallback a failed download is fatal.
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            strategies: vec![Box::new(UrlFetch::new(client))],
        }
    }

    /// Build from an explicit strategy list.
    pub fn with_strategies(strategies: Vec<Box<dyn FetchStrategy>>) -> Self {
        Self { strategies }
    }

    /// Fall back to an authenticated store read of `location`.
    pub fn with_fallback(mut self, store: Arc<dyn BlobStore>, location: BlobLocation) -> Self {
        self.strategies.push(Box::new(StoreFetch::new(store, location)));
        self
    }

    /// Number of strategies.
    pub fn strategy_count(&self) -> usize {
        self.strategies.len()
    }

    /// Retrieve the content. The window spans every attempt made, including
    /// failed ones.
    pub async fn fetch(&self, reference: &RetrievalReference) -> BenchResult<Timed<Bytes>> {
        let fetched = timed(self.run_strategies(reference)).await.transpose()?;
        tracing::info!("Download completed in {:.2} ms", fetched.elapsed_ms());
        Ok(fetched)
    }

    async fn run_strategies(&self, reference: &RetrievalReference) -> BenchResult<Bytes> {
        let mut last_error = None;
        for (index, strategy) in self.strategies.iter().enumerate() {
            match strategy.fetch(reference).await {
                Ok(bytes) => {
                    tracing::debug!(strategy = strategy.name(), bytes = bytes.len(), "content fetched");
                    return Ok(bytes);
                }
                Err(e) => {
                    if let Some(next) = self.strategies.get(index + 1) {
                        tracing::warn!(
                            strategy = strategy.name(),
                            "{} download failed: {e}. Trying {} access.",
                            strategy.name(),
                            next.name()
                        );
                    } else {
                        tracing::warn!(strategy = strategy.name(), "{} download failed: {e}", strategy.name());
                    }
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| BenchError::Internal("no fetch strategies configured".into())))
    }
}
