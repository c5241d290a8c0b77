//! Extraction facade
//!
//! The `Extractor` owns the providers, their shared health state and the
//! crawl engine, and exposes the operations callers use:
//!
//! - `fetch_single` / `fetch_batch`: normalized pages
//! - `crawl_single` / `crawl_batch`: pages with discovered subpages
//! - `list_available_providers`: backends usable right now
//!
//! Every request goes through the same path: URL validation, provider
//! selection, then the adapter call wrapped in rate-limit fallback.

use crate::config::{validate, Config};
use crate::crawler::CrawlEngine;
use crate::model::{BatchResult, PageResult, ProviderId, RequestOptions, UrlStatus};
use crate::providers::{default_providers, Provider};
use crate::routing::{select_provider, FallbackOrchestrator};
use crate::state::{ProviderState, ProviderStateTracker};
use crate::url::validate_request_url;
use crate::{ConfigError, LensError};
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Entry point for fetching and crawling
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
///
/// # Example
///
/// ```no_run
/// use sumi_lens::{Config, Extractor, RequestOptions};
///
/// # async fn run() -> sumi_lens::Result<()> {
/// let extractor = Extractor::new(Config::default())?;
/// let page = extractor
///     .fetch_single("https://example.com", &RequestOptions::default())
///     .await?;
/// println!("{} via {}", page.url, page.provider);
/// # Ok(())
/// # }
/// ```
pub struct Extractor {
    providers: BTreeMap<ProviderId, Arc<dyn Provider>>,
    tracker: ProviderStateTracker,
    engine: CrawlEngine,
}

impl Extractor {
    /// Builds the built-in providers from a validated configuration
    pub fn new(config: Config) -> crate::Result<Self> {
        validate(&config)?;
        let providers = default_providers(&config)?;
        Self::with_providers(providers, config.rate_limit.cooldown())
    }

    /// Builds an extractor around the given providers
    ///
    /// A `local` provider is required; it serves crawl children. Provider
    /// availability is read once, here.
    pub fn with_providers(providers: Vec<Arc<dyn Provider>>, cooldown: Duration) -> crate::Result<Self> {
        let providers: BTreeMap<ProviderId, Arc<dyn Provider>> =
            providers.into_iter().map(|p| (p.id(), p)).collect();

        let local = providers.get(&ProviderId::Local).cloned().ok_or_else(|| {
            ConfigError::Validation("a local provider is required".to_string())
        })?;

        let tracker = ProviderStateTracker::new(
            cooldown,
            providers.iter().map(|(id, p)| (*id, p.is_available())),
        );

        let available: Vec<&str> = providers
            .values()
            .filter(|p| p.is_available())
            .map(|p| p.id().as_str())
            .collect();
        tracing::info!("Providers available: {}", available.join(", "));

        Ok(Self {
            providers,
            tracker,
            engine: CrawlEngine::new(local),
        })
    }

    /// Fetches and normalizes one page
    ///
    /// # Errors
    ///
    /// * `InvalidUrl` - not an absolute http(s) URL
    /// * `NoProviderAvailable` - no backend is usable
    /// * `ProviderUnavailable` - the preferred backend is unusable and fallback is off
    /// * `RateLimited` - the selected backend and every alternate were throttled
    /// * `FetchFailure` / `ParseFailure` - the page itself failed
    pub async fn fetch_single(&self, url: &str, options: &RequestOptions) -> crate::Result<PageResult> {
        validate_request_url(url)?;
        self.route(options, |provider| async move {
            provider.fetch_one(url, options).await
        })
        .await
    }

    /// Fetches several pages
    ///
    /// `statuses` matches `urls` by position. Invalid URLs get an
    /// `INVALID_URL` status and never reach a provider. An empty list
    /// returns an empty result without selecting a provider.
    pub async fn fetch_batch(&self, urls: &[String], options: &RequestOptions) -> crate::Result<BatchResult> {
        self.batch(urls, options, |provider, valid| async move {
            provider.fetch_many(&valid, options).await
        })
        .await
    }

    /// Fetches a page and its subpages
    ///
    /// Same failure modes as [`fetch_single`](Self::fetch_single); subpage
    /// failures only shrink the tree.
    pub async fn crawl_single(&self, url: &str, options: &RequestOptions) -> crate::Result<PageResult> {
        validate_request_url(url)?;
        let engine = &self.engine;
        self.route(options, |provider| async move {
            engine.crawl_root(provider, url, options).await
        })
        .await
    }

    /// Crawls several roots, each with its own visited set and budget
    ///
    /// A rate limit on any root fails the attempt for the whole batch,
    /// which is then retried on an alternate provider when fallback allows.
    pub async fn crawl_batch(&self, urls: &[String], options: &RequestOptions) -> crate::Result<BatchResult> {
        let engine = &self.engine;
        self.batch(urls, options, |provider, valid| async move {
            engine.crawl_roots(provider, &valid, options).await
        })
        .await
    }

    /// Providers that are available and not rate limited
    pub fn list_available_providers(&self) -> BTreeSet<ProviderId> {
        self.tracker.usable_providers()
    }

    /// Snapshot of every provider's health
    pub fn provider_states(&self) -> BTreeMap<ProviderId, ProviderState> {
        self.tracker.snapshot()
    }

    /// Selects a provider and runs `op` with rate-limit fallback
    async fn route<T, F, Fut>(&self, options: &RequestOptions, op: F) -> crate::Result<T>
    where
        F: Fn(Arc<dyn Provider>) -> Fut,
        Fut: Future<Output = crate::Result<T>>,
    {
        let primary = select_provider(&self.tracker, options)?;
        tracing::info!("Selected provider {}", primary);

        let orchestrator = FallbackOrchestrator::new(&self.tracker, &self.providers);
        let (served_by, value) = orchestrator.execute(primary, options.fallback, op).await?;
        if served_by != primary {
            tracing::info!("Request served by {} instead of {}", served_by, primary);
        }
        Ok(value)
    }

    /// Validates batch input, routes the valid URLs and merges statuses back
    async fn batch<F, Fut>(&self, urls: &[String], options: &RequestOptions, op: F) -> crate::Result<BatchResult>
    where
        F: Fn(Arc<dyn Provider>, Vec<String>) -> Fut,
        Fut: Future<Output = crate::Result<BatchResult>>,
    {
        if urls.is_empty() {
            return Ok(BatchResult::default());
        }

        let mut invalid = BTreeMap::new();
        let mut valid = Vec::new();
        for (index, url) in urls.iter().enumerate() {
            match validate_request_url(url) {
                Ok(_) => valid.push(url.clone()),
                Err(e) => {
                    tracing::debug!("Rejecting batch entry {}: {}", url, e);
                    invalid.insert(index, UrlStatus::from_error(url.as_str(), &e));
                }
            }
        }

        let routed = if valid.is_empty() {
            BatchResult::default()
        } else {
            self.route(options, |provider| op(provider, valid.clone())).await?
        };

        Ok(merge_statuses(urls, invalid, routed))
    }
}

/// Interleaves pre-computed statuses with a routed batch's statuses
fn merge_statuses(urls: &[String], mut invalid: BTreeMap<usize, UrlStatus>, routed: BatchResult) -> BatchResult {
    let BatchResult { results, statuses } = routed;
    let mut routed_statuses = statuses.into_iter();

    let statuses = urls
        .iter()
        .enumerate()
        .map(|(index, url)| {
            invalid.remove(&index).unwrap_or_else(|| {
                routed_statuses.next().unwrap_or_else(|| {
                    UrlStatus::from_error(
                        url.as_str(),
                        &LensError::fetch(url, "provider returned no status", None),
                    )
                })
            })
        })
        .collect();

    BatchResult { results, statuses }
}
