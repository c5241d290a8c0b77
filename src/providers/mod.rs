//! Content-acquisition backends
//!
//! Every backend implements [`Provider`]. Selection and fallback depend
//! only on the trait, never on a concrete adapter.
//!
//! - `LocalProvider`: direct HTTP fetch plus local normalization, no credentials
//! - `ExaProvider`: hosted extraction with native subpage discovery
//! - `FirecrawlProvider`: hosted scraping with cached results and full HTML

mod exa;
mod firecrawl;
mod local;

pub use exa::{is_exa_rate_limit, ExaProvider};
pub use firecrawl::{is_firecrawl_rate_limit, FirecrawlProvider};
pub use local::LocalProvider;

use crate::model::{BatchResult, PageResult, ProviderId, RequestOptions, UrlStatus};
use crate::LensError;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::Arc;

/// A page together with the raw document it was extracted from
///
/// The crawl engine discovers links from `raw_html`; providers that cannot
/// return the source document leave it unset.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub page: PageResult,
    pub raw_html: Option<String>,
    /// URL the document was finally served from, when it differs from the request
    pub final_url: Option<String>,
}

impl Fetched {
    pub fn page_only(page: PageResult) -> Self {
        Self {
            page,
            raw_html: None,
            final_url: None,
        }
    }
}

/// Interface shared by every content-acquisition backend
///
/// # Thread Safety
///
/// Providers are shared as `Arc<dyn Provider>` across concurrent requests
/// and must be `Send + Sync`.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Identity used for state tracking and result attribution
    fn id(&self) -> ProviderId;

    /// Whether the backend can run at all (credentials present)
    ///
    /// Never touches the network.
    fn is_available(&self) -> bool;

    /// Whether the backend discovers subpages server-side
    fn supports_subpages(&self) -> bool {
        false
    }

    /// Fetches and normalizes a single page
    async fn fetch_one(&self, url: &str, options: &RequestOptions) -> crate::Result<PageResult>;

    /// Fetches several pages
    ///
    /// `statuses` lines up with `urls` by position. A rate-limit signal
    /// fails the whole call so the caller can fall back.
    async fn fetch_many(&self, urls: &[String], options: &RequestOptions) -> crate::Result<BatchResult>;

    /// Fetches a page plus its raw document for link discovery
    async fn fetch_document(&self, url: &str, options: &RequestOptions) -> crate::Result<Fetched> {
        self.fetch_one(url, options).await.map(Fetched::page_only)
    }

    /// Fetches a page with natively discovered subpages
    ///
    /// Backends without native discovery return the flat page at depth 0.
    async fn crawl_one(&self, url: &str, options: &RequestOptions) -> crate::Result<PageResult> {
        let mut page = self.fetch_one(url, options).await?;
        page.depth = Some(0);
        Ok(page)
    }

    /// Batch form of [`crawl_one`](Provider::crawl_one)
    async fn crawl_many(&self, urls: &[String], options: &RequestOptions) -> crate::Result<BatchResult> {
        let mut batch = self.fetch_many(urls, options).await?;
        for page in &mut batch.results {
            page.depth = Some(0);
        }
        Ok(batch)
    }
}

/// Runs `fetch_one` for every URL with at most `concurrency` calls in flight
///
/// Results keep input order. Per-URL failures become error statuses; the
/// first rate-limit signal aborts the batch and drops the pending calls.
pub(crate) async fn fetch_each<P>(provider: &P, urls: &[String], options: &RequestOptions) -> crate::Result<BatchResult>
where
    P: Provider + ?Sized,
{
    let mut outcomes = stream::iter(urls.iter().cloned())
        .map(|url| async move {
            let outcome = provider.fetch_one(&url, options).await;
            (url, outcome)
        })
        .buffered(options.effective_concurrency());

    let mut batch = BatchResult::default();
    while let Some((url, outcome)) = outcomes.next().await {
        match outcome {
            Ok(page) => {
                batch.statuses.push(UrlStatus::success(url.as_str()));
                batch.results.push(page);
            }
            Err(e) if e.is_rate_limit() => return Err(e),
            Err(e) => {
                tracing::debug!("{} failed for {}: {}", provider.id(), url, e);
                batch.statuses.push(UrlStatus::from_error(url.as_str(), &e));
            }
        }
    }

    Ok(batch)
}

/// Builds the three built-in providers from configuration
pub fn default_providers(config: &crate::Config) -> crate::Result<Vec<Arc<dyn Provider>>> {
    let local = LocalProvider::new(&config.fetch)?;
    let exa = ExaProvider::from_config(&config.providers.exa, &config.fetch)?;
    let firecrawl = FirecrawlProvider::from_config(&config.providers.firecrawl, &config.fetch)?;

    Ok(vec![Arc::new(local), Arc::new(exa), Arc::new(firecrawl)])
}

/// Reads an error body, keeping it short enough for a log line
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    const MAX_ERROR_BODY: usize = 512;

    let body = response.text().await.unwrap_or_default();
    crate::content::truncate_chars(body.trim(), MAX_ERROR_BODY)
}

/// Maps a transport error from a remote API call
pub(crate) fn transport_error(url: &str, error: reqwest::Error) -> LensError {
    let message = if error.is_timeout() {
        "request timeout".to_string()
    } else {
        error.to_string()
    };
    LensError::fetch(url, message, error.status().map(|s| s.as_u16()))
}
