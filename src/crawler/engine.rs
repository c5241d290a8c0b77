//! Recursive, budget-bounded crawl below a root page
//!
//! # Crawl Lifecycle
//!
//! 1. The root is fetched through the selected provider. Providers with
//!    native discovery return the finished tree and the engine stays out.
//! 2. Links are extracted from the root's raw HTML, already visited URLs
//!    are dropped, and at most `max_subpages` candidates are claimed.
//! 3. Candidates are fetched at `depth + 1` through the child provider with
//!    at most `concurrency` fetches in flight, then expanded the same way
//!    until `max_depth` is reached.
//! 4. Failed children are left out. Children are reassembled in candidate
//!    order, and a page without any children gets no `subpages` at all.
//!
//! Each root owns its visited set and permit pool, so roots in a batch never
//! share budgets.

use super::parser::extract_links;
use crate::model::{BatchResult, PageResult, RequestOptions, UrlStatus};
use crate::providers::{Fetched, Provider};
use crate::url::{same_host, visit_key};
use futures::future::{join_all, BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Semaphore;
use url::Url;

/// Per-root crawl state
struct CrawlContext {
    visited: Mutex<HashSet<String>>,
    permits: Semaphore,
    options: RequestOptions,
    children: Arc<dyn Provider>,
}

impl CrawlContext {
    fn new(children: Arc<dyn Provider>, options: &RequestOptions) -> Self {
        Self {
            visited: Mutex::new(HashSet::new()),
            permits: Semaphore::new(options.effective_concurrency()),
            options: options.clone(),
            children,
        }
    }

    /// Marks a URL visited, returning false if it already was
    fn claim(&self, url: &str) -> bool {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(visit_key(url))
    }
}

/// Drives crawls for providers without native subpage discovery
#[derive(Clone)]
pub struct CrawlEngine {
    children: Arc<dyn Provider>,
}

impl CrawlEngine {
    /// Creates an engine that fetches every child page through `children`
    pub fn new(children: Arc<dyn Provider>) -> Self {
        Self { children }
    }

    /// Crawls one root through `provider`
    ///
    /// Only the root fetch can fail; child failures shrink the tree instead.
    ///
    /// # Returns
    ///
    /// * `Ok(PageResult)` - Root at depth 0 with any fetched subpages
    /// * `Err(LensError)` - The root could not be fetched
    pub async fn crawl_root(&self, provider: Arc<dyn Provider>, url: &str, options: &RequestOptions) -> crate::Result<PageResult> {
        if !options.wants_subpages() || provider.supports_subpages() {
            return provider.crawl_one(url, options).await;
        }

        let root = provider.fetch_document(url, options).await?;
        Ok(self.expand_root(root, options).await)
    }

    /// Crawls each root independently
    ///
    /// `statuses` lines up with `urls`. A failed root becomes an error
    /// status, except a rate limit, which fails the whole batch so the
    /// caller can retry it elsewhere.
    pub async fn crawl_roots(&self, provider: Arc<dyn Provider>, urls: &[String], options: &RequestOptions) -> crate::Result<BatchResult> {
        if !options.wants_subpages() || provider.supports_subpages() {
            return provider.crawl_many(urls, options).await;
        }

        let provider = &provider;
        let mut crawls = stream::iter(urls.iter().cloned())
            .map(|url| async move {
                let outcome = self.crawl_root(Arc::clone(provider), &url, options).await;
                (url, outcome)
            })
            .buffered(options.effective_concurrency());

        let mut batch = BatchResult::default();
        while let Some((url, outcome)) = crawls.next().await {
            match outcome {
                Ok(page) => {
                    batch.statuses.push(UrlStatus::success(url.as_str()));
                    batch.results.push(page);
                }
                Err(e) if e.is_rate_limit() => return Err(e),
                Err(e) => {
                    tracing::debug!("Crawl root {} failed: {}", url, e);
                    batch.statuses.push(UrlStatus::from_error(url.as_str(), &e));
                }
            }
        }

        Ok(batch)
    }

    /// Discovers and fetches subpages below an already fetched root
    pub async fn expand_root(&self, root: Fetched, options: &RequestOptions) -> PageResult {
        let ctx = Arc::new(CrawlContext::new(Arc::clone(&self.children), options));
        let Fetched {
            mut page,
            raw_html,
            final_url,
        } = root;

        ctx.claim(&page.url);
        if let Some(final_url) = &final_url {
            ctx.claim(final_url);
        }
        page.depth = Some(0);

        if !options.wants_subpages() {
            return page;
        }

        let document = match raw_html {
            Some(html) => Some((html, final_url.unwrap_or_else(|| page.url.clone()))),
            // The child provider already had its chance at a document
            None if page.provider == ctx.children.id() => None,
            None => {
                tracing::debug!("Root provider returned no document for {}, fetching locally", page.url);
                match ctx.children.fetch_document(&page.url, options).await {
                    Ok(local) => {
                        let base = local.final_url.unwrap_or_else(|| page.url.clone());
                        local.raw_html.map(|html| (html, base))
                    }
                    Err(e) => {
                        tracing::debug!("Link discovery for {} failed: {}", page.url, e);
                        None
                    }
                }
            }
        };

        if let Some((html, base)) = document {
            let children = expand(Arc::clone(&ctx), html, base, page.url.clone(), 0).await;
            tracing::debug!("Root {} has {} subpage(s)", page.url, children.len());
            page.set_subpages(children);
        }

        page
    }
}

/// Fetches the children of a page at `depth`
fn expand(ctx: Arc<CrawlContext>, html: String, base: String, origin: String, depth: u32) -> BoxFuture<'static, Vec<PageResult>> {
    async move {
        let options = &ctx.options;
        if depth >= options.max_depth || options.max_subpages == 0 {
            return Vec::new();
        }

        let Ok(base_url) = Url::parse(&base) else {
            return Vec::new();
        };
        let origin_url = Url::parse(&origin).ok();

        // Claiming inside the lazy chain claims exactly the candidates taken
        let candidates: Vec<String> = extract_links(&html, &base_url, options.same_domain_only)
            .into_iter()
            .filter(|link| !options.same_domain_only || stays_on_origin(link, origin_url.as_ref()))
            .filter(|link| ctx.claim(link))
            .take(options.max_subpages)
            .collect();

        tracing::trace!("{} candidate(s) below {} at depth {}", candidates.len(), origin, depth);

        let children = candidates
            .into_iter()
            .map(|url| fetch_child(Arc::clone(&ctx), url, depth + 1));

        join_all(children).await.into_iter().flatten().collect()
    }
    .boxed()
}

/// Fetches one child and expands it; `None` drops it from its parent
fn fetch_child(ctx: Arc<CrawlContext>, url: String, depth: u32) -> BoxFuture<'static, Option<PageResult>> {
    async move {
        if depth > ctx.options.max_depth {
            return None;
        }

        let fetched = {
            let _permit = ctx.permits.acquire().await.ok()?;
            ctx.children.fetch_document(&url, &ctx.options).await
        };

        let Fetched {
            mut page,
            raw_html,
            final_url,
        } = match fetched {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::debug!("Skipping subpage {}: {}", url, e);
                return None;
            }
        };

        if let Some(final_url) = &final_url {
            if !ctx.claim(final_url) {
                tracing::debug!("Subpage {} redirected to already visited {}", url, final_url);
                return None;
            }
        }

        page.depth = Some(depth);
        if let Some(html) = raw_html {
            let base = final_url.unwrap_or_else(|| url.clone());
            let children = expand(Arc::clone(&ctx), html, base, url, depth).await;
            page.set_subpages(children);
        }

        Some(page)
    }
    .boxed()
}

fn stays_on_origin(link: &str, origin: Option<&Url>) -> bool {
    match (Url::parse(link), origin) {
        (Ok(link), Some(origin)) => same_host(&link, origin),
        _ => true,
    }
}
