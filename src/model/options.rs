use super::ProviderId;
use serde::{Deserialize, Serialize};

/// Freshness preference forwarded to providers that can fetch live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiveCrawl {
    /// Only serve cached content
    Never,
    /// Serve cached content, fetch live when nothing is cached
    Fallback,
    /// Prefer a live fetch, fall back to cache on failure
    Preferred,
    /// Always fetch live
    Always,
}

impl LiveCrawl {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Never => "never",
            Self::Fallback => "fallback",
            Self::Preferred => "preferred",
            Self::Always => "always",
        }
    }
}

/// Keyword hint steering native subpage discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubpageTarget {
    One(String),
    Many(Vec<String>),
}

/// Caller-supplied options for fetch and crawl requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RequestOptions {
    /// Preferred provider, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderId>,

    /// Try alternate providers when the chosen one is rate limited
    pub fallback: bool,

    /// Produce a markdown rendition
    pub markdown: bool,

    /// Produce a sanitized HTML rendition
    pub html: bool,

    /// Truncation bound applied independently to text and markdown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_chars: Option<usize>,

    /// Freshness preference for providers that support live fetching
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_crawl: Option<LiveCrawl>,

    /// Maximum acceptable cache age in milliseconds for cache-backed providers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u64>,

    /// Maximum subpages followed per page (0 disables recursion)
    pub max_subpages: usize,

    /// Maximum crawl depth below the root
    pub max_depth: u32,

    /// Maximum in-flight child fetches per crawl root
    pub concurrency: usize,

    /// Only follow links that stay on the page's host
    pub same_domain_only: bool,

    /// Keyword hint for providers with targeted discovery
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subpage_target: Option<SubpageTarget>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            provider: None,
            fallback: true,
            markdown: true,
            html: false,
            max_chars: None,
            live_crawl: None,
            max_age: None,
            max_subpages: 0,
            max_depth: 1,
            concurrency: 5,
            same_domain_only: true,
            subpage_target: None,
        }
    }
}

impl RequestOptions {
    /// Create options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_provider(mut self, provider: ProviderId) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    #[must_use]
    pub fn with_markdown(mut self, markdown: bool) -> Self {
        self.markdown = markdown;
        self
    }

    #[must_use]
    pub fn with_html(mut self, html: bool) -> Self {
        self.html = html;
        self
    }

    #[must_use]
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = Some(max_chars);
        self
    }

    #[must_use]
    pub fn with_live_crawl(mut self, live_crawl: LiveCrawl) -> Self {
        self.live_crawl = Some(live_crawl);
        self
    }

    #[must_use]
    pub fn with_max_age(mut self, max_age_ms: u64) -> Self {
        self.max_age = Some(max_age_ms);
        self
    }

    #[must_use]
    pub fn with_max_subpages(mut self, max_subpages: usize) -> Self {
        self.max_subpages = max_subpages;
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    #[must_use]
    pub fn with_same_domain_only(mut self, same_domain_only: bool) -> Self {
        self.same_domain_only = same_domain_only;
        self
    }

    #[must_use]
    pub fn with_subpage_target(mut self, target: SubpageTarget) -> Self {
        self.subpage_target = Some(target);
        self
    }

    /// Concurrency bound, never below one
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }

    /// Whether a crawl with these options can recurse at all
    pub fn wants_subpages(&self) -> bool {
        self.max_subpages > 0 && self.max_depth > 0
    }
}
