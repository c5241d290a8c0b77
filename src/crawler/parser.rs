//! Link extraction for crawl discovery
//!
//! Pulls outbound `<a href>` targets out of a page, resolves them against
//! the page URL, and returns them deduplicated in first-seen order.

use crate::url::same_host;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracts crawlable links from an HTML page
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` targets that resolve to `http`/`https` URLs
///
/// **Exclude:**
/// - Empty and fragment-only hrefs (same page anchors)
/// - `mailto:`, `javascript:`, `tel:` and `data:` targets
/// - `<a href="..." download>`
/// - Links to another host when `same_domain_only` is set
///
/// Fragments are stripped from the returned URLs. Hrefs that fail to
/// resolve are skipped silently.
///
/// # Example
///
/// ```
/// use sumi_lens::crawler::extract_links;
/// use url::Url;
///
/// let html = r#"<a href="/docs">Docs</a><a href="https://other.com/">Other</a><a href="/docs#top">Top</a>"#;
/// let base = Url::parse("https://example.com/").unwrap();
///
/// assert_eq!(extract_links(html, &base, true), vec!["https://example.com/docs"]);
/// assert_eq!(extract_links(html, &base, false).len(), 2);
/// ```
pub fn extract_links(html: &str, base_url: &Url, same_domain_only: bool) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    let Ok(a_selector) = Selector::parse("a[href]") else {
        return links;
    };

    for element in document.select(&a_selector) {
        if element.value().attr("download").is_some() {
            continue;
        }

        let Some(resolved) = element
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, base_url))
        else {
            continue;
        };

        if same_domain_only && !same_host(&resolved, base_url) {
            tracing::trace!("Skipping off-host link {}", resolved);
            continue;
        }

        let link = resolved.to_string();
        if seen.insert(link.clone()) {
            links.push(link);
        }
    }

    links
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - empty or fragment-only hrefs
/// - javascript:, mailto:, tel: schemes and data: URIs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let mut absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() != "http" && absolute_url.scheme() != "https" {
        return None;
    }
    absolute_url.host_str()?;

    absolute_url.set_fragment(None);
    Some(absolute_url)
}
