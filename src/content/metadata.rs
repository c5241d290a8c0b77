//! Metadata extraction from `<meta>`, `<link>` and document tags
//!
//! Each recognized field has a fixed fallback order; the first non-empty
//! candidate wins.

use crate::model::PageMetadata;
use scraper::{Html, Selector};
use serde_json::Value;
use url::Url;

const TITLE_SOURCES: &[Source] = &[
    Source::Text("title"),
    Source::Attr("meta[property='og:title']", "content"),
    Source::Attr("meta[name='twitter:title']", "content"),
];

const DESCRIPTION_SOURCES: &[Source] = &[
    Source::Attr("meta[name='description']", "content"),
    Source::Attr("meta[property='og:description']", "content"),
    Source::Attr("meta[name='twitter:description']", "content"),
];

const LANGUAGE_SOURCES: &[Source] = &[
    Source::Attr("html[lang]", "lang"),
    Source::Attr("meta[http-equiv='content-language']", "content"),
    Source::Attr("meta[property='og:locale']", "content"),
];

const AUTHOR_SOURCES: &[Source] = &[
    Source::Attr("meta[name='author']", "content"),
    Source::Attr("meta[property='article:author']", "content"),
    Source::Attr("meta[name='twitter:creator']", "content"),
];

const PUBLISHED_SOURCES: &[Source] = &[
    Source::Attr("meta[property='article:published_time']", "content"),
    Source::Attr("meta[name='date']", "content"),
    Source::Attr("meta[name='pubdate']", "content"),
    Source::Attr("meta[itemprop='datePublished']", "content"),
    Source::Attr("time[datetime]", "datetime"),
];

const IMAGE_SOURCES: &[Source] = &[
    Source::Attr("meta[property='og:image']", "content"),
    Source::Attr("meta[name='twitter:image']", "content"),
];

const FAVICON_SOURCES: &[Source] = &[
    Source::Attr("link[rel~='icon']", "href"),
    Source::Attr("link[rel='apple-touch-icon']", "href"),
];

/// Where a metadata value may be found
#[derive(Debug, Clone, Copy)]
enum Source {
    /// Text content of the first matching element
    Text(&'static str),
    /// Attribute of the first matching element
    Attr(&'static str, &'static str),
}

/// Extracts page metadata from a full HTML document
///
/// Image and favicon URLs are resolved against `base_url`. The site name
/// and canonical URL, when present, land in the passthrough map.
pub fn extract_metadata(html: &str, base_url: &Url) -> PageMetadata {
    let document = Html::parse_document(html);
    extract_from_document(&document, base_url)
}

pub(crate) fn extract_from_document(document: &Html, base_url: &Url) -> PageMetadata {
    let mut metadata = PageMetadata {
        title: first_match(document, TITLE_SOURCES),
        description: first_match(document, DESCRIPTION_SOURCES),
        language: first_match(document, LANGUAGE_SOURCES),
        author: first_match(document, AUTHOR_SOURCES),
        published_date: first_match(document, PUBLISHED_SOURCES),
        image: first_match(document, IMAGE_SOURCES).and_then(|src| resolve(base_url, &src)),
        favicon: first_match(document, FAVICON_SOURCES).and_then(|src| resolve(base_url, &src)),
        ..Default::default()
    };

    if let Some(site_name) = first_match(
        document,
        &[Source::Attr("meta[property='og:site_name']", "content")],
    ) {
        metadata
            .extra
            .insert("siteName".to_string(), Value::String(site_name));
    }

    if let Some(canonical) = first_match(
        document,
        &[Source::Attr("link[rel='canonical']", "href")],
    )
    .and_then(|href| resolve(base_url, &href))
    {
        metadata
            .extra
            .insert("canonicalUrl".to_string(), Value::String(canonical));
    }

    metadata
}

/// Returns the first non-empty value among the given sources
fn first_match(document: &Html, sources: &[Source]) -> Option<String> {
    sources.iter().find_map(|source| lookup(document, *source))
}

fn lookup(document: &Html, source: Source) -> Option<String> {
    let (css, attr) = match source {
        Source::Text(css) => (css, None),
        Source::Attr(css, attr) => (css, Some(attr)),
    };

    let selector = Selector::parse(css).ok()?;

    document.select(&selector).find_map(|element| {
        let value = match attr {
            Some(attr) => element.value().attr(attr)?.to_string(),
            None => element.text().collect::<String>(),
        };
        let value = value.split_whitespace().collect::<Vec<_>>().join(" ");
        (!value.is_empty()).then_some(value)
    })
}

fn resolve(base_url: &Url, href: &str) -> Option<String> {
    base_url.join(href.trim()).ok().map(|u| u.to_string())
}
