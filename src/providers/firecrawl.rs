//! Firecrawl scrape API adapter
//!
//! Scrapes are served from Firecrawl's cache when younger than `maxAge`.
//! This is the only backend that returns the rendered page HTML, so it is
//! preferred whenever sanitized HTML output is requested.

use super::{error_body, fetch_each, transport_error, Fetched, Provider};
use crate::config::{FetchConfig, RemoteProviderConfig, DEFAULT_FIRECRAWL_BASE_URL};
use crate::content::{html_to_text, normalize_text, sanitize_html, truncate_opt};
use crate::crawler::build_http_client;
use crate::model::{BatchResult, PageMetadata, PageResult, ProviderId, RequestOptions};
use crate::LensError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: Vec<&'static str>,
    only_main_content: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_age: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<ScrapeData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ScrapeData {
    markdown: Option<String>,
    html: Option<String>,
    raw_html: Option<String>,
    metadata: ScrapeMetadata,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ScrapeMetadata {
    title: Option<String>,
    description: Option<String>,
    language: Option<String>,
    status_code: Option<u16>,
    #[serde(rename = "sourceURL")]
    source_url: Option<String>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

impl ScrapeMetadata {
    fn into_metadata(self) -> PageMetadata {
        let mut extra = self.extra;
        let image = take_string(&mut extra, "ogImage");
        let favicon = take_string(&mut extra, "favicon");
        let author = take_string(&mut extra, "author");
        let published_date = take_string(&mut extra, "publishedTime")
            .or_else(|| take_string(&mut extra, "articlePublishedTime"));
        if let Some(source_url) = self.source_url {
            extra.insert("sourceURL".to_string(), Value::String(source_url));
        }

        PageMetadata {
            title: self.title.filter(|t| !t.trim().is_empty()),
            description: self.description,
            language: self.language,
            author,
            published_date,
            image,
            favicon,
            status_code: self.status_code,
            extra,
        }
    }
}

fn take_string(map: &mut BTreeMap<String, Value>, key: &str) -> Option<String> {
    match map.remove(key) {
        Some(Value::String(s)) => Some(s),
        Some(other) => {
            map.insert(key.to_string(), other);
            None
        }
        None => None,
    }
}

/// Checks whether a Firecrawl failure is a quota or throttling rejection
///
/// Firecrawl answers 429 when throttled and 402 when the credit quota is
/// spent; both make the provider unusable for a while.
///
/// # Examples
///
/// ```
/// use sumi_lens::providers::is_firecrawl_rate_limit;
///
/// assert!(is_firecrawl_rate_limit(Some(402), "Insufficient credits"));
/// assert!(is_firecrawl_rate_limit(Some(500), "Rate limit exceeded"));
/// assert!(!is_firecrawl_rate_limit(Some(404), "Not found"));
/// ```
pub fn is_firecrawl_rate_limit(status_code: Option<u16>, message: &str) -> bool {
    if matches!(
        status_code.and_then(|code| StatusCode::from_u16(code).ok()),
        Some(StatusCode::TOO_MANY_REQUESTS | StatusCode::PAYMENT_REQUIRED)
    ) {
        return true;
    }
    message.to_ascii_lowercase().contains("rate limit")
}

/// Adapter for the Firecrawl scrape API
#[derive(Debug, Clone)]
pub struct FirecrawlProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl FirecrawlProvider {
    pub fn new(client: Client, api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &RemoteProviderConfig, fetch: &FetchConfig) -> crate::Result<Self> {
        Ok(Self::new(
            build_http_client(fetch)?,
            config.api_key().map(str::to_string),
            config.base_url_or(DEFAULT_FIRECRAWL_BASE_URL),
        ))
    }

    async fn scrape(&self, url: &str, options: &RequestOptions, raw_html: bool) -> crate::Result<ScrapeData> {
        let endpoint = format!("{}/v1/scrape", self.base_url);
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(LensError::ProviderUnavailable {
                provider: ProviderId::Firecrawl,
            });
        };

        let request = ScrapeRequest {
            url,
            formats: formats(raw_html),
            only_main_content: true,
            max_age: options.max_age,
        };

        tracing::debug!("Firecrawl scrape for {}", url);
        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            let message = serde_json::from_str::<ScrapeResponse>(&body)
                .ok()
                .and_then(|r| r.error)
                .unwrap_or(body);

            if is_firecrawl_rate_limit(Some(status.as_u16()), &message) {
                return Err(LensError::rate_limited(
                    ProviderId::Firecrawl,
                    message,
                    Some(status.as_u16()),
                ));
            }
            return Err(LensError::fetch(
                url,
                format!("Firecrawl returned HTTP {}: {}", status.as_u16(), message),
                Some(status.as_u16()),
            ));
        }

        let body: ScrapeResponse = response.json().await.map_err(|e| LensError::ParseFailure {
            url: url.to_string(),
            message: format!("unexpected Firecrawl response: {}", e),
        })?;

        match body.data {
            Some(data) if body.success => {
                match data.metadata.status_code {
                    Some(code) if code >= 400 => Err(LensError::fetch(
                        url,
                        format!("target answered HTTP {}", code),
                        Some(code),
                    )),
                    _ => Ok(data),
                }
            }
            _ => {
                let message = body.error.unwrap_or_else(|| "scrape unsuccessful".to_string());
                if is_firecrawl_rate_limit(None, &message) {
                    Err(LensError::rate_limited(ProviderId::Firecrawl, message, None))
                } else {
                    Err(LensError::fetch(url, message, None))
                }
            }
        }
    }
}

/// Markdown and cleaned HTML are always requested; text is derived from the HTML
fn formats(raw_html: bool) -> Vec<&'static str> {
    let mut formats = vec!["markdown", "html"];
    if raw_html {
        formats.push("rawHtml");
    }
    formats
}

fn to_page(data: ScrapeData, url: &str, options: &RequestOptions) -> (PageResult, Option<String>) {
    let markdown = data.markdown.unwrap_or_default();
    let content = normalize_text(&markdown, options);
    let clean_html = data.html.as_deref().map(sanitize_html);

    // Markdown syntax only leaks into text when no HTML came back
    let text = clean_html
        .as_deref()
        .map(html_to_text)
        .filter(|text| !text.is_empty())
        .map(|text| truncate_opt(text, options.max_chars))
        .unwrap_or(content.text);

    let page = PageResult {
        url: url.to_string(),
        text,
        markdown: content.markdown,
        html: clean_html.filter(|_| options.html),
        metadata: data.metadata.into_metadata(),
        provider: ProviderId::Firecrawl,
        depth: None,
        subpages: None,
    };
    (page, data.raw_html)
}

#[async_trait]
impl Provider for FirecrawlProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Firecrawl
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch_one(&self, url: &str, options: &RequestOptions) -> crate::Result<PageResult> {
        let data = self.scrape(url, options, false).await?;
        Ok(to_page(data, url, options).0)
    }

    async fn fetch_many(&self, urls: &[String], options: &RequestOptions) -> crate::Result<BatchResult> {
        fetch_each(self, urls, options).await
    }

    async fn fetch_document(&self, url: &str, options: &RequestOptions) -> crate::Result<Fetched> {
        let data = self.scrape(url, options, true).await?;
        let final_url = data
            .metadata
            .source_url
            .clone()
            .filter(|source| source != url);
        let (page, raw_html) = to_page(data, url, options);

        Ok(Fetched {
            page,
            raw_html,
            final_url,
        })
    }
}
