//! Exa contents API adapter
//!
//! One `POST /contents` call serves a whole batch. Subpage discovery runs
//! server-side and comes back as a flat list per root, which maps onto
//! depth-1 children.

use super::{error_body, transport_error, Provider};
use crate::config::{FetchConfig, RemoteProviderConfig, DEFAULT_EXA_BASE_URL};
use crate::content::normalize_text;
use crate::crawler::build_http_client;
use crate::model::{
    BatchResult, PageMetadata, PageResult, ProviderId, RequestOptions, SubpageTarget, UrlStatus,
};
use crate::url::{same_host, visit_key};
use crate::LensError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentsRequest<'a> {
    urls: &'a [String],
    text: TextOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    livecrawl: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subpages: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subpage_target: Option<&'a SubpageTarget>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TextOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_characters: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContentsResponse {
    results: Vec<ExaResult>,
    statuses: Vec<ExaStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExaResult {
    #[serde(default)]
    id: Option<String>,
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    published_date: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    favicon: Option<String>,
    #[serde(default)]
    subpages: Vec<ExaResult>,
}

impl ExaResult {
    fn matches(&self, url: &str) -> bool {
        let key = visit_key(url);
        self.id.as_deref() == Some(url)
            || self.url == url
            || visit_key(&self.url) == key
            || self.id.as_deref().map(visit_key).as_deref() == Some(key.as_str())
    }

    fn into_page(self, requested_url: &str, options: &RequestOptions) -> PageResult {
        let content = normalize_text(self.text.as_deref().unwrap_or_default(), options);
        let metadata = PageMetadata {
            title: self.title.filter(|t| !t.trim().is_empty()),
            author: self.author.filter(|a| !a.trim().is_empty()),
            published_date: self.published_date,
            image: self.image,
            favicon: self.favicon,
            ..Default::default()
        };

        PageResult {
            url: requested_url.to_string(),
            text: content.text,
            markdown: content.markdown,
            html: None,
            metadata,
            provider: ProviderId::Exa,
            depth: None,
            subpages: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExaStatus {
    id: String,
    status: String,
    #[serde(default)]
    error: Option<ExaStatusError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExaStatusError {
    #[serde(default)]
    tag: Option<String>,
    #[serde(default)]
    http_status_code: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Checks whether an Exa failure is a quota or throttling rejection
///
/// Exa answers 429 for throttling and otherwise says so in the message.
///
/// # Examples
///
/// ```
/// use sumi_lens::providers::is_exa_rate_limit;
///
/// assert!(is_exa_rate_limit(Some(429), ""));
/// assert!(is_exa_rate_limit(Some(400), "Rate limit exceeded for this key"));
/// assert!(!is_exa_rate_limit(Some(401), "Invalid API key"));
/// ```
pub fn is_exa_rate_limit(status_code: Option<u16>, message: &str) -> bool {
    if status_code == Some(StatusCode::TOO_MANY_REQUESTS.as_u16()) {
        return true;
    }
    let message = message.to_ascii_lowercase();
    message.contains("rate limit") || message.contains("too many requests")
}

/// Adapter for the Exa contents API
#[derive(Debug, Clone)]
pub struct ExaProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl ExaProvider {
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
            config.base_url_or(DEFAULT_EXA_BASE_URL),
        ))
    }

    async fn contents(&self, urls: &[String], options: &RequestOptions, with_subpages: bool) -> crate::Result<ContentsResponse> {
        let endpoint = format!("{}/contents", self.base_url);
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(LensError::ProviderUnavailable {
                provider: ProviderId::Exa,
            });
        };

        let request = ContentsRequest {
            urls,
            text: TextOptions {
                max_characters: options.max_chars,
            },
            livecrawl: options.live_crawl.map(|mode| mode.as_str()),
            subpages: with_subpages.then_some(options.max_subpages),
            subpage_target: if with_subpages {
                options.subpage_target.as_ref()
            } else {
                None
            },
        };

        tracing::debug!("Exa contents request for {} url(s)", urls.len());
        let response = self
            .client
            .post(&endpoint)
            .header("x-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(&endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error.or(b.message))
                .unwrap_or(body);

            if is_exa_rate_limit(Some(status.as_u16()), &message) {
                return Err(LensError::rate_limited(ProviderId::Exa, message, Some(status.as_u16())));
            }
            return Err(LensError::fetch(
                &endpoint,
                format!("Exa returned HTTP {}: {}", status.as_u16(), message),
                Some(status.as_u16()),
            ));
        }

        response.json::<ContentsResponse>().await.map_err(|e| LensError::ParseFailure {
            url: endpoint,
            message: format!("unexpected Exa response: {}", e),
        })
    }

    /// Lines the response up with the requested URLs
    fn into_batch(&self, urls: &[String], response: ContentsResponse, options: &RequestOptions, with_subpages: bool) -> BatchResult {
        let ContentsResponse {
            mut results,
            statuses,
        } = response;
        let mut batch = BatchResult::default();

        for url in urls {
            let status = statuses.iter().find(|s| s.id == *url);
            let failure = status.filter(|s| s.status != "success").map(|s| status_error(url, s));

            if let Some(error) = failure {
                batch.statuses.push(UrlStatus::from_error(url.as_str(), &error));
                continue;
            }

            match results.iter().position(|r| r.matches(url)) {
                Some(index) => {
                    let result = results.remove(index);
                    batch.statuses.push(UrlStatus::success(url.as_str()));
                    batch.results.push(to_page(result, url, options, with_subpages));
                }
                None => {
                    let error = LensError::fetch(url, "Exa returned no content", None);
                    batch.statuses.push(UrlStatus::from_error(url.as_str(), &error));
                }
            }
        }

        batch
    }

    async fn fetch_tree(&self, url: &str, options: &RequestOptions, with_subpages: bool) -> crate::Result<PageResult> {
        let urls = [url.to_string()];
        let response = self.contents(&urls, options, with_subpages).await?;

        if let Some(status) = response
            .statuses
            .iter()
            .find(|s| s.id == url && s.status != "success")
        {
            return Err(status_error(url, status));
        }

        response
            .results
            .into_iter()
            .find(|r| r.matches(url))
            .map(|result| to_page(result, url, options, with_subpages))
            .ok_or_else(|| LensError::fetch(url, "Exa returned no content", None))
    }
}

fn to_page(result: ExaResult, url: &str, options: &RequestOptions, with_subpages: bool) -> PageResult {
    let children: Vec<ExaResult> = if with_subpages && options.max_depth >= 1 {
        let root = Url::parse(url).ok();
        result
            .subpages
            .into_iter()
            .filter(|child| !options.same_domain_only || on_root_host(&child.url, root.as_ref()))
            .take(options.max_subpages)
            .collect()
    } else {
        Vec::new()
    };
    let mut page = ExaResult {
        subpages: Vec::new(),
        ..result
    }
    .into_page(url, options);

    if with_subpages {
        page.depth = Some(0);
        page.set_subpages(
            children
                .into_iter()
                .map(|child| {
                    let child_url = child.url.clone();
                    let mut child_page = child.into_page(&child_url, options);
                    child_page.depth = Some(1);
                    child_page
                })
                .collect(),
        );
    }

    page
}

/// Exa discovers subpages anywhere; unparseable URLs never pass
fn on_root_host(child_url: &str, root: Option<&Url>) -> bool {
    match (Url::parse(child_url), root) {
        (Ok(child), Some(root)) => same_host(&child, root),
        _ => false,
    }
}

fn status_error(url: &str, status: &ExaStatus) -> LensError {
    let code = status.error.as_ref().and_then(|e| e.http_status_code);
    let tag = status
        .error
        .as_ref()
        .and_then(|e| e.tag.as_deref())
        .unwrap_or("UNKNOWN");

    if is_exa_rate_limit(code, tag) {
        LensError::rate_limited(ProviderId::Exa, format!("{}: {}", url, tag), code)
    } else {
        LensError::fetch(url, format!("Exa status {}", tag), code)
    }
}

#[async_trait]
impl Provider for ExaProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Exa
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn supports_subpages(&self) -> bool {
        true
    }

    async fn fetch_one(&self, url: &str, options: &RequestOptions) -> crate::Result<PageResult> {
        self.fetch_tree(url, options, false).await
    }

    async fn fetch_many(&self, urls: &[String], options: &RequestOptions) -> crate::Result<BatchResult> {
        let response = self.contents(urls, options, false).await?;
        Ok(self.into_batch(urls, response, options, false))
    }

    async fn crawl_one(&self, url: &str, options: &RequestOptions) -> crate::Result<PageResult> {
        self.fetch_tree(url, options, options.wants_subpages()).await.map(|mut page| {
            page.depth = Some(0);
            page
        })
    }

    async fn crawl_many(&self, urls: &[String], options: &RequestOptions) -> crate::Result<BatchResult> {
        let with_subpages = options.wants_subpages();
        let response = self.contents(urls, options, with_subpages).await?;
        let mut batch = self.into_batch(urls, response, options, with_subpages);
        for page in &mut batch.results {
            page.depth = Some(0);
        }
        Ok(batch)
    }
}
