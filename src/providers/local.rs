use super::{fetch_each, Fetched, Provider};
use crate::config::FetchConfig;
use crate::content::{normalize, normalize_text};
use crate::crawler::{build_http_client, fetch_url, FetchResult};
use crate::model::{BatchResult, PageResult, ProviderId, RequestOptions};
use crate::LensError;
use async_trait::async_trait;
use reqwest::Client;

/// Fetches pages directly and normalizes them in-process
///
/// Needs no credentials, so it is always available.
#[derive(Debug, Clone)]
pub struct LocalProvider {
    client: Client,
    max_body_bytes: usize,
}

impl LocalProvider {
    /// Creates a provider with a client built from the fetch configuration
    pub fn new(config: &FetchConfig) -> crate::Result<Self> {
        Ok(Self {
            client: build_http_client(config)?,
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// Creates a provider around an existing client with the default body limit
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            max_body_bytes: FetchConfig::default().max_body_bytes,
        }
    }
}

#[async_trait]
impl Provider for LocalProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Local
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn fetch_one(&self, url: &str, options: &RequestOptions) -> crate::Result<PageResult> {
        self.fetch_document(url, options).await.map(|fetched| fetched.page)
    }

    async fn fetch_many(&self, urls: &[String], options: &RequestOptions) -> crate::Result<BatchResult> {
        fetch_each(self, urls, options).await
    }

    async fn fetch_document(&self, url: &str, options: &RequestOptions) -> crate::Result<Fetched> {
        tracing::debug!("Fetching {}", url);

        let result = fetch_url(&self.client, url, self.max_body_bytes).await;
        if result.is_rate_limited() {
            return Err(LensError::rate_limited(
                ProviderId::Local,
                format!("{} answered 429 Too Many Requests", url),
                Some(429),
            ));
        }

        let plain_text = result.is_plain_text();
        match result {
            FetchResult::Success {
                final_url,
                status_code,
                body,
                ..
            } => {
                // A text/plain body is never parsed as markup, whatever it contains
                let mut content = if plain_text {
                    normalize_text(&body, options)
                } else {
                    normalize(&body, &final_url, options)?
                };
                content.metadata.status_code = Some(status_code);

                let final_url = (final_url != url).then_some(final_url);
                Ok(Fetched {
                    page: content.into_page(url, ProviderId::Local),
                    raw_html: (!plain_text).then_some(body),
                    final_url,
                })
            }
            FetchResult::TooLarge { limit } => Err(LensError::fetch(
                url,
                format!("response body exceeds {} bytes", limit),
                None,
            )),
            FetchResult::ContentMismatch { content_type } => Err(LensError::fetch(
                url,
                format!("unsupported content type '{}'", content_type),
                None,
            )),
            FetchResult::HttpError { status_code } => Err(LensError::fetch(
                url,
                format!("HTTP {}", status_code),
                Some(status_code),
            )),
            FetchResult::NetworkError { error } => Err(LensError::fetch(url, error, None)),
        }
    }
}
