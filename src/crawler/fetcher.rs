//! HTTP fetcher used by the local provider
//!
//! This module handles all outbound page requests, including:
//! - Building HTTP clients from the fetch configuration
//! - GET requests with redirect following
//! - Content-Type filtering
//! - Response body size limits
//! - Error classification

use crate::config::FetchConfig;
use reqwest::{redirect::Policy, Client, StatusCode};

/// Content types the normalizer can work with
const ACCEPTED_CONTENT_TYPES: &[&str] = &["text/html", "application/xhtml+xml", "text/plain"];

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Content-Type header value (empty when missing)
        content_type: String,
        /// Page body content
        body: String,
    },

    /// Body is larger than the configured limit
    TooLarge {
        /// The limit in bytes
        limit: usize,
    },

    /// Page is not a text document (Content-Type mismatch)
    ContentMismatch {
        /// The actual Content-Type received
        content_type: String,
    },

    /// Server answered with a non-success status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (connection refused, timeout, redirect loop, etc.)
    NetworkError {
        /// Error description
        error: String,
    },
}

impl FetchResult {
    /// Whether a successful fetch returned plain text rather than markup
    pub fn is_plain_text(&self) -> bool {
        matches!(self, Self::Success { content_type, .. } if mime_type(content_type) == "text/plain")
    }

    /// Whether the server signalled throttling
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            Self::HttpError { status_code } if *status_code == StatusCode::TOO_MANY_REQUESTS.as_u16()
        )
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The fetch configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use sumi_lens::config::FetchConfig;
/// use sumi_lens::crawler::build_http_client;
///
/// let client = build_http_client(&FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.timeout())
        .connect_timeout(config.connect_timeout())
        .redirect(Policy::limited(config.max_redirects))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL and classifies the outcome
///
/// # Response Handling
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx with HTML/XHTML/plain text (or no Content-Type) | Success |
/// | 2xx with any other Content-Type | ContentMismatch |
/// | Body larger than `max_body_bytes` | TooLarge |
/// | Non-2xx after redirects | HttpError |
/// | Timeout, connection failure, too many redirects | NetworkError |
///
/// No retries happen here; a failed fetch is reported once.
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
/// * `max_body_bytes` - Largest body read before giving up
pub async fn fetch_url(client: &Client, url: &str, max_body_bytes: usize) -> FetchResult {
    let mut response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => return classify_network_error(&e),
    };

    let status = response.status();
    let final_url = response.url().to_string();

    if !status.is_success() {
        return FetchResult::HttpError {
            status_code: status.as_u16(),
        };
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !is_accepted_content_type(&content_type) {
        return FetchResult::ContentMismatch { content_type };
    }

    let limit = max_body_bytes;
    if response
        .content_length()
        .map_or(false, |length| length > limit as u64)
    {
        return FetchResult::TooLarge { limit };
    }

    // Content-Length can be absent or wrong, so the stream is bounded too
    let mut bytes = Vec::new();
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                if bytes.len() + chunk.len() > limit {
                    return FetchResult::TooLarge { limit };
                }
                bytes.extend_from_slice(&chunk);
            }
            Ok(None) => break,
            Err(e) => return classify_network_error(&e),
        }
    }

    FetchResult::Success {
        final_url,
        status_code: status.as_u16(),
        content_type,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    }
}

fn classify_network_error(e: &reqwest::Error) -> FetchResult {
    let error = if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        "Connection refused".to_string()
    } else if e.is_redirect() {
        "Too many redirects".to_string()
    } else {
        e.to_string()
    };

    FetchResult::NetworkError { error }
}

/// Lowercased media type without parameters
fn mime_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Missing Content-Type is accepted and left to content sniffing
fn is_accepted_content_type(content_type: &str) -> bool {
    let mime = mime_type(content_type);
    mime.is_empty() || ACCEPTED_CONTENT_TYPES.contains(&mime.as_str())
}
