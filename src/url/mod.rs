//! URL handling module for Sumi-Lens
//!
//! This module provides request URL validation, host extraction, and the
//! normalization used to key the crawl visited-set.

mod domain;
mod normalize;

use crate::{UrlError, UrlResult};
use url::Url;

// Re-export main functions
pub use domain::{extract_domain, same_host};
pub use normalize::{normalize_url, visit_key};

/// Parses a caller-supplied URL and checks it can be fetched
///
/// Only absolute `http` and `https` URLs with a host are accepted.
///
/// # Examples
///
/// ```
/// use sumi_lens::url::parse_http_url;
///
/// assert!(parse_http_url("https://example.com/docs").is_ok());
/// assert!(parse_http_url("mailto:someone@example.com").is_err());
/// assert!(parse_http_url("/relative/path").is_err());
/// ```
pub fn parse_http_url(url_str: &str) -> UrlResult<Url> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}

/// Same as [`parse_http_url`] but reports failures as a crate error
pub fn validate_request_url(url_str: &str) -> crate::Result<Url> {
    parse_http_url(url_str).map_err(|e| crate::LensError::InvalidUrl {
        url: url_str.to_string(),
        reason: e.to_string(),
    })
}
