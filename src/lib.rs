//! Sumi-Lens: readable page extraction across interchangeable providers
//!
//! This crate fetches web pages through one of several content-acquisition
//! backends, normalizes them into text/markdown/html with metadata, and can
//! discover linked subpages to a bounded depth and breadth. Backends that get
//! throttled are put on a cooldown and requests fall back to alternates.

pub mod config;
pub mod content;
pub mod crawler;
pub mod extractor;
pub mod model;
pub mod providers;
pub mod routing;
pub mod state;
pub mod telemetry;
pub mod url;

use model::ProviderId;
use thiserror::Error;

/// Main error type for Sumi-Lens operations
#[derive(Debug, Error)]
pub enum LensError {
    #[error("No content provider is currently available")]
    NoProviderAvailable,

    #[error("Provider {provider} is not available and fallback is disabled")]
    ProviderUnavailable { provider: ProviderId },

    #[error("Provider {provider} is rate limited: {message}")]
    RateLimited {
        provider: ProviderId,
        message: String,
        status_code: Option<u16>,
    },

    #[error("Failed to extract readable content from {url}: {message}")]
    ParseFailure { url: String, message: String },

    #[error("Failed to fetch {url}: {message}")]
    FetchFailure {
        url: String,
        message: String,
        status_code: Option<u16>,
    },

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl LensError {
    /// Stable tag used in batch status entries
    pub fn tag(&self) -> &'static str {
        match self {
            Self::NoProviderAvailable => "NO_PROVIDER_AVAILABLE",
            Self::ProviderUnavailable { .. } => "PROVIDER_UNAVAILABLE",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::ParseFailure { .. } => "PARSE_FAILURE",
            Self::FetchFailure { .. } | Self::Http(_) => "FETCH_FAILURE",
            Self::InvalidUrl { .. } => "INVALID_URL",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }

    /// HTTP status code associated with the failure, when one is known
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::RateLimited { status_code, .. } | Self::FetchFailure { status_code, .. } => {
                *status_code
            }
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether this failure is a capacity/quota rejection from a provider
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Whether retrying later (or elsewhere) may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::NoProviderAvailable => true,
            Self::FetchFailure { status_code, .. } => {
                status_code.map_or(true, |code| code >= 500 || code == 408)
            }
            _ => false,
        }
    }

    pub(crate) fn fetch(url: &str, message: impl Into<String>, status_code: Option<u16>) -> Self {
        Self::FetchFailure {
            url: url.to_string(),
            message: message.into(),
            status_code,
        }
    }

    pub(crate) fn rate_limited(
        provider: ProviderId,
        message: impl Into<String>,
        status_code: Option<u16>,
    ) -> Self {
        Self::RateLimited {
            provider,
            message: message.into(),
            status_code,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Sumi-Lens operations
pub type Result<T> = std::result::Result<T, LensError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use extractor::Extractor;
pub use model::{BatchResult, PageMetadata, PageResult, RequestOptions, UrlStatus};
pub use providers::Provider;
pub use state::{ProviderState, ProviderStateTracker};
