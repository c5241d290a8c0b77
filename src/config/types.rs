use serde::Deserialize;
use std::time::Duration;

/// Default endpoint for the Exa contents API
pub const DEFAULT_EXA_BASE_URL: &str = "https://api.exa.ai";

/// Default endpoint for the Firecrawl scrape API
pub const DEFAULT_FIRECRAWL_BASE_URL: &str = "https://api.firecrawl.dev";

/// Main configuration structure for Sumi-Lens
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetch: FetchConfig,
    #[serde(rename = "rate-limit")]
    pub rate_limit: RateLimitConfig,
    pub providers: ProvidersConfig,
}

/// Outbound HTTP behaviour shared by all adapters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// User agent sent by the local fetcher
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Whole-request timeout in seconds
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Connection establishment timeout in seconds
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Maximum redirect hops followed by the local fetcher
    #[serde(rename = "max-redirects")]
    pub max_redirects: usize,

    /// Largest response body the local fetcher reads, in bytes
    #[serde(rename = "max-body-bytes")]
    pub max_body_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("sumi-lens/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            max_redirects: 10,
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Provider cooldown after a quota rejection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Seconds a rate-limited provider stays unusable
    #[serde(rename = "cooldown-secs")]
    pub cooldown_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { cooldown_secs: 60 }
    }
}

impl RateLimitConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

/// Per-remote-provider settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub exa: RemoteProviderConfig,
    pub firecrawl: RemoteProviderConfig,
}

/// Credentials and endpoint for one hosted backend
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RemoteProviderConfig {
    /// API key; its presence is the only availability signal
    #[serde(rename = "api-key")]
    pub api_key: Option<String>,

    /// Override for the service endpoint
    #[serde(rename = "base-url")]
    pub base_url: Option<String>,
}

impl RemoteProviderConfig {
    /// Returns the API key if one is configured and non-blank
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Returns the configured endpoint or the given default, without a trailing slash
    pub fn base_url_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.base_url
            .as_deref()
            .unwrap_or(default)
            .trim_end_matches('/')
    }
}
