use crate::config::types::{Config, FetchConfig, RateLimitConfig, RemoteProviderConfig};
use crate::{ConfigError, ConfigResult};
use url::Url;

/// Upper bound on redirect hops the local fetcher may follow
const MAX_REDIRECT_LIMIT: usize = 20;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_fetch_config(&config.fetch)?;
    validate_rate_limit_config(&config.rate_limit)?;
    validate_remote_provider("exa", &config.providers.exa)?;
    validate_remote_provider("firecrawl", &config.providers.firecrawl)?;
    Ok(())
}

/// Validates outbound HTTP configuration
fn validate_fetch_config(config: &FetchConfig) -> ConfigResult<()> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs must be greater than 0".to_string(),
        ));
    }

    if config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "connect-timeout-secs must be greater than 0".to_string(),
        ));
    }

    if config.max_redirects > MAX_REDIRECT_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max-redirects must be at most {}, got {}",
            MAX_REDIRECT_LIMIT, config.max_redirects
        )));
    }

    if config.max_body_bytes == 0 {
        return Err(ConfigError::Validation(
            "max-body-bytes must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates rate-limit configuration
fn validate_rate_limit_config(config: &RateLimitConfig) -> ConfigResult<()> {
    if config.cooldown_secs == 0 {
        return Err(ConfigError::Validation(
            "cooldown-secs must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

/// Validates a hosted provider section
fn validate_remote_provider(name: &str, config: &RemoteProviderConfig) -> ConfigResult<()> {
    if let Some(key) = &config.api_key {
        if key.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "providers.{}.api-key cannot be blank (omit it instead)",
                name
            )));
        }
    }

    if let Some(base_url) = &config.base_url {
        let url = Url::parse(base_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("providers.{}.base-url '{}': {}", name, base_url, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "providers.{}.base-url must use http or https, got '{}'",
                name,
                url.scheme()
            )));
        }
    }

    Ok(())
}
