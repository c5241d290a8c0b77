//! Configuration module for Sumi-Lens
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; a missing file section falls back to defaults.
//!
//! # Example
//!
//! ```no_run
//! use sumi_lens::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("lens.toml")).unwrap();
//! println!("Rate-limit cooldown: {}s", config.rate_limit.cooldown_secs);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, FetchConfig, ProvidersConfig, RateLimitConfig, RemoteProviderConfig,
    DEFAULT_EXA_BASE_URL, DEFAULT_FIRECRAWL_BASE_URL,
};

// Re-export parser functions
pub use parser::{load_config, parse_config};
pub use validation::validate;
