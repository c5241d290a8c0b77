//! Crawler module for subpage discovery and page fetching
//!
//! This module contains the crawling logic, including:
//! - HTTP fetching for the local provider
//! - HTML link extraction
//! - The recursive, concurrency-bounded crawl engine

mod engine;
mod fetcher;
mod parser;

pub use engine::CrawlEngine;
pub use fetcher::{build_http_client, fetch_url, FetchResult};
pub use parser::extract_links;
