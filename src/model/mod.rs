//! Data model shared by every component
//!
//! - `ProviderId`: the closed set of backend identities
//! - `RequestOptions`: caller-supplied knobs for fetches and crawls
//! - `PageResult` / `BatchResult`: the uniform result shapes

mod options;
mod page;
mod provider;

pub use options::{LiveCrawl, RequestOptions, SubpageTarget};
pub use page::{BatchResult, FetchStatus, PageMetadata, PageResult, StatusError, UrlStatus};
pub use provider::ProviderId;
