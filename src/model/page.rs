use super::ProviderId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Metadata pulled from a page
///
/// Recognized keys are typed; anything a provider returns beyond them is
/// kept in `extra` and flattened into the serialized mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    /// Provider-specific passthrough fields
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl PageMetadata {
    /// Fills every unset recognized field from `other`
    pub fn merge_missing(&mut self, other: PageMetadata) {
        fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
            if slot.is_none() {
                *slot = value;
            }
        }

        fill(&mut self.title, other.title);
        fill(&mut self.description, other.description);
        fill(&mut self.language, other.language);
        fill(&mut self.author, other.author);
        fill(&mut self.published_date, other.published_date);
        fill(&mut self.image, other.image);
        fill(&mut self.favicon, other.favicon);
        fill(&mut self.status_code, other.status_code);
        for (key, value) in other.extra {
            self.extra.entry(key).or_insert(value);
        }
    }
}

/// A single normalized page, optionally carrying crawled subpages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    pub url: String,

    pub text: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,

    #[serde(default)]
    pub metadata: PageMetadata,

    /// Backend that produced this page
    pub provider: ProviderId,

    /// Crawl depth below the root (root = 0); only set on crawl results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,

    /// Successfully fetched children, in candidate order; never empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subpages: Option<Vec<PageResult>>,
}

impl PageResult {
    /// Number of pages in this tree, including the root
    pub fn page_count(&self) -> usize {
        1 + self
            .subpages
            .iter()
            .flatten()
            .map(PageResult::page_count)
            .sum::<usize>()
    }

    /// Attaches children, leaving `subpages` unset when there are none
    pub fn set_subpages(&mut self, children: Vec<PageResult>) {
        self.subpages = if children.is_empty() {
            None
        } else {
            Some(children)
        };
    }
}

/// Outcome of one input URL in a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    Success,
    Error,
}

/// Error detail attached to a failed status entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusError {
    pub tag: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status_code: Option<u16>,
}

/// Per-URL status, aligned by position with the batch input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlStatus {
    pub id: String,

    pub status: FetchStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StatusError>,
}

impl UrlStatus {
    pub fn success(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: FetchStatus::Success,
            error: None,
        }
    }

    pub fn error(id: impl Into<String>, tag: impl Into<String>, http_status_code: Option<u16>) -> Self {
        Self {
            id: id.into(),
            status: FetchStatus::Error,
            error: Some(StatusError {
                tag: tag.into(),
                http_status_code,
            }),
        }
    }

    /// Builds an error entry from a crate error
    pub fn from_error(id: impl Into<String>, error: &crate::LensError) -> Self {
        Self::error(id, error.tag(), error.status_code())
    }

    pub fn is_success(&self) -> bool {
        self.status == FetchStatus::Success
    }
}

/// Results of a multi-URL operation
///
/// `results` holds successes only; `statuses` matches the input URL list
/// one-to-one by position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub results: Vec<PageResult>,
    pub statuses: Vec<UrlStatus>,
}

impl BatchResult {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty() && self.statuses.is_empty()
    }

    /// Number of input URLs that failed
    pub fn error_count(&self) -> usize {
        self.statuses.iter().filter(|s| !s.is_success()).count()
    }
}
