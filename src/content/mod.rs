//! Content normalization
//!
//! Converts raw HTML (or provider-native text) into the uniform
//! `{text, markdown?, html?, metadata}` shape. The HTML pipeline is
//! extract → sanitize → convert → truncate, always in that order.

mod metadata;
mod normalizer;
mod sanitize;
mod text;
mod truncate;

pub use metadata::extract_metadata;
pub use normalizer::{
    html_to_markdown, looks_like_html, normalize, normalize_html, normalize_text,
    NormalizedContent,
};
pub use sanitize::sanitize_html;
pub use text::{collapse_whitespace, html_to_text};
pub use truncate::{truncate_chars, truncate_opt};
