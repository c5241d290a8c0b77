//! HTML sanitization against a fixed allow-list
//!
//! Scripts, styles, comments, inline event handlers and any tag or
//! attribute outside the lists below are removed. Script, style and other
//! non-content elements are dropped with their contents rather than unwrapped.

use ammonia::Builder;
use std::collections::{HashMap, HashSet};

/// Structural and inline tags kept in sanitized output
const ALLOWED_TAGS: &[&str] = &[
    "a", "abbr", "article", "b", "blockquote", "br", "caption", "code", "dd", "del", "div", "dl",
    "dt", "em", "figcaption", "figure", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "i", "img",
    "kbd", "li", "mark", "ol", "p", "pre", "q", "s", "samp", "section", "small", "span", "strong",
    "sub", "sup", "table", "tbody", "td", "tfoot", "th", "thead", "time", "tr", "u", "ul",
];

/// Per-tag attributes kept in sanitized output
const ALLOWED_TAG_ATTRIBUTES: &[(&str, &[&str])] = &[
    ("a", &["href", "title"]),
    ("img", &["src", "alt", "title", "width", "height"]),
    ("td", &["colspan", "rowspan"]),
    ("th", &["colspan", "rowspan", "scope"]),
    ("ol", &["start"]),
    ("time", &["datetime"]),
];

/// Elements removed together with everything inside them
const DISCARDED_TAGS: &[&str] = &[
    "button", "embed", "iframe", "math", "noscript", "object", "script", "select", "style", "svg",
    "template", "textarea", "title",
];

/// URL schemes allowed in `href`/`src`
const ALLOWED_URL_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Sanitizes an HTML fragment
///
/// # Example
///
/// ```
/// use sumi_lens::content::sanitize_html;
///
/// let clean = sanitize_html(r#"<p onclick="steal()">Hi<script>alert(1)</script></p>"#);
/// assert_eq!(clean, "<p>Hi</p>");
/// ```
pub fn sanitize_html(html: &str) -> String {
    let tag_attributes: HashMap<&str, HashSet<&str>> = ALLOWED_TAG_ATTRIBUTES
        .iter()
        .map(|(tag, attrs)| (*tag, attrs.iter().copied().collect()))
        .collect();

    Builder::default()
        .tags(ALLOWED_TAGS.iter().copied().collect())
        .tag_attributes(tag_attributes)
        .generic_attributes(HashSet::from(["title", "lang"]))
        .url_schemes(ALLOWED_URL_SCHEMES.iter().copied().collect())
        .clean_content_tags(DISCARDED_TAGS.iter().copied().collect())
        .link_rel(None)
        .strip_comments(true)
        .clean(html)
        .to_string()
}
