use crate::content::metadata::extract_from_document;
use crate::content::sanitize::sanitize_html;
use crate::content::text::{collapse_whitespace, html_to_text};
use crate::content::truncate::truncate_opt;
use crate::model::{PageMetadata, PageResult, ProviderId, RequestOptions};
use crate::LensError;
use scraper::Html;
use std::io::Cursor;
use url::Url;

/// Output of the normalization pipeline for one page
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedContent {
    pub text: String,
    pub markdown: Option<String>,
    pub html: Option<String>,
    pub metadata: PageMetadata,
}

impl NormalizedContent {
    /// Wraps the content into a page result for `url`
    pub fn into_page(self, url: impl Into<String>, provider: ProviderId) -> PageResult {
        PageResult {
            url: url.into(),
            text: self.text,
            markdown: self.markdown,
            html: self.html,
            metadata: self.metadata,
            provider,
            depth: None,
            subpages: None,
        }
    }
}

/// Returns true when the content contains tag delimiters
pub fn looks_like_html(content: &str) -> bool {
    let bytes = content.as_bytes();
    bytes.iter().enumerate().any(|(i, &b)| {
        b == b'<'
            && bytes
                .get(i + 1)
                .map_or(false, |next| next.is_ascii_alphabetic() || *next == b'/' || *next == b'!')
            && bytes[i + 1..].contains(&b'>')
    })
}

/// Normalizes raw page content into text, markdown, html and metadata
///
/// HTML input runs the full pipeline, always in this order:
///
/// 1. extract the main content (readability) and collect metadata
/// 2. sanitize the extracted fragment against the allow-list
/// 3. convert the sanitized fragment to text and, if requested, markdown
/// 4. truncate text and markdown independently to `max_chars`
///
/// Anything else is treated as pre-extracted plain text.
///
/// # Errors
///
/// * `ParseFailure` - the document is HTML but no readable content was found
/// * `InvalidUrl` - `url` cannot serve as a base for the document
pub fn normalize(content: &str, url: &str, options: &RequestOptions) -> crate::Result<NormalizedContent> {
    if looks_like_html(content) {
        normalize_html(content, url, options)
    } else {
        Ok(normalize_text(content, options))
    }
}

/// Plain-text path: markdown is the text verbatim, there is no HTML
pub fn normalize_text(text: &str, options: &RequestOptions) -> NormalizedContent {
    let text = text.trim().to_string();
    let markdown = options.markdown.then(|| text.clone());

    NormalizedContent {
        text: truncate_opt(text, options.max_chars),
        markdown: markdown.map(|md| truncate_opt(md, options.max_chars)),
        html: None,
        metadata: PageMetadata::default(),
    }
}

/// Full HTML path
pub fn normalize_html(html: &str, url: &str, options: &RequestOptions) -> crate::Result<NormalizedContent> {
    let base_url = Url::parse(url).map_err(|e| LensError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    // Extract
    let article = readability::extractor::extract(&mut Cursor::new(html.as_bytes()), &base_url)
        .map_err(|e| LensError::ParseFailure {
            url: url.to_string(),
            message: e.to_string(),
        })?;

    let document = Html::parse_document(html);
    let mut metadata = PageMetadata {
        title: Some(collapse_whitespace(&article.title)).filter(|t| !t.is_empty()),
        ..Default::default()
    };
    metadata.merge_missing(extract_from_document(&document, &base_url));

    // Sanitize
    let clean_html = sanitize_html(&article.content);

    // Convert
    let text = html_to_text(&clean_html);
    if text.is_empty() {
        return Err(LensError::ParseFailure {
            url: url.to_string(),
            message: "no readable content found".to_string(),
        });
    }
    let markdown = options.markdown.then(|| html_to_markdown(&clean_html));

    // Truncate
    Ok(NormalizedContent {
        text: truncate_opt(text, options.max_chars),
        markdown: markdown.map(|md| truncate_opt(md, options.max_chars)),
        html: options.html.then_some(clean_html),
        metadata,
    })
}

/// Structural HTML to markdown conversion
pub fn html_to_markdown(html: &str) -> String {
    html2md::parse_html(html).trim().to_string()
}
