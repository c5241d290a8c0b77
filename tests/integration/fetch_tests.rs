//! Single-page and batch fetching through the local provider

use crate::common::{article_page, config, html, local_only, mount_page, EXAMPLE_DOMAIN_PAGE};
use sumi_lens::Extractor;
use sumi_lens::model::ProviderId;
use sumi_lens::{LensError, RequestOptions};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_fetch_single_example_page() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", EXAMPLE_DOMAIN_PAGE).await;

    let extractor = local_only();
    let page = extractor
        .fetch_single(&format!("{}/", mock_server.uri()), &RequestOptions::default())
        .await
        .expect("fetch should succeed");

    assert_eq!(page.provider, ProviderId::Local);
    assert!(!page.text.is_empty());
    assert!(page.text.contains("illustrative examples"));
    assert!(page.markdown.is_some());
    assert!(page.html.is_none());
    assert_eq!(page.metadata.title.as_deref(), Some("Example Domain"));
    assert_eq!(page.metadata.status_code, Some(200));
    assert!(page.depth.is_none());
    assert!(page.subpages.is_none());
}

#[tokio::test]
async fn test_max_chars_bounds_text_and_markdown() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/article", article_page("Truncation", "")).await;

    let extractor = local_only();
    let options = RequestOptions::default().with_max_chars(25);
    let page = extractor
        .fetch_single(&format!("{}/article", mock_server.uri()), &options)
        .await
        .unwrap();

    assert!(page.text.chars().count() <= 25);
    assert!(page.markdown.as_ref().unwrap().chars().count() <= 25);
}

#[tokio::test]
async fn test_html_output_is_sanitized() {
    let mock_server = MockServer::start().await;
    let body = article_page("Sanitize", "").replace(
        "<h1>Sanitize</h1>",
        r#"<h1 onclick="steal()">Sanitize</h1><script>alert(1)</script>"#,
    );
    mount_page(&mock_server, "/", body).await;

    let extractor = local_only();
    let options = RequestOptions::default().with_html(true);
    let page = extractor
        .fetch_single(&format!("{}/", mock_server.uri()), &options)
        .await
        .unwrap();

    let html = page.html.expect("html requested");
    assert!(html.contains("Sanitize"));
    assert!(!html.contains("onclick"));
    assert!(!html.contains("<script"));
    assert!(!page.text.contains("alert(1)"));
}

#[tokio::test]
async fn test_not_found_is_fetch_failure() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let extractor = local_only();
    let err = extractor
        .fetch_single(&format!("{}/gone", mock_server.uri()), &RequestOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, LensError::FetchFailure { .. }));
    assert_eq!(err.status_code(), Some(404));
    assert!(!err.is_retryable());

    // Plain failures never take the provider out of rotation
    assert!(extractor.list_available_providers().contains(&ProviderId::Local));
}

#[tokio::test]
async fn test_too_many_requests_rate_limits_local() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let extractor = local_only();
    let url = format!("{}/busy", mock_server.uri());
    let err = extractor
        .fetch_single(&url, &RequestOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LensError::RateLimited {
            provider: ProviderId::Local,
            ..
        }
    ));
    assert!(err.is_retryable());
    assert!(extractor.list_available_providers().is_empty());

    let state = &extractor.provider_states()[&ProviderId::Local];
    assert!(state.rate_limit.is_limited);
    assert!(state.rate_limit.reset_at.is_some());

    let err = extractor
        .fetch_single(&url, &RequestOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LensError::NoProviderAvailable));
}

#[tokio::test]
async fn test_non_html_content_is_rejected() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(b"%PDF-1.4".to_vec()),
        )
        .mount(&mock_server)
        .await;

    let extractor = local_only();
    let err = extractor
        .fetch_single(&format!("{}/report.pdf", mock_server.uri()), &RequestOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.tag(), "FETCH_FAILURE");
}

#[tokio::test]
async fn test_plain_text_page() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notes.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/plain")
                .set_body_string("Plain notes, nothing fancy."),
        )
        .mount(&mock_server)
        .await;

    let extractor = local_only();
    let page = extractor
        .fetch_single(&format!("{}/notes.txt", mock_server.uri()), &RequestOptions::default())
        .await
        .unwrap();
    assert_eq!(page.text, "Plain notes, nothing fancy.");
    assert_eq!(page.markdown.as_deref(), Some("Plain notes, nothing fancy."));
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/huge", article_page(&"Huge ".repeat(400), "")).await;
    mount_page(&mock_server, "/small", article_page("Small", "")).await;

    let mut config = config(None, false, false);
    config.fetch.max_body_bytes = 1024;
    let extractor = Extractor::new(config).unwrap();

    let err = extractor
        .fetch_single(&format!("{}/huge", mock_server.uri()), &RequestOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.tag(), "FETCH_FAILURE");
    assert!(err.to_string().contains("1024 bytes"));

    let page = extractor
        .fetch_single(&format!("{}/small", mock_server.uri()), &RequestOptions::default())
        .await
        .unwrap();
    assert!(page.text.contains("The Small page explains"));
}

#[tokio::test]
async fn test_plain_text_markup_is_not_parsed() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/snippet.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/plain; charset=utf-8")
                .set_body_string("Use <b>bold</b> tags for emphasis."),
        )
        .mount(&mock_server)
        .await;

    let extractor = local_only();
    let options = RequestOptions::default().with_max_subpages(3);
    let page = extractor
        .crawl_single(&format!("{}/snippet.txt", mock_server.uri()), &options)
        .await
        .unwrap();
    assert_eq!(page.text, "Use <b>bold</b> tags for emphasis.");
    assert!(page.html.is_none());
    assert!(page.subpages.is_none());
}

#[tokio::test]
async fn test_redirect_is_followed() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301)
                .insert_header("location", format!("{}/new", mock_server.uri()).as_str()),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(html(article_page("Moved", "")))
        .mount(&mock_server)
        .await;

    let extractor = local_only();
    let url = format!("{}/old", mock_server.uri());
    let page = extractor
        .fetch_single(&url, &RequestOptions::default())
        .await
        .unwrap();
    assert_eq!(page.url, url);
    assert!(page.text.contains("Moved"));
}

#[tokio::test]
async fn test_fetch_batch_statuses_follow_input_order() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/one", article_page("One", "")).await;
    mount_page(&mock_server, "/two", article_page("Two", "")).await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let base = mock_server.uri();
    let urls = vec![
        format!("{}/one", base),
        format!("{}/missing", base),
        "not-a-url".to_string(),
        format!("{}/two", base),
    ];

    let extractor = local_only();
    let batch = extractor
        .fetch_batch(&urls, &RequestOptions::default())
        .await
        .unwrap();

    assert_eq!(batch.statuses.len(), 4);
    let ids: Vec<&str> = batch.statuses.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, urls.iter().map(String::as_str).collect::<Vec<_>>());

    assert!(batch.statuses[0].is_success());
    let missing = batch.statuses[1].error.as_ref().unwrap();
    assert_eq!(missing.tag, "FETCH_FAILURE");
    assert_eq!(missing.http_status_code, Some(404));
    assert_eq!(batch.statuses[2].error.as_ref().unwrap().tag, "INVALID_URL");
    assert!(batch.statuses[3].is_success());

    let results: Vec<&str> = batch.results.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(results, vec![urls[0].as_str(), urls[3].as_str()]);
}

#[tokio::test]
async fn test_fetch_batch_empty() {
    let extractor = local_only();
    let batch = extractor
        .fetch_batch(&[], &RequestOptions::default())
        .await
        .unwrap();

    assert!(batch.results.is_empty());
    assert!(batch.statuses.is_empty());
    let json = serde_json::to_value(&batch).unwrap();
    assert_eq!(json, serde_json::json!({"results": [], "statuses": []}));
}

#[tokio::test]
async fn test_only_local_listed_without_credentials() {
    let extractor = local_only();
    let available: Vec<_> = extractor.list_available_providers().into_iter().collect();
    assert_eq!(available, vec![ProviderId::Local]);
}
