//! Remote providers, selection and rate-limit fallback
//!
//! The hosted APIs are served from the same mock server as the target
//! pages, so one server covers every hop of a request.

use crate::common::{article_page, hits, local_only, mount_page, with_remotes, EXA_KEY, FIRECRAWL_KEY};
use serde_json::{json, Value};
use sumi_lens::model::ProviderId;
use sumi_lens::{LensError, RequestOptions};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// JSON bodies the server received on `route`, in arrival order
async fn request_bodies(server: &MockServer, route: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == route)
        .filter_map(|request| serde_json::from_slice(&request.body).ok())
        .collect()
}

async fn mount_exa(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/contents"))
        .and(header("x-api-key", EXA_KEY))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn mount_firecrawl(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .and(header("authorization", format!("Bearer {}", FIRECRAWL_KEY).as_str()))
        .respond_with(response)
        .mount(server)
        .await;
}

fn exa_result(url: &str, text: &str) -> Value {
    json!({
        "id": url,
        "url": url,
        "title": "Exa Title",
        "author": "Ada",
        "publishedDate": "2024-03-01",
        "text": text
    })
}

#[tokio::test]
async fn test_exa_fetch_maps_contents() {
    let mock_server = MockServer::start().await;
    let url = "https://docs.rs/tokio";
    mount_exa(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(json!({
            "results": [exa_result(url, "  Tokio is an asynchronous runtime.  ")],
            "statuses": [{"id": url, "status": "success"}]
        })),
    )
    .await;

    let extractor = with_remotes(&mock_server, true, false);
    let options = RequestOptions::default()
        .with_provider(ProviderId::Exa)
        .with_max_chars(500);
    let page = extractor.fetch_single(url, &options).await.unwrap();

    assert_eq!(page.provider, ProviderId::Exa);
    assert_eq!(page.url, url);
    assert_eq!(page.text, "Tokio is an asynchronous runtime.");
    assert_eq!(page.metadata.title.as_deref(), Some("Exa Title"));
    assert_eq!(page.metadata.author.as_deref(), Some("Ada"));
    assert!(page.html.is_none());

    let bodies = request_bodies(&mock_server, "/contents").await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["urls"], json!([url]));
    assert_eq!(bodies[0]["text"]["maxCharacters"], 500);
    assert!(bodies[0].get("subpages").is_none());
}

#[tokio::test]
async fn test_exa_rate_limit_falls_back_to_local() {
    let mock_server = MockServer::start().await;
    mount_exa(
        &mock_server,
        ResponseTemplate::new(429).set_body_json(json!({"error": "Too many requests"})),
    )
    .await;
    mount_page(&mock_server, "/doc", article_page("Fallback", "")).await;

    let extractor = with_remotes(&mock_server, true, false);
    let options = RequestOptions::default().with_provider(ProviderId::Exa);
    let page = extractor
        .fetch_single(&format!("{}/doc", mock_server.uri()), &options)
        .await
        .unwrap();

    assert_eq!(page.provider, ProviderId::Local);
    assert!(page.text.contains("Fallback"));

    let available = extractor.list_available_providers();
    assert!(!available.contains(&ProviderId::Exa));
    assert!(available.contains(&ProviderId::Local));

    let states = extractor.provider_states();
    assert!(states[&ProviderId::Exa].rate_limit.is_limited);
    assert_eq!(states[&ProviderId::Exa].rate_limit.errors, 1);
    assert!(states[&ProviderId::Local].last_success.is_some());
}

#[tokio::test]
async fn test_exa_native_crawl() {
    let mock_server = MockServer::start().await;
    let url = "https://blog.example.org/";
    let subpages: Vec<Value> = (1..=3)
        .map(|i| exa_result(&format!("https://blog.example.org/post-{}", i), "Post body"))
        .collect();
    let mut root = exa_result(url, "Blog index");
    root["subpages"] = Value::Array(subpages);
    mount_exa(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(json!({
            "results": [root],
            "statuses": [{"id": url, "status": "success"}]
        })),
    )
    .await;

    let extractor = with_remotes(&mock_server, true, false);
    let options = RequestOptions::default()
        .with_provider(ProviderId::Exa)
        .with_max_subpages(2)
        .with_max_depth(2);
    let page = extractor.crawl_single(url, &options).await.unwrap();

    assert_eq!(page.provider, ProviderId::Exa);
    assert_eq!(page.depth, Some(0));
    let children = page.subpages.as_ref().unwrap();
    assert_eq!(children.len(), 2);
    for child in children {
        assert_eq!(child.depth, Some(1));
        assert_eq!(child.provider, ProviderId::Exa);
        assert!(child.subpages.is_none());
    }
    assert_eq!(children[0].url, "https://blog.example.org/post-1");

    let bodies = request_bodies(&mock_server, "/contents").await;
    assert_eq!(bodies[0]["subpages"], 2);
}

#[tokio::test]
async fn test_exa_native_crawl_stays_on_root_host() {
    let mock_server = MockServer::start().await;
    let url = "https://blog.example.org/";
    let mut root = exa_result(url, "Blog index");
    root["subpages"] = json!([
        exa_result("https://tracker.other.net/x", "Tracker"),
        exa_result("https://blog.example.org/post", "Post body")
    ]);
    mount_exa(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(json!({
            "results": [root],
            "statuses": [{"id": url, "status": "success"}]
        })),
    )
    .await;

    let extractor = with_remotes(&mock_server, true, false);
    let options = RequestOptions::default()
        .with_provider(ProviderId::Exa)
        .with_max_subpages(5)
        .with_same_domain_only(true);
    let page = extractor.crawl_single(url, &options).await.unwrap();

    let child_urls: Vec<&str> = page
        .subpages
        .as_ref()
        .unwrap()
        .iter()
        .map(|c| c.url.as_str())
        .collect();
    assert_eq!(child_urls, vec!["https://blog.example.org/post"]);
}

#[tokio::test]
async fn test_exa_batch_statuses() {
    let mock_server = MockServer::start().await;
    let found = "https://a.example.org/";
    let missing = "https://b.example.org/";
    mount_exa(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(json!({
            "results": [exa_result(found, "Found it")],
            "statuses": [
                {"id": found, "status": "success"},
                {"id": missing, "status": "error", "error": {"tag": "CRAWL_NOT_FOUND", "httpStatusCode": 404}}
            ]
        })),
    )
    .await;

    let extractor = with_remotes(&mock_server, true, false);
    let urls = vec![found.to_string(), missing.to_string()];
    let options = RequestOptions::default().with_provider(ProviderId::Exa);
    let batch = extractor.fetch_batch(&urls, &options).await.unwrap();

    assert_eq!(batch.results.len(), 1);
    assert_eq!(batch.results[0].url, found);
    assert!(batch.statuses[0].is_success());
    let error = batch.statuses[1].error.as_ref().unwrap();
    assert_eq!(error.tag, "FETCH_FAILURE");
    assert_eq!(error.http_status_code, Some(404));

    // The whole batch is one API call
    assert_eq!(hits(&mock_server, "/contents").await, 1);
}

#[tokio::test]
async fn test_html_request_selects_firecrawl() {
    let mock_server = MockServer::start().await;
    let url = "https://news.example.org/story";
    mount_firecrawl(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "markdown": "# Story\n\nThe story body.",
                "html": "<h1>Story</h1><p onclick=\"track()\">The story body.</p><script>track()</script>",
                "metadata": {
                    "title": "Story",
                    "language": "en",
                    "statusCode": 200,
                    "sourceURL": url,
                    "ogImage": "https://news.example.org/cover.png"
                }
            }
        })),
    )
    .await;

    let extractor = with_remotes(&mock_server, true, true);
    let options = RequestOptions::default().with_html(true).with_max_age(60_000);
    let page = extractor.fetch_single(url, &options).await.unwrap();

    assert_eq!(page.provider, ProviderId::Firecrawl);
    assert_eq!(page.text, "Story\nThe story body.");
    let html = page.html.unwrap();
    assert!(html.contains("The story body."));
    assert!(!html.contains("onclick"));
    assert!(!html.contains("<script"));
    assert_eq!(page.metadata.language.as_deref(), Some("en"));
    assert_eq!(
        page.metadata.image.as_deref(),
        Some("https://news.example.org/cover.png")
    );

    let bodies = request_bodies(&mock_server, "/v1/scrape").await;
    assert_eq!(bodies[0]["url"], url);
    assert_eq!(bodies[0]["formats"], json!(["markdown", "html"]));
    assert_eq!(bodies[0]["maxAge"], 60_000);
    assert_eq!(hits(&mock_server, "/contents").await, 0);
}

#[tokio::test]
async fn test_firecrawl_quota_without_fallback() {
    let mock_server = MockServer::start().await;
    mount_firecrawl(
        &mock_server,
        ResponseTemplate::new(402).set_body_json(json!({"success": false, "error": "Insufficient credits"})),
    )
    .await;

    let extractor = with_remotes(&mock_server, false, true);
    let options = RequestOptions::default()
        .with_provider(ProviderId::Firecrawl)
        .with_fallback(false);
    let err = extractor
        .fetch_single("https://news.example.org/story", &options)
        .await
        .unwrap_err();

    match err {
        LensError::RateLimited {
            provider,
            status_code,
            ..
        } => {
            assert_eq!(provider, ProviderId::Firecrawl);
            assert_eq!(status_code, Some(402));
        }
        other => panic!("expected a rate limit, got {:?}", other),
    }

    // Local was never tried
    assert!(extractor
        .provider_states()
        .get(&ProviderId::Local)
        .unwrap()
        .last_success
        .is_none());
}

#[tokio::test]
async fn test_firecrawl_crawl_discovers_children_locally() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let root_url = format!("{}/landing", base);
    let raw_html = article_page(
        "Landing",
        r#"<a href="/child-a">A</a> <a href="/child-b">B</a> <a href="/child-c">C</a>"#,
    );
    mount_firecrawl(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "markdown": "# Landing",
                "rawHtml": raw_html,
                "metadata": {"title": "Landing", "statusCode": 200, "sourceURL": root_url}
            }
        })),
    )
    .await;
    mount_page(&mock_server, "/child-a", article_page("ChildA", "")).await;
    mount_page(&mock_server, "/child-b", article_page("ChildB", "")).await;

    let extractor = with_remotes(&mock_server, false, true);
    let options = RequestOptions::default()
        .with_provider(ProviderId::Firecrawl)
        .with_max_subpages(2)
        .with_max_depth(1);
    let page = extractor.crawl_single(&root_url, &options).await.unwrap();

    assert_eq!(page.provider, ProviderId::Firecrawl);
    assert_eq!(page.depth, Some(0));
    let children = page.subpages.as_ref().unwrap();
    let child_urls: Vec<&str> = children.iter().map(|c| c.url.as_str()).collect();
    assert_eq!(
        child_urls,
        vec![format!("{}/child-a", base), format!("{}/child-b", base)]
    );
    assert!(children.iter().all(|c| c.provider == ProviderId::Local));
    assert!(children.iter().all(|c| c.depth == Some(1)));

    let bodies = request_bodies(&mock_server, "/v1/scrape").await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["formats"], json!(["markdown", "html", "rawHtml"]));
    assert_eq!(hits(&mock_server, "/child-c").await, 0);
    assert_eq!(hits(&mock_server, "/landing").await, 0);
}

#[tokio::test]
async fn test_every_provider_rate_limited() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;
    mount_exa(
        &mock_server,
        ResponseTemplate::new(429).set_body_json(json!({"error": "rate limit exceeded"})),
    )
    .await;
    mount_firecrawl(
        &mock_server,
        ResponseTemplate::new(429).set_body_json(json!({"success": false, "error": "Rate limit exceeded"})),
    )
    .await;

    let extractor = with_remotes(&mock_server, true, true);
    let err = extractor
        .fetch_single(&format!("{}/busy", mock_server.uri()), &RequestOptions::default())
        .await
        .unwrap_err();

    // The selected provider's error is the one reported
    assert!(matches!(
        err,
        LensError::RateLimited {
            provider: ProviderId::Local,
            ..
        }
    ));
    assert_eq!(hits(&mock_server, "/contents").await, 1);
    assert_eq!(hits(&mock_server, "/v1/scrape").await, 1);
    assert!(extractor.list_available_providers().is_empty());
}

#[tokio::test]
async fn test_preferred_provider_without_key() {
    let extractor = local_only();
    let options = RequestOptions::default()
        .with_provider(ProviderId::Exa)
        .with_fallback(false);
    let err = extractor
        .fetch_single("https://example.com/", &options)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LensError::ProviderUnavailable {
            provider: ProviderId::Exa
        }
    ));
}

#[tokio::test]
async fn test_preferred_provider_without_key_falls_back() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", article_page("Local", "")).await;

    let extractor = local_only();
    let options = RequestOptions::default().with_provider(ProviderId::Firecrawl);
    let page = extractor
        .fetch_single(&format!("{}/", mock_server.uri()), &options)
        .await
        .unwrap();
    assert_eq!(page.provider, ProviderId::Local);
}
