//! Integration tests for the crawl engine
//!
//! A small site is mounted on a mock server and crawled through the local
//! provider, checking budgets, host filtering and cycle handling.

use crate::common::{article_page, hits, local_only, mount_page};
use sumi_lens::model::ProviderId;
use sumi_lens::{LensError, PageResult, RequestOptions};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mounts a site whose pages link to each other:
///
/// ```text
/// /        -> /a, /b, /missing, http://localhost:9/external
/// /a       -> /, /a/1, /b
/// /b       -> /b/1, /a
/// /a/1     -> /a/1/deep
/// /b/1     -> (none)
/// ```
async fn mount_site(server: &MockServer) {
    mount_page(
        server,
        "/",
        article_page(
            "Home",
            r#"<a href="/a">A</a> <a href="/b">B</a> <a href="/missing">Missing</a> <a href="http://localhost:9/external">External</a>"#,
        ),
    )
    .await;
    mount_page(
        server,
        "/a",
        article_page("Alpha", r#"<a href="/">Home</a> <a href="/a/1">A1</a> <a href="/b">B</a>"#),
    )
    .await;
    mount_page(
        server,
        "/b",
        article_page("Bravo", r#"<a href="/b/1">B1</a> <a href="/a">A</a>"#),
    )
    .await;
    mount_page(server, "/a/1", article_page("AlphaOne", r#"<a href="/a/1/deep">Deep</a>"#)).await;
    mount_page(server, "/b/1", article_page("BravoOne", "")).await;
    mount_page(server, "/a/1/deep", article_page("Deep", "")).await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

fn crawl_options(max_subpages: usize, max_depth: u32) -> RequestOptions {
    RequestOptions::default()
        .with_max_subpages(max_subpages)
        .with_max_depth(max_depth)
}

/// Checks depth bookkeeping over a whole tree
fn assert_tree_depths(page: &PageResult, max_depth: u32) {
    let depth = page.depth.expect("crawl results carry a depth");
    assert!(depth <= max_depth, "{} is deeper than {}", page.url, max_depth);
    if let Some(children) = &page.subpages {
        assert!(!children.is_empty(), "subpages is never an empty list");
        for child in children {
            assert_eq!(child.depth, Some(depth + 1));
            assert_tree_depths(child, max_depth);
        }
    }
}

fn all_urls(page: &PageResult, out: &mut Vec<String>) {
    out.push(page.url.clone());
    for child in page.subpages.iter().flatten() {
        all_urls(child, out);
    }
}

#[tokio::test]
async fn test_crawl_without_subpages_budget() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let extractor = local_only();
    let page = extractor
        .crawl_single(&format!("{}/", mock_server.uri()), &crawl_options(0, 3))
        .await
        .unwrap();

    assert_eq!(page.depth, Some(0));
    assert!(page.subpages.is_none());
    assert_eq!(hits(&mock_server, "/a").await, 0);

    let json = serde_json::to_value(&page).unwrap();
    assert!(json.get("subpages").is_none());
}

#[tokio::test]
async fn test_crawl_stays_on_root_host() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let root_url = format!("{}/", mock_server.uri());
    let options = crawl_options(2, 2).with_same_domain_only(true);
    let page = extractor_crawl(&root_url, &options).await;

    let root_host = Url::parse(&root_url).unwrap().host_str().unwrap().to_string();
    let mut urls = Vec::new();
    all_urls(&page, &mut urls);
    assert!(urls.len() > 1);
    for url in &urls {
        let host = Url::parse(url).unwrap().host_str().unwrap().to_string();
        assert_eq!(host, root_host);
    }
}

async fn extractor_crawl(url: &str, options: &RequestOptions) -> PageResult {
    local_only().crawl_single(url, options).await.unwrap()
}

#[tokio::test]
async fn test_crawl_depth_and_breadth_budgets() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    let base = mock_server.uri();

    let page = extractor_crawl(&format!("{}/", base), &crawl_options(3, 2)).await;
    assert_tree_depths(&page, 2);

    // /missing failed and is simply absent
    let children = page.subpages.as_ref().unwrap();
    let child_urls: Vec<&str> = children.iter().map(|c| c.url.as_str()).collect();
    assert_eq!(child_urls, vec![format!("{}/a", base), format!("{}/b", base)]);
    assert!(children.iter().all(|c| c.provider == ProviderId::Local));

    // Depth 2 pages are fetched but never expanded
    assert_eq!(hits(&mock_server, "/a/1").await, 1);
    assert_eq!(hits(&mock_server, "/a/1/deep").await, 0);
}

#[tokio::test]
async fn test_crawl_breadth_limit() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let page = extractor_crawl(&format!("{}/", mock_server.uri()), &crawl_options(1, 1)).await;
    let children = page.subpages.as_ref().unwrap();
    assert_eq!(children.len(), 1);
    assert!(children[0].subpages.is_none());
    assert_eq!(hits(&mock_server, "/b").await, 0);
}

#[tokio::test]
async fn test_crawl_never_fetches_a_page_twice() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let page = extractor_crawl(&format!("{}/", mock_server.uri()), &crawl_options(5, 5)).await;
    assert_tree_depths(&page, 5);

    for route in ["/", "/a", "/b", "/a/1", "/b/1", "/a/1/deep"] {
        assert_eq!(hits(&mock_server, route).await, 1, "{} fetched more than once", route);
    }

    let mut urls = Vec::new();
    all_urls(&page, &mut urls);
    let unique: std::collections::HashSet<_> = urls.iter().collect();
    assert_eq!(unique.len(), urls.len());
    assert_eq!(page.page_count(), 6);
}

#[tokio::test]
async fn test_crawl_root_failure_is_surfaced() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let err = local_only()
        .crawl_single(&format!("{}/missing", mock_server.uri()), &crawl_options(2, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, LensError::FetchFailure { .. }));
}

#[tokio::test]
async fn test_crawl_batch_roots_are_independent() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    let base = mock_server.uri();

    let roots = vec![format!("{}/a", base), format!("{}/b", base), format!("{}/missing", base)];
    let batch = local_only()
        .crawl_batch(&roots, &crawl_options(1, 1))
        .await
        .unwrap();

    assert_eq!(batch.statuses.len(), 3);
    assert!(batch.statuses[0].is_success());
    assert!(batch.statuses[1].is_success());
    assert_eq!(
        batch.statuses[2].error.as_ref().unwrap().http_status_code,
        Some(404)
    );

    // /a and /b may each discover the other: visited sets are per root
    assert_eq!(batch.results.len(), 2);
    for root in &batch.results {
        assert_eq!(root.depth, Some(0));
        assert_tree_depths(root, 1);
    }
    let b_children = batch.results[1].subpages.as_ref().unwrap();
    assert_eq!(b_children[0].url, format!("{}/b/1", base));
}

#[tokio::test]
async fn test_crawl_batch_root_rate_limit_fails_whole_batch() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    Mock::given(method("GET"))
        .and(path("/throttled"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;
    let base = mock_server.uri();

    let roots = vec![format!("{}/a", base), format!("{}/throttled", base)];
    let err = local_only()
        .crawl_batch(&roots, &crawl_options(1, 1))
        .await
        .unwrap_err();

    // The successful first root is not reported separately
    assert!(err.is_rate_limit());
}

#[tokio::test]
async fn test_child_rate_limit_is_swallowed() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/",
        article_page("Root", r#"<a href="/ok">Ok</a> <a href="/slow">Slow</a>"#),
    )
    .await;
    mount_page(&mock_server, "/ok", article_page("Okay", "")).await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let page = extractor_crawl(&format!("{}/", mock_server.uri()), &crawl_options(5, 1)).await;
    let children = page.subpages.as_ref().unwrap();
    assert_eq!(children.len(), 1);
    assert!(children[0].url.ends_with("/ok"));
}
