//! Integration tests for `HttpFetcher` using `wiremock`.

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pricesync_scraper::{HttpFetcher, PageFetcher, ScraperError};

fn fetcher(max_retries: u32) -> HttpFetcher {
    HttpFetcher::new(5, "pricesync-test/0.1", max_retries, 0)
        .expect("failed to build test HttpFetcher")
}

#[tokio::test]
async fn returns_body_and_sends_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/outboards/bf225"))
        .and(header("user-agent", "pricesync-test/0.1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<h1>BF225</h1>"))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/outboards/bf225", server.uri());
    assert_eq!(fetcher(0).fetch(&url).await.unwrap(), "<h1>BF225</h1>");
}

#[tokio::test]
async fn not_found_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/gone", server.uri());
    let err = fetcher(3).fetch(&url).await.unwrap_err();
    assert!(matches!(err, ScraperError::NotFound { url: ref u } if *u == url));
}

#[tokio::test]
async fn forbidden_is_unexpected_status_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blocked"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/blocked", server.uri());
    let err = fetcher(3).fetch(&url).await.unwrap_err();
    assert!(matches!(
        err,
        ScraperError::UnexpectedStatus { status: 403, .. }
    ));
}

#[tokio::test]
async fn server_error_is_retried_until_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let url = format!("{}/flaky", server.uri());
    let err = fetcher(2).fetch(&url).await.unwrap_err();
    assert!(matches!(
        err,
        ScraperError::UnexpectedStatus { status: 503, .. }
    ));
}

#[tokio::test]
async fn rate_limit_then_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let url = format!("{}/busy", server.uri());
    assert_eq!(fetcher(1).fetch(&url).await.unwrap(), "ok");
}
