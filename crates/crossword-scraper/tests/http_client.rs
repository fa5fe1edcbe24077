use std::time::Duration;

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crossword_scraper::{Fetcher, HttpClient, HttpError};

fn client() -> HttpClient {
    HttpClient::new(5_000).with_retry_base(Duration::from_millis(1))
}

#[tokio::test]
async fn test_fetch_text_sends_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/puzzle.json"))
        .and(header("nyt-s", "token"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"body":[]}"#))
        .mount(&server)
        .await;

    let url = format!("{}/api/puzzle.json", server.uri());
    let body = client()
        .fetch_text(&url, &[("nyt-s".to_string(), "token".to_string())])
        .await
        .unwrap();
    assert_eq!(body, r#"{"body":[]}"#);
}

#[tokio::test]
async fn test_fetch_binary() {
    let server = MockServer::start().await;
    let data = vec![0u8, 1, 2, 0xff];
    Mock::given(method("GET"))
        .and(path("/mini.puz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(data.clone()))
        .mount(&server)
        .await;

    let url = format!("{}/mini.puz", server.uri());
    assert_eq!(client().fetch_binary(&url, &[]).await.unwrap(), data);
}

#[tokio::test]
async fn test_not_found_carries_url_and_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let url = format!("{}/missing.jpz", server.uri());
    let err = client().fetch_binary(&url, &[]).await.unwrap_err();
    assert_eq!(err, HttpError::Status { url, status: 404 });
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .with_priority(2)
        .mount(&server)
        .await;

    let url = format!("{}/flaky", server.uri());
    assert_eq!(client().fetch_text(&url, &[]).await.unwrap(), "ok");
}

#[tokio::test]
async fn test_persistent_server_error_gives_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let url = format!("{}/down", server.uri());
    let err = client().fetch_text(&url, &[]).await.unwrap_err();
    assert!(matches!(err, HttpError::Status { status: 500, .. }));
}

#[tokio::test]
async fn test_unreachable_host_is_transport_error() {
    let err = client()
        .fetch_text("http://127.0.0.1:1/puzzle", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, HttpError::Transport { .. }));
    assert_eq!(err.url(), "http://127.0.0.1:1/puzzle");
}
