//! HTTP URL prober against a local mock server.

use intent_inference::adapters::prober::HttpUrlProber;
use intent_inference::domain::models::ProberConfig;
use intent_inference::{UrlHealth, UrlProber};
use mockito::Server;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

/// Accepts connections and holds them open without ever answering.
async fn silent_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let addr = listener.local_addr().expect("Failed to read local addr");
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{addr}")
}

fn limited_prober(timeout_secs: u64, max_concurrency: usize) -> HttpUrlProber {
    let config = ProberConfig {
        timeout_secs,
        max_concurrency,
        ..ProberConfig::default()
    };
    HttpUrlProber::new(&config).expect("Failed to create prober")
}

fn prober() -> HttpUrlProber {
    let config = ProberConfig {
        timeout_secs: 2,
        ..ProberConfig::default()
    };
    HttpUrlProber::new(&config).expect("Failed to create prober")
}

#[tokio::test]
async fn test_head_success_is_healthy() {
    let mut server = Server::new_async().await;
    let head = server
        .mock("HEAD", "/products")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let url = format!("{}/products", server.url());
    let health = prober().probe(std::slice::from_ref(&url)).await;

    assert_eq!(health.get(&url), Some(&UrlHealth::Healthy));
    head.assert_async().await;
}

#[tokio::test]
async fn test_head_not_found_and_get_failure_is_unhealthy() {
    let mut server = Server::new_async().await;
    let _head = server
        .mock("HEAD", "/missing")
        .with_status(404)
        .create_async()
        .await;
    let _get = server
        .mock("GET", "/missing")
        .with_status(404)
        .create_async()
        .await;

    let url = format!("{}/missing", server.url());
    let health = prober().probe(std::slice::from_ref(&url)).await;

    assert_eq!(health.get(&url), Some(&UrlHealth::Unhealthy));
}

#[tokio::test]
async fn test_head_rejected_falls_back_to_get() {
    let mut server = Server::new_async().await;
    let head = server
        .mock("HEAD", "/")
        .with_status(405)
        .expect(1)
        .create_async()
        .await;
    let get = server
        .mock("GET", "/")
        .with_status(200)
        .with_body("<html></html>")
        .expect(1)
        .create_async()
        .await;

    let url = server.url();
    let health = prober().probe(std::slice::from_ref(&url)).await;

    assert_eq!(health.get(&url), Some(&UrlHealth::Healthy));
    head.assert_async().await;
    get.assert_async().await;
}

#[tokio::test]
async fn test_mixed_batch_reports_every_url() {
    let mut server = Server::new_async().await;
    let _ok = server
        .mock("HEAD", "/ok")
        .with_status(204)
        .create_async()
        .await;
    let _gone = server
        .mock("HEAD", "/gone")
        .with_status(410)
        .create_async()
        .await;
    let _gone_get = server
        .mock("GET", "/gone")
        .with_status(410)
        .create_async()
        .await;

    let ok = format!("{}/ok", server.url());
    let gone = format!("{}/gone", server.url());
    let refused = "http://127.0.0.1:1/".to_string();
    let garbage = "ftp://example.com".to_string();
    let urls = vec![ok.clone(), gone.clone(), refused.clone(), garbage.clone()];

    let health = prober().probe(&urls).await;

    assert_eq!(health.len(), 4);
    assert_eq!(health[&ok], UrlHealth::Healthy);
    assert_eq!(health[&gone], UrlHealth::Unhealthy);
    assert_eq!(health[&refused], UrlHealth::Unhealthy);
    assert_eq!(health[&garbage], UrlHealth::Unhealthy);
}

#[tokio::test]
async fn test_empty_input_checks_nothing() {
    assert!(prober().probe(&[]).await.is_empty());
}

#[tokio::test]
async fn test_server_that_never_answers_is_unhealthy_after_timeout() {
    let base = silent_server().await;
    let url = format!("{base}/hang");

    let started = Instant::now();
    let health = limited_prober(1, 4).probe(std::slice::from_ref(&url)).await;

    assert_eq!(health.get(&url), Some(&UrlHealth::Unhealthy));
    assert!(started.elapsed() < Duration::from_millis(2500));
}

#[tokio::test]
async fn test_batch_larger_than_concurrency_cap_finishes_within_one_timeout() {
    let base = silent_server().await;
    let urls: Vec<String> = (0..40).map(|i| format!("{base}/slow/{i}")).collect();

    let started = Instant::now();
    let health = limited_prober(1, 4).probe(&urls).await;
    let elapsed = started.elapsed();

    assert_eq!(health.len(), 40);
    assert!(health.values().all(|h| *h == UrlHealth::Unhealthy));
    // Ten waves of four would take ten seconds if queued URLs waited unbounded.
    assert!(elapsed < Duration::from_millis(2500), "took {elapsed:?}");
}

#[tokio::test]
async fn test_queued_urls_still_succeed_when_server_is_fast() {
    let mut server = Server::new_async().await;
    let head = server
        .mock("HEAD", mockito::Matcher::Regex(r"^/item/\d+$".to_string()))
        .with_status(200)
        .expect(12)
        .create_async()
        .await;

    let urls: Vec<String> = (0..12).map(|i| format!("{}/item/{i}", server.url())).collect();
    let health = limited_prober(2, 2).probe(&urls).await;

    assert_eq!(health.len(), 12);
    assert!(health.values().all(|h| *h == UrlHealth::Healthy));
    head.assert_async().await;
}
