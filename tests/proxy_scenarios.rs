//! End-to-end tests against a running proxy.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use caching_proxy::config::ProxyConfig;
use caching_proxy::{CacheStats, HttpFetcher};

mod common;

fn http_fetcher(config: &ProxyConfig) -> Arc<HttpFetcher> {
    Arc::new(HttpFetcher::new(&config.upstream).unwrap())
}

#[tokio::test]
async fn miss_then_hit_from_real_origin() {
    let (origin, calls) = common::start_mock_origin("hello").await;
    let config = ProxyConfig::default();
    let proxy = common::start_proxy(config.clone(), http_fetcher(&config)).await;
    let target = format!("http://{}/", origin);

    let first = common::get(proxy.addr, &target).await;
    assert_eq!(first, "HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello");
    assert_eq!(
        proxy.state.cache.stats(),
        CacheStats { hits: 0, misses: 1, evictions: 0 }
    );

    let second = common::get(proxy.addr, &target).await;
    assert_eq!(second, first);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        proxy.state.cache.stats(),
        CacheStats { hits: 1, misses: 1, evictions: 0 }
    );

    proxy.stop().await;
}

#[tokio::test]
async fn third_request_in_window_is_rate_limited() {
    let (origin, _) = common::start_mock_origin("hello").await;
    let mut config = ProxyConfig::default();
    config.rate_limit.max_tokens = 2;
    config.rate_limit.window_ms = 60_000;
    let proxy = common::start_proxy(config.clone(), http_fetcher(&config)).await;
    let target = format!("http://{}/", origin);

    assert!(common::get(proxy.addr, &target).await.starts_with("HTTP/1.1 200 OK"));
    assert!(common::get(proxy.addr, &target).await.starts_with("HTTP/1.1 200 OK"));
    assert_eq!(
        common::get(proxy.addr, &target).await,
        "HTTP/1.1 429 Too Many Requests\r\nContent-Length: 0\r\n\r\n"
    );

    proxy.stop().await;
}

#[tokio::test]
async fn stats_path_reports_current_counters() {
    let (origin, _) = common::start_mock_origin("hello").await;
    let mut config = ProxyConfig::default();
    config.cache.capacity = 1;
    let proxy = common::start_proxy(config.clone(), http_fetcher(&config)).await;

    common::get(proxy.addr, &format!("http://{}/a", origin)).await;
    common::get(proxy.addr, &format!("http://{}/a", origin)).await;
    common::get(proxy.addr, &format!("http://{}/b", origin)).await;

    let response = common::get(proxy.addr, "/stats").await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    let reported: CacheStats = serde_json::from_str(common::body(&response)).unwrap();
    assert_eq!(reported, CacheStats { hits: 1, misses: 2, evictions: 1 });
    assert_eq!(reported, proxy.state.cache.stats());

    proxy.stop().await;
}

#[tokio::test]
async fn bare_request_line_is_answered_while_client_keeps_socket_open() {
    let mut config = ProxyConfig::default();
    config.timeouts.read_secs = 30;
    let proxy = common::start_proxy(config.clone(), http_fetcher(&config)).await;

    let mut stream = TcpStream::connect(proxy.addr).await.unwrap();
    stream.write_all(b"GET /stats HTTP/1.1\r\n").await.unwrap();

    let started = Instant::now();
    let mut out = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut out))
        .await
        .expect("proxy waited for more request bytes")
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(String::from_utf8(out).unwrap().starts_with("HTTP/1.1 200 OK\r\n"));

    proxy.stop().await;
}

#[tokio::test]
async fn target_without_scheme_reaches_origin() {
    let (origin, calls) = common::start_mock_origin("hello").await;
    let config = ProxyConfig::default();
    let proxy = common::start_proxy(config.clone(), http_fetcher(&config)).await;

    let response = common::get(proxy.addr, &format!("{}/", origin)).await;
    assert_eq!(response, "HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    proxy.stop().await;
}

#[tokio::test]
async fn non_get_is_bad_request() {
    let config = ProxyConfig::default();
    let proxy = common::start_proxy(config.clone(), http_fetcher(&config)).await;

    let response = common::send_raw(proxy.addr, b"POST http://example.com HTTP/1.1\r\n\r\n").await;
    assert_eq!(response, "HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\n\r\n");

    proxy.stop().await;
}

#[tokio::test]
async fn unreachable_origin_is_not_found() {
    // Bind then drop to get a port with nothing listening.
    let closed = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let config = ProxyConfig::default();
    let proxy = common::start_proxy(config.clone(), http_fetcher(&config)).await;

    let response = common::get(proxy.addr, &format!("http://{}/", closed)).await;
    assert_eq!(response, "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n");
    assert!(proxy.state.cache.is_empty());

    proxy.stop().await;
}

#[tokio::test]
async fn concurrent_handling_is_bounded_by_max_clients() {
    let origin = common::SlowOrigin::new(Duration::from_millis(200));
    let mut config = ProxyConfig::default();
    config.listener.max_clients = 2;
    config.rate_limit.max_tokens = 100;
    let proxy = common::start_proxy(config, origin.clone()).await;

    let clients: Vec<_> = (0..6)
        .map(|i| {
            let addr = proxy.addr;
            tokio::spawn(async move { common::get(addr, &format!("http://origin/{}", i)).await })
        })
        .collect();
    for client in clients {
        let response = client.await.unwrap();
        assert_eq!(response, "HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\nslow");
    }

    assert_eq!(origin.calls.load(Ordering::SeqCst), 6);
    assert_eq!(origin.peak.load(Ordering::SeqCst), 2);

    proxy.stop().await;
}

#[tokio::test]
async fn shutdown_waits_for_in_flight_connections() {
    let origin = common::SlowOrigin::new(Duration::from_millis(300));
    let proxy = common::start_proxy(ProxyConfig::default(), origin.clone()).await;

    let addr = proxy.addr;
    let client = tokio::spawn(async move { common::get(addr, "http://origin/slow").await });
    while origin.calls.load(Ordering::SeqCst) == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    proxy.stop().await;
    let response = client.await.unwrap();
    assert!(response.ends_with("slow"));
}
