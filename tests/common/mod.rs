//! Shared utilities for integration testing.

use bytes::Bytes;
use futures_util::future::BoxFuture;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use caching_proxy::config::ProxyConfig;
use caching_proxy::http::ProxyState;
use caching_proxy::lifecycle::Shutdown;
use caching_proxy::net::Listener;
use caching_proxy::upstream::{FetchError, Fetcher};
use caching_proxy::ProxyServer;

/// Start a mock origin that returns a fixed body and counts requests.
pub async fn start_mock_origin(body: &'static str) -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, calls)
}

/// In-memory origin that holds each fetch for `delay` and records the
/// highest number of fetches running at once.
#[allow(dead_code)]
pub struct SlowOrigin {
    delay: Duration,
    running: AtomicUsize,
    pub peak: AtomicUsize,
    pub calls: AtomicUsize,
}

#[allow(dead_code)]
impl SlowOrigin {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        })
    }
}

impl Fetcher for SlowOrigin {
    fn fetch<'a>(&'a self, _url: &'a str, _timeout: Duration) -> BoxFuture<'a, Result<Bytes, FetchError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(Bytes::from_static(b"slow"))
        })
    }
}

/// A proxy running on an ephemeral port.
#[allow(dead_code)]
pub struct TestProxy {
    pub addr: SocketAddr,
    pub state: ProxyState,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<caching_proxy::Result<()>>,
}

#[allow(dead_code)]
impl TestProxy {
    pub async fn stop(self) {
        self.shutdown.trigger();
        self.handle.await.unwrap().unwrap();
    }
}

/// Start a proxy with `config` (its bind address is ignored) and `fetcher`.
pub async fn start_proxy(config: ProxyConfig, fetcher: Arc<dyn Fetcher>) -> TestProxy {
    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = tcp.local_addr().unwrap();
    let server = ProxyServer::new(&config, fetcher).unwrap();
    let state = server.state().clone();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let handle = tokio::spawn(server.run(Listener::from_tcp(tcp), rx));

    TestProxy {
        addr,
        state,
        shutdown,
        handle,
    }
}

/// Send raw request bytes and read the response until the proxy closes.
pub async fn send_raw(addr: SocketAddr, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    String::from_utf8(out).unwrap()
}

/// Send `GET <target> HTTP/1.1`.
#[allow(dead_code)]
pub async fn get(addr: SocketAddr, target: &str) -> String {
    send_raw(addr, format!("GET {} HTTP/1.1\r\nHost: proxy\r\n\r\n", target).as_bytes()).await
}

/// Body of a raw response.
#[allow(dead_code)]
pub fn body(response: &str) -> &str {
    response.split_once("\r\n\r\n").map(|(_, b)| b).unwrap_or_default()
}
