//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use gatekeeper::config::GatekeeperConfig;
use gatekeeper::http::HttpServer;
use gatekeeper::lifecycle::Shutdown;
use gatekeeper::security::{Gatekeeper, ManualClock, MemoryWindowStore, WindowStore};

/// Start a mock backend on an ephemeral port.
///
/// Responds 200 with the `x-request-id` it received as the body, so tests
/// can check what reached the application.
pub async fn start_mock_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = vec![0u8; 16 * 1024];
                        let n = socket.read(&mut buf).await.unwrap_or(0);
                        let head = String::from_utf8_lossy(&buf[..n]);
                        let request_id = head
                            .lines()
                            .find_map(|line| {
                                let (name, value) = line.split_once(':')?;
                                name.eq_ignore_ascii_case("x-request-id")
                                    .then(|| value.trim().to_string())
                            })
                            .unwrap_or_default();

                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            request_id.len(),
                            request_id
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Run an `HttpServer` for `config` on an ephemeral port.
pub async fn start_proxy(config: GatekeeperConfig, shutdown: &Shutdown) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(&config).unwrap();
    tokio::spawn(server.run(listener, shutdown.subscribe()));

    addr
}

/// A gatekeeper on a manual clock and a fresh in-memory store.
pub fn manual_gatekeeper(config: &GatekeeperConfig) -> (Arc<Gatekeeper>, Arc<ManualClock>) {
    manual_gatekeeper_with_store(config, Arc::new(MemoryWindowStore::new()))
}

pub fn manual_gatekeeper_with_store(
    config: &GatekeeperConfig,
    store: Arc<dyn WindowStore>,
) -> (Arc<Gatekeeper>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    let gatekeeper = Gatekeeper::with_parts(config, store, clock.clone()).unwrap();
    (Arc::new(gatekeeper), clock)
}

/// A browser-like request from `client`.
pub fn request(method: Method, uri: &str, client: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("user-agent", "Mozilla/5.0 (X11; Linux x86_64)")
        .header("x-forwarded-for", client)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
