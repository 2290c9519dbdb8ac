//! The reverse proxy binary's server over real sockets.

use std::sync::Arc;
use std::time::Duration;

use gatekeeper::admin::{serve_admin, setup_admin_router};
use gatekeeper::config::GatekeeperConfig;
use gatekeeper::http::HttpServer;
use gatekeeper::lifecycle::Shutdown;
use tokio::net::TcpListener;

mod common;

fn proxy_config(backend: std::net::SocketAddr) -> GatekeeperConfig {
    let mut config = GatekeeperConfig::default();
    config.upstream.address = backend.to_string();
    config
}

#[tokio::test]
async fn test_admitted_request_reaches_backend_with_request_id() {
    let backend = common::start_mock_backend().await;
    let shutdown = Shutdown::new();
    let proxy = common::start_proxy(proxy_config(backend), &shutdown).await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{proxy}/dashboard?page=2"))
        .header("user-agent", "Mozilla/5.0")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let header_id = response.headers()["x-request-id"].to_str().unwrap().to_string();
    assert_eq!(response.headers()["x-ratelimit-remaining"], "99");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");

    // The backend saw the same correlation ID the client got back.
    assert_eq!(response.text().await.unwrap(), header_id);

    shutdown.trigger();
}

#[tokio::test]
async fn test_denied_request_never_reaches_backend() {
    let backend = common::start_mock_backend().await;
    let shutdown = Shutdown::new();
    let proxy = common::start_proxy(proxy_config(backend), &shutdown).await;

    let response = reqwest::Client::new()
        .get(format!("http://{proxy}/.env"))
        .header("user-agent", "Mozilla/5.0")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 403);
    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["error"], "Access denied");
    assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));

    shutdown.trigger();
}

#[tokio::test]
async fn test_reqwest_user_agent_is_blocked() {
    let backend = common::start_mock_backend().await;
    let shutdown = Shutdown::new();
    let proxy = common::start_proxy(proxy_config(backend), &shutdown).await;

    let response = reqwest::Client::new()
        .get(format!("http://{proxy}/"))
        .header("user-agent", "python-requests/2.31")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    shutdown.trigger();
}

#[tokio::test]
async fn test_graceful_shutdown() {
    let backend = common::start_mock_backend().await;
    let shutdown = Shutdown::new();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let server = HttpServer::new(&proxy_config(backend)).unwrap();
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.trigger();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not stop");
    assert!(result.unwrap().is_ok());
}

#[tokio::test]
async fn test_admin_status_and_reset() {
    let backend = common::start_mock_backend().await;
    let mut config = proxy_config(backend);
    config.rate_limit.max_requests = 1;
    config.admin.enabled = true;
    config.admin.api_key = "test-admin-key".into();

    let shutdown = Shutdown::new();
    let proxy_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let proxy = proxy_listener.local_addr().unwrap();
    let server = HttpServer::new(&config).unwrap();
    let gatekeeper = server.gatekeeper();
    tokio::spawn(server.run(proxy_listener, shutdown.subscribe()));

    let admin_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let admin = admin_listener.local_addr().unwrap();
    let router = setup_admin_router(Arc::clone(&gatekeeper), &config.admin);
    tokio::spawn(serve_admin(router, admin_listener, shutdown.subscribe()));

    let client = reqwest::Client::new();
    let call = || {
        client
            .get(format!("http://{proxy}/"))
            .header("user-agent", "Mozilla/5.0")
            .header("x-forwarded-for", "198.51.100.4")
            .send()
    };

    assert_eq!(call().await.unwrap().status(), 200);
    assert_eq!(call().await.unwrap().status(), 429);

    // No token, no access.
    let response = client
        .get(format!("http://{admin}/admin/status"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let status: serde_json::Value = client
        .get(format!("http://{admin}/admin/status"))
        .bearer_auth("test-admin-key")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["limit"], 1);
    assert_eq!(status["tracked_windows"], 1);
    assert_eq!(status["environment"], "development");

    let response = client
        .post(format!("http://{admin}/admin/rate-limits/reset"))
        .bearer_auth("test-admin-key")
        .json(&serde_json::json!({ "client": "198.51.100.4", "method": "get" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["key"], "198.51.100.4:GET");

    assert_eq!(call().await.unwrap().status(), 200);

    let response = client
        .post(format!("http://{admin}/admin/rate-limits/reset"))
        .bearer_auth("test-admin-key")
        .json(&serde_json::json!({ "client": "198.51.100.4", "method": "NOT A METHOD" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    shutdown.trigger();
}
