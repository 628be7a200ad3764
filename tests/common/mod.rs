//! Shared utilities for integration testing.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{http::HeaderMap, Router};
use tokio::net::TcpListener;
use uid_proxy::config::ProxyConfig;
use uid_proxy::traffic::{RouteSnapshot, RouteTableHandle};
use uid_proxy::{HttpServer, RedirectLists, Shutdown};

/// Start a backend that answers every request with its `x-*` headers,
/// one `name: value` per line.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = Router::new().fallback(|headers: HeaderMap| async move {
        let mut lines: Vec<String> = headers
            .iter()
            .filter(|(name, _)| name.as_str().starts_with("x-"))
            .map(|(name, value)| format!("{}: {}", name, value.to_str().unwrap_or_default()))
            .collect();
        lines.sort();
        lines.join("\n")
    });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// A running proxy and the handles tests need to inspect it.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub route_table: RouteTableHandle,
    pub shutdown: Shutdown,
}

impl TestProxy {
    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.addr, path_and_query)
    }

    /// Poll the route table until `pred` holds or a second passes.
    #[allow(dead_code)]
    pub async fn wait_for<F>(&self, pred: F) -> bool
    where
        F: Fn(&RouteSnapshot) -> bool,
    {
        for _ in 0..100 {
            let snapshot = self.route_table.snapshot().await.unwrap();
            if pred(&snapshot) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a proxy in front of `backend` with the given limits.
pub async fn start_proxy(
    backend: SocketAddr,
    window_secs: u64,
    max_requests: u64,
    lists: RedirectLists,
) -> TestProxy {
    let mut config = ProxyConfig::default();
    config.upstream.default_backend = format!("http://{backend}");
    config.traffic.window_secs = window_secs;
    config.traffic.max_requests = max_requests;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config, lists).unwrap();
    let route_table = server.route_table();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestProxy {
        addr,
        route_table,
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Parse the echo backend's body into header name → value.
pub fn echoed(body: &str) -> HashMap<String, String> {
    body.lines()
        .filter_map(|line| line.split_once(": "))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
