//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, timeout, request ID)
//! - Start the traffic tasks (route table, monitor, stats)
//! - Reject methods other than GET/POST before any routing work
//! - Bind server to listener with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{validation::parse_backend, ProxyConfig};
use crate::http::dispatch::{DispatchError, Dispatcher};
use crate::http::request::{MakeRequestUuidV4, PropagateRequestIdLayer, SetRequestIdLayer};
use crate::lists::RedirectLists;
use crate::observability::metrics;
use crate::stats::StatsCollector;
use crate::traffic::{RateTracker, RouteSnapshot, RouteTable, RouteTableHandle, TrafficMonitor};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid default backend '{0}': {1}")]
    Backend(String, String),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub max_body_size: usize,
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    route_table: RouteTableHandle,
}

impl HttpServer {
    /// Create the server and start its background tasks.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: ProxyConfig, lists: RedirectLists) -> Result<Self, ServerError> {
        let backend = parse_backend(&config.upstream.default_backend)
            .map_err(|e| ServerError::Backend(config.upstream.default_backend.clone(), e))?;

        let route_table = RouteTable::spawn(RouteSnapshot::new(backend));
        let tracker = RateTracker::new(
            config.traffic.window(),
            config.traffic.max_requests,
            config.traffic.max_tracked_users,
        );
        let monitor = TrafficMonitor::new(tracker, route_table.clone())
            .spawn(config.traffic.event_queue);
        let stats = StatsCollector::new(Duration::from_secs(config.observability.stats_period_secs))
            .spawn(config.traffic.event_queue);

        let dispatcher = Dispatcher::new(
            monitor,
            route_table.clone(),
            stats,
            Arc::new(lists),
            config.observability.is_dev(),
        );
        let state = AppState {
            dispatcher,
            max_body_size: config.security.max_body_size,
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            route_table,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/_health_check", any(health_check))
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backend = %self.config.upstream.default_backend,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Handle to the route table actor.
    pub fn route_table(&self) -> RouteTableHandle {
        self.route_table.clone()
    }
}

async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Catch-all handler: method check, body buffering, dispatch.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();

    if method != Method::GET && method != Method::POST {
        let host = request
            .headers()
            .get("host")
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default();
        tracing::warn!(host, method = %method, uri = %request.uri(), "Unknown request method");
        metrics::record_request(method.as_str(), 502, start);
        return (StatusCode::BAD_GATEWAY, "Method Error").into_response();
    }

    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, limit = state.max_body_size, "Failed to buffer request body");
            metrics::record_request(method.as_str(), 413, start);
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let response = match state.dispatcher.dispatch(parts, body, client_ip).await {
        Ok(response) => response,
        Err(DispatchError::RouteTable(e)) => {
            tracing::error!(error = %e, "Route table unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, "Route table unavailable").into_response()
        }
        Err(DispatchError::Forward(e)) => {
            tracing::error!(error = %e, "Upstream error");
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceExt;

    fn config() -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.upstream.default_backend = "http://127.0.0.1:1".into();
        config.traffic.window_secs = 1;
        config.traffic.max_requests = 3;
        config
    }

    #[tokio::test]
    async fn test_health_check() {
        let server = HttpServer::new(config(), RedirectLists::default()).unwrap();
        let response = server
            .router()
            .oneshot(Request::get("/_health_check").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_unsupported_method_rejected() {
        let server = HttpServer::new(config(), RedirectLists::default()).unwrap();
        let table = server.route_table();

        for method in [Method::PUT, Method::DELETE, Method::PATCH] {
            for _ in 0..5 {
                let response = server
                    .router()
                    .oneshot(
                        Request::builder()
                            .method(method.clone())
                            .uri("/api?userid=u3")
                            .body(Body::empty())
                            .unwrap(),
                    )
                    .await
                    .unwrap();
                assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
            }
        }

        let snap = table.snapshot().await.unwrap();
        assert_eq!(snap.version(), 0);
        assert!(snap.flagged().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_bad_gateway() {
        let server = HttpServer::new(config(), RedirectLists::default()).unwrap();
        let response = server
            .router()
            .oneshot(Request::get("/?userid=u1").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let mut config = config();
        config.security.max_body_size = 8;
        let server = HttpServer::new(config, RedirectLists::default()).unwrap();

        let response = server
            .router()
            .oneshot(
                Request::post("/")
                    .body(Body::from("userid=far-too-long"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_invalid_backend() {
        let mut config = config();
        config.upstream.default_backend = "nope".into();
        assert!(matches!(
            HttpServer::new(config, RedirectLists::default()),
            Err(ServerError::Backend(..))
        ));
    }
}
