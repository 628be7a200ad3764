//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status
//! - `proxy_request_duration_seconds` (histogram): latency distribution
//! - `proxy_route_updates_total` (counter): route snapshots by outcome
//!   (`adopted`, `dropped`, `stale`)
//! - `proxy_flagged_users` (gauge): users in the current route snapshot
//! - `proxy_tracked_users` (gauge): per-user windows held by the tracker
//! - `proxy_appid_requests_total` (counter): requests per appid
//! - `proxy_appid_sources` / `proxy_appid_users` (gauges): distinct source
//!   IPs and user ids per appid in the last stats period

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];
    counter!("proxy_requests_total", &labels).increment(1);
    histogram!("proxy_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

pub fn record_route_update(outcome: &'static str) {
    counter!("proxy_route_updates_total", "outcome" => outcome).increment(1);
}

pub fn record_flagged_users(count: usize) {
    gauge!("proxy_flagged_users").set(count as f64);
}

pub fn record_tracked_users(count: usize) {
    gauge!("proxy_tracked_users").set(count as f64);
}

pub fn record_appid_request(appid: &str) {
    counter!("proxy_appid_requests_total", "appid" => appid.to_string()).increment(1);
}

pub fn record_appid_sources(appid: &str, sources: usize, users: usize) {
    gauge!("proxy_appid_sources", "appid" => appid.to_string()).set(sources as f64);
    gauge!("proxy_appid_users", "appid" => appid.to_string()).set(users as f64);
}
