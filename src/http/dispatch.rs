//! Per-request routing decisions.
//!
//! # Data Flow
//! ```text
//! buffered request
//!     → identity.rs (appid, cmd, user id)
//!     → traffic monitor (event) + stats collector (event)
//!     → route table snapshot
//!     → RoutingDecision (k8s list > ubitech list > flagged > default)
//!     → X-Lb-* / X-Openapi-* headers
//!     → forward.rs to the snapshot's default backend
//! ```

use std::net::IpAddr;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    http::{
        header::{HeaderMap, HeaderName, HeaderValue},
        request::Parts,
        Response,
    },
};
use rand::Rng;
use thiserror::Error;

use crate::http::forward::{ForwardError, Forwarder};
use crate::http::identity::{FormValues, RequestIdentity};
use crate::lists::RedirectLists;
use crate::stats::{AppidEvent, StatsHandle};
use crate::traffic::{RouteSnapshot, RouteTableError, RouteTableHandle, TrafficMonitorHandle};

pub const X_LB_UID: HeaderName = HeaderName::from_static("x-lb-uid");
pub const X_LB_K8S: HeaderName = HeaderName::from_static("x-lb-k8s");
pub const X_LB_UBITECH: HeaderName = HeaderName::from_static("x-lb-ubitech");
pub const X_OPENAPI_APPID: HeaderName = HeaderName::from_static("x-openapi-appid");
pub const X_OPENAPI_CMD: HeaderName = HeaderName::from_static("x-openapi-cmd");

/// Upper bound (exclusive) of the suffix appended to flagged user ids.
const FLAG_SUFFIX_RANGE: u32 = 1000;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    RouteTable(#[from] RouteTableError),

    #[error(transparent)]
    Forward(#[from] ForwardError),
}

/// How a request is tagged for the downstream load balancer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingDecision {
    /// Appid is on the k8s list.
    K8s,
    /// Client IP is on the ubitech list.
    Ubitech,
    /// User is flagged; the uid header carries this suffix.
    Flagged(u32),
    Default,
}

impl RoutingDecision {
    pub fn decide(
        lists: &RedirectLists,
        snapshot: &RouteSnapshot,
        identity: &RequestIdentity,
        client_ip: Option<&str>,
    ) -> Self {
        if lists.is_k8s_app(&identity.appid) {
            RoutingDecision::K8s
        } else if client_ip.is_some_and(|ip| lists.is_ubitech_ip(ip)) {
            RoutingDecision::Ubitech
        } else if snapshot.is_flagged(&identity.user_id) {
            RoutingDecision::Flagged(rand::thread_rng().gen_range(0..FLAG_SUFFIX_RANGE))
        } else {
            RoutingDecision::Default
        }
    }

    /// Value written into `X-Lb-Uid`.
    pub fn uid_header(&self, user_id: &str) -> String {
        match self {
            RoutingDecision::Flagged(suffix) => format!("{user_id}{suffix}"),
            _ => user_id.to_string(),
        }
    }

    /// Write every routing header onto `headers`.
    pub fn apply(&self, headers: &mut HeaderMap, identity: &RequestIdentity) {
        match self {
            RoutingDecision::K8s => {
                headers.insert(X_LB_K8S, HeaderValue::from_static("k8suser"));
            }
            RoutingDecision::Ubitech => {
                headers.insert(X_LB_UBITECH, HeaderValue::from_static("ubituser"));
            }
            RoutingDecision::Flagged(_) | RoutingDecision::Default => {}
        }
        set_header(headers, X_LB_UID, &self.uid_header(&identity.user_id));
        set_header(headers, X_OPENAPI_APPID, &identity.appid);
        set_header(headers, X_OPENAPI_CMD, &identity.cmd);
    }
}

fn set_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    let value = HeaderValue::from_bytes(value.as_bytes()).unwrap_or_else(|_| {
        tracing::warn!(header = %name, value, "Value not allowed in a header, sending empty");
        HeaderValue::from_static("")
    });
    headers.insert(name, value);
}

/// Everything a request needs to be routed; cheap to clone per request.
#[derive(Clone)]
pub struct Dispatcher {
    monitor: TrafficMonitorHandle,
    table: RouteTableHandle,
    stats: StatsHandle,
    lists: Arc<RedirectLists>,
    forwarder: Forwarder,
    log_requests: bool,
}

impl Dispatcher {
    pub fn new(
        monitor: TrafficMonitorHandle,
        table: RouteTableHandle,
        stats: StatsHandle,
        lists: Arc<RedirectLists>,
        log_requests: bool,
    ) -> Self {
        Self {
            monitor,
            table,
            stats,
            lists,
            forwarder: Forwarder::new(),
            log_requests,
        }
    }

    /// Route one GET/POST request whose body has been buffered.
    pub async fn dispatch(
        &self,
        mut parts: Parts,
        body: Bytes,
        client_ip: Option<IpAddr>,
    ) -> Result<Response<Body>, DispatchError> {
        let identity = RequestIdentity::from_form(&FormValues::from_request(&parts, &body));
        let source_ip = client_ip.map(|ip| ip.to_string());

        self.stats.record(AppidEvent {
            appid: identity.appid.clone(),
            source_ip: source_ip.clone(),
            user_id: identity.user_id.clone(),
        });
        self.monitor.report(identity.user_id.clone()).await;

        let snapshot = self.table.snapshot().await?;
        let decision =
            RoutingDecision::decide(&self.lists, &snapshot, &identity, source_ip.as_deref());

        if self.log_requests {
            tracing::debug!(
                method = %parts.method,
                uri = %parts.uri,
                appid = %identity.appid,
                user_id = %identity.user_id,
                decision = ?decision,
                "Dispatching request"
            );
        }
        if let RoutingDecision::Flagged(_) = decision {
            tracing::info!(user_id = %identity.user_id, "User is over the request threshold");
        }

        decision.apply(&mut parts.headers, &identity);

        let response = self
            .forwarder
            .forward(parts, body, snapshot.default_backend(), client_ip)
            .await?;
        Ok(response)
    }
}
