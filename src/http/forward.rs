//! Forwarding to the upstream backend.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the backend (scheme, authority, base path)
//! - Strip hop-by-hop headers in both directions
//! - Append the client address to `X-Forwarded-For`
//! - Stream the backend response back unchanged otherwise

use std::net::IpAddr;

use axum::{
    body::{Body, Bytes},
    http::{
        header::{self, HeaderMap, HeaderName, HeaderValue},
        request::Parts,
        uri::{InvalidUri, InvalidUriParts, PathAndQuery, Scheme},
        Request, Response, Uri,
    },
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use url::Url;

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Headers that only apply to a single connection.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid upstream uri: {0}")]
    Uri(#[from] InvalidUri),

    #[error("invalid upstream uri: {0}")]
    UriParts(#[from] InvalidUriParts),

    #[error("failed to build upstream request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
}

/// HTTP client used to reach the backend.
#[derive(Clone, Debug)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
}

impl Default for Forwarder {
    fn default() -> Self {
        Self::new()
    }
}

impl Forwarder {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client }
    }

    /// Send the request to `backend` and return its response.
    pub async fn forward(
        &self,
        mut parts: Parts,
        body: Bytes,
        backend: &Url,
        client_ip: Option<IpAddr>,
    ) -> Result<Response<Body>, ForwardError> {
        let uri = upstream_uri(backend, &parts.uri)?;

        strip_hop_by_hop(&mut parts.headers);
        if let Some(ip) = client_ip {
            append_forwarded_for(&mut parts.headers, ip);
        }

        let mut builder = Request::builder()
            .method(parts.method)
            .uri(uri)
            .version(parts.version);
        if let Some(headers) = builder.headers_mut() {
            *headers = parts.headers;
        }
        let request = builder.body(Body::from(body))?;

        let response = self.client.request(request).await?;
        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

/// Map the incoming URI onto the backend, joining the backend's base path.
pub fn upstream_uri(backend: &Url, original: &Uri) -> Result<Uri, ForwardError> {
    let host = backend.host_str().unwrap_or_default();
    let authority = match backend.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    let base = backend.path().trim_end_matches('/');
    let path = original.path();
    let path_and_query = match original.query() {
        Some(query) => format!("{base}{path}?{query}"),
        None => format!("{base}{path}"),
    };

    let mut parts = original.clone().into_parts();
    parts.scheme = Some(Scheme::HTTP);
    parts.authority = Some(authority.parse()?);
    parts.path_and_query = Some(path_and_query.parse::<PathAndQuery>()?);
    Ok(Uri::from_parts(parts)?)
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named in Connection are hop-by-hop too.
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, ip: IpAddr) {
    let value = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) => format!("{prior}, {ip}"),
        None => ip.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_uri_rewrites_authority() {
        let backend = Url::parse("http://172.17.0.1:9001").unwrap();
        let uri: Uri = "/api/chat?userid=1".parse().unwrap();

        let up = upstream_uri(&backend, &uri).unwrap();
        assert_eq!(up.to_string(), "http://172.17.0.1:9001/api/chat?userid=1");
    }

    #[test]
    fn test_upstream_uri_joins_base_path() {
        let backend = Url::parse("http://backend/base/").unwrap();
        let uri: Uri = "/x".parse().unwrap();

        let up = upstream_uri(&backend, &uri).unwrap();
        assert_eq!(up.to_string(), "http://backend/base/x");
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-custom"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-custom", HeaderValue::from_static("1"));
        headers.insert("x-lb-uid", HeaderValue::from_static("u1"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 1);
        assert_eq!(headers["x-lb-uid"], "u1");
    }

    #[test]
    fn test_forwarded_for_appends() {
        let mut headers = HeaderMap::new();
        append_forwarded_for(&mut headers, "10.0.0.1".parse().unwrap());
        append_forwarded_for(&mut headers, "10.0.0.2".parse().unwrap());
        assert_eq!(headers[&X_FORWARDED_FOR], "10.0.0.1, 10.0.0.2");
    }
}
