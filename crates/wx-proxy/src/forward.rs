//! Request forwarding for proxy rules.
//!
//! The middleware checks each incoming path against the proxy table before
//! anything else in the router sees it. Matching requests are sent upstream
//! and the upstream response is streamed back; everything else falls through.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use reqwest::Client;
use wx_core::{ProxyRule, ProxyTable, ReqwestErrorExt};

use crate::error::ProxyError;

/// Largest request body buffered for forwarding
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Connection-scoped headers that must not be forwarded
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Proxy table plus the client used to reach its targets
#[derive(Debug)]
pub struct ProxyState {
    table: ProxyTable,
    client: Client,
}

impl ProxyState {
    /// `timeout` bounds each forwarded request, from connect to the end of the
    /// upstream body.
    pub fn new(table: ProxyTable, timeout: Duration) -> Result<Self, ProxyError> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .build()
            .map_err(ProxyError::Client)?;

        Ok(Self { table, client })
    }

    pub fn table(&self) -> &ProxyTable {
        &self.table
    }
}

/// Axum middleware: forward requests matching a proxy rule, pass the rest on.
pub async fn proxy_middleware(
    State(state): State<Arc<ProxyState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some((prefix, rule)) = state.table.find(request.uri().path()) else {
        return next.run(request).await;
    };

    match forward(&state.client, prefix, rule, request).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

/// Send `request` to `rule`'s target and relay the answer.
///
/// # Errors
/// Returns a [`ProxyError`] if the request cannot be built, its body cannot be
/// read, or the upstream cannot be reached.
pub async fn forward(
    client: &Client,
    prefix: &str,
    rule: &ProxyRule,
    request: Request,
) -> Result<Response, ProxyError> {
    let (parts, body) = request.into_parts();

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let upstream = rule
        .upstream_url(path_and_query)
        .map_err(|source| ProxyError::InvalidTarget {
            prefix: prefix.to_string(),
            source,
        })?;

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);
    headers.remove(header::CONTENT_LENGTH);
    if rule.change_origin {
        if let Some(host) = rule.host_header() {
            headers.insert(header::HOST, HeaderValue::from_str(&host)?);
        }
    }

    let body = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(ProxyError::Body)?;

    tracing::debug!("{} {} -> {}", parts.method, path_and_query, upstream);

    let response = client
        .request(parts.method, upstream.clone())
        .headers(headers)
        .body(body)
        .send()
        .await
        .map_err(|e| ProxyError::Upstream {
            prefix: prefix.to_string(),
            upstream: upstream.to_string(),
            source: e.into_network_error(),
        })?;

    let status = response.status();
    let mut headers = response.headers().clone();
    strip_hop_by_hop(&mut headers);

    let mut relayed = Response::new(Body::from_stream(response.bytes_stream()));
    *relayed.status_mut() = status;
    *relayed.headers_mut() = headers;
    Ok(relayed)
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}
