//! Request handling and transformation.
//!
//! # Responsibilities
//! - Detect WebSocket upgrades
//! - Buffer bodies before dispatch, bounded by the configured limit
//! - Prepare forwarded headers (hop-by-hop removal, X-Forwarded-For)

use std::net::SocketAddr;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method};

/// Request ID header, generated when absent and echoed on the response.
pub const REQUEST_ID_HEADER: &str = "x-nf-request-id";

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

pub fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    let upgrade = headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"));
    let connection = headers
        .get(header::CONNECTION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.split(',').any(|t| t.trim().eq_ignore_ascii_case("upgrade")));
    upgrade && connection
}

/// GET, HEAD and OPTIONS bodies are never read.
pub fn should_buffer(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Read the whole body, failing when it exceeds `limit` bytes.
pub async fn buffer_body(method: &Method, body: Body, limit: usize) -> Result<Bytes, axum::Error> {
    if !should_buffer(method) {
        return Ok(Bytes::new());
    }
    axum::body::to_bytes(body, limit).await
}

/// Remove headers that must not cross a proxy hop.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named in `Connection` are hop-by-hop too.
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

/// Headers for a forwarded request.
///
/// `keep_host` preserves the client's `Host`; otherwise the client library
/// sets it from the target URL.
pub fn forwarded_headers(
    original: &HeaderMap,
    client: Option<SocketAddr>,
    extra: &[(String, String)],
    keep_host: bool,
) -> HeaderMap {
    let mut headers = original.clone();
    strip_hop_by_hop(&mut headers);
    headers.remove(header::CONTENT_LENGTH);
    if !keep_host {
        headers.remove(header::HOST);
    }

    if let Some(addr) = client {
        if let Ok(value) = HeaderValue::from_str(&addr.ip().to_string()) {
            headers.insert("x-forwarded-for", value);
        }
    }

    for (name, value) in extra {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "Skipping invalid proxy header"),
        }
    }
    headers
}
