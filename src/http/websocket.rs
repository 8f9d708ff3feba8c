//! WebSocket proxy handling.
//!
//! # Responsibilities
//! - Connect to the framework origin's socket before accepting the client
//! - Complete the upgrade handshake with the client
//! - Bidirectional frame forwarding
//!
//! # Data Flow
//! ```text
//! Client ←──── WebSocket frames ────→ Proxy ←──── WebSocket frames ────→ Framework
//! ```
//!
//! # Design Decisions
//! - Upgrades bypass rule dispatch entirely
//! - Frame-level forwarding (no message buffering)
//! - Close frames propagated in both directions; either side closing ends both

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, Response, StatusCode};
use futures_util::{SinkExt, StreamExt};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::derive_accept_key;
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::WebSocketStream;

use crate::http::response::text_response;

/// Headers copied from the client handshake to the upstream one.
const FORWARDED: &[header::HeaderName] = &[
    header::COOKIE,
    header::SEC_WEBSOCKET_PROTOCOL,
    header::ORIGIN,
    header::USER_AGENT,
];

/// `ws://` URL on the framework origin for `path_and_query`.
pub fn upstream_url(framework_origin: &str, path_and_query: &str) -> String {
    let origin = framework_origin
        .strip_prefix("http://")
        .map(|rest| format!("ws://{rest}"))
        .or_else(|| {
            framework_origin
                .strip_prefix("https://")
                .map(|rest| format!("wss://{rest}"))
        })
        .unwrap_or_else(|| framework_origin.to_string());
    format!("{}{}", origin.trim_end_matches('/'), path_and_query)
}

/// Forward an upgrade request to the framework origin.
pub async fn forward(framework_origin: Option<&str>, mut request: Request<Body>) -> Response<Body> {
    let Some(origin) = framework_origin else {
        return text_response(StatusCode::NOT_FOUND, "Not Found");
    };
    let Some(key) = request.headers().get(header::SEC_WEBSOCKET_KEY).cloned() else {
        return text_response(StatusCode::BAD_REQUEST, "Missing Sec-WebSocket-Key");
    };

    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    let url = upstream_url(origin, &path_and_query);

    let mut upstream_request = match url.as_str().into_client_request() {
        Ok(req) => req,
        Err(e) => {
            tracing::error!(error = %e, %url, "Invalid WebSocket upstream URL");
            return text_response(StatusCode::BAD_GATEWAY, "Could not proxy request.");
        }
    };
    for name in FORWARDED {
        if let Some(value) = request.headers().get(name) {
            upstream_request.headers_mut().insert(name.clone(), value.clone());
        }
    }

    let (upstream, upstream_response) = match tokio_tungstenite::connect_async(upstream_request).await {
        Ok(connected) => connected,
        Err(e) => {
            tracing::error!(error = %e, %url, "WebSocket upstream connection failed");
            return text_response(StatusCode::BAD_GATEWAY, "Could not proxy request.");
        }
    };

    let on_upgrade = hyper::upgrade::on(&mut request);
    tokio::spawn(async move {
        match on_upgrade.await {
            Ok(upgraded) => {
                let client =
                    WebSocketStream::from_raw_socket(TokioIo::new(upgraded), Role::Server, None).await;
                relay(client, upstream).await;
                tracing::debug!("WebSocket connection closed");
            }
            Err(e) => tracing::error!(error = %e, "WebSocket client upgrade failed"),
        }
    });

    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::SWITCHING_PROTOCOLS;
    let headers = response.headers_mut();
    headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("Upgrade"));
    if let Ok(accept) = HeaderValue::from_str(&derive_accept_key(key.as_bytes())) {
        headers.insert(header::SEC_WEBSOCKET_ACCEPT, accept);
    }
    if let Some(protocol) = upstream_response.headers().get(header::SEC_WEBSOCKET_PROTOCOL) {
        headers.insert(header::SEC_WEBSOCKET_PROTOCOL, protocol.clone());
    }
    response
}

/// Pump frames both ways until either side closes.
async fn relay<C, U>(client: WebSocketStream<C>, upstream: WebSocketStream<U>)
where
    C: AsyncRead + AsyncWrite + Unpin,
    U: AsyncRead + AsyncWrite + Unpin,
{
    let (mut client_tx, mut client_rx) = client.split();
    let (mut upstream_tx, mut upstream_rx) = upstream.split();

    let client_to_upstream = async {
        while let Some(Ok(message)) = client_rx.next().await {
            let closing = message.is_close();
            if upstream_tx.send(message).await.is_err() || closing {
                break;
            }
        }
        let _ = upstream_tx.close().await;
    };

    let upstream_to_client = async {
        while let Some(Ok(message)) = upstream_rx.next().await {
            let closing = message.is_close();
            if client_tx.send(message).await.is_err() || closing {
                break;
            }
        }
        let _ = client_tx.close().await;
    };

    tokio::select! {
        _ = client_to_upstream => {}
        _ = upstream_to_client => {}
    }
}
