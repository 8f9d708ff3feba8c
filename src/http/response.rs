//! Response handling and transformation.
//!
//! # Responsibilities
//! - Build redirect and error responses
//! - Apply header rules and the `server` header
//! - Weak ETags and conditional `304`s for buffered 2xx responses
//!
//! # Design Decisions
//! - Responses without `content-length` are streamed through untouched
//!   apart from headers; only sized bodies are buffered for ETags
//! - Upstream failures become `502`, never a panic or a dropped connection

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, Response, StatusCode};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};

/// Errors raised while forwarding a request.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
    #[error("external request failed: {0}")]
    External(#[from] reqwest::Error),
    #[error("invalid upstream URI: {0}")]
    InvalidUri(#[from] axum::http::uri::InvalidUri),
    #[error("failed to build upstream request: {0}")]
    Request(#[from] axum::http::Error),
    #[error("request body exceeds {0} bytes")]
    BodyTooLarge(usize),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn into_response(self) -> Response<Body> {
        let status = self.status();
        let body = match self {
            ProxyError::BodyTooLarge(_) => "Request body too large",
            _ => "Could not proxy request.",
        };
        text_response(status, body)
    }
}

pub fn text_response(status: StatusCode, body: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// Redirect with a short explanatory body.
pub fn redirect_response(status: StatusCode, location: &str) -> Response<Body> {
    let mut response = Response::new(Body::from(format!("Redirecting to {location}")));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    match HeaderValue::from_str(location) {
        Ok(value) => {
            headers.insert(header::LOCATION, value);
        }
        Err(_) => tracing::warn!(%location, "Redirect location is not a valid header value"),
    }
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

/// Pretty-URL redirect sent before dispatch.
pub fn canonical_redirect(location: &str) -> Response<Body> {
    let mut response = redirect_response(StatusCode::MOVED_PERMANENTLY, location);
    *response.body_mut() = Body::empty();
    let headers = response.headers_mut();
    headers.insert(header::AGE, HeaderValue::from_static("0"));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=0, must-revalidate"),
    );
    response
}

/// Weak ETag over `body`: `W/"<len hex>-<digest prefix>"`.
pub fn weak_etag(body: &[u8]) -> String {
    let digest = STANDARD.encode(Sha256::digest(body));
    format!("W/\"{:x}-{}\"", body.len(), &digest[..27])
}

/// Apply header rule values, overriding whatever the backend sent.
pub fn apply_header_rules(headers: &mut HeaderMap, rules: &[(String, String)]) {
    for (name, value) in rules {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "Skipping invalid header rule value"),
        }
    }
}

/// Add a weak ETag to a sized 2xx GET response, answering `304`
/// when it matches `If-None-Match`.
pub async fn with_etag(
    response: Response<Body>,
    method: &Method,
    if_none_match: Option<&HeaderValue>,
    limit: usize,
) -> Response<Body> {
    if *method != Method::GET
        || !response.status().is_success()
        || response.headers().contains_key(header::ETAG)
    {
        return response;
    }
    let sized = response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
        .is_some_and(|len| len <= limit);
    if !sized {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes: Bytes = match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to buffer response for ETag");
            return text_response(StatusCode::BAD_GATEWAY, "Could not proxy request.");
        }
    };

    let etag = weak_etag(&bytes);
    let Ok(value) = HeaderValue::from_str(&etag) else {
        return Response::from_parts(parts, Body::from(bytes));
    };
    parts.headers.insert(header::ETAG, value);

    if if_none_match.is_some_and(|v| v.as_bytes() == etag.as_bytes()) {
        parts.status = StatusCode::NOT_MODIFIED;
        parts.headers.remove(header::CONTENT_LENGTH);
        return Response::from_parts(parts, Body::empty());
    }
    Response::from_parts(parts, Body::from(bytes))
}
