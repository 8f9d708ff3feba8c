//! Static responses: files and the 404 page.

use std::path::Path;

use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};

/// Serve `file` with a guessed content type.
pub async fn serve_file(file: &Path, status: StatusCode) -> std::io::Result<Response<Body>> {
    let bytes = tokio::fs::read(file).await?;
    let mime = mime_guess::from_path(file).first_or_octet_stream();

    let len = bytes.len();

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(mime.essence_str()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    Ok(response)
}

/// `{publish_dir}/404.html` with status 404, or a plain "Not Found".
pub async fn render_not_found(publish_dir: &Path) -> Response<Body> {
    let page = publish_dir.join("404.html");
    if page.is_file() {
        match serve_file(&page, StatusCode::NOT_FOUND).await {
            Ok(response) => return response,
            Err(e) => tracing::warn!(error = %e, "Error while serving 404.html file"),
        }
    }

    let mut response = Response::new(Body::from("Not Found"));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn serves_with_content_type() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("style.css");
        fs::write(&file, "body{}").unwrap();

        let response = serve_file(&file, StatusCode::OK).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css");
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "6");
    }

    #[tokio::test]
    async fn custom_404_page() {
        let dir = tempfile::tempdir().unwrap();
        let response = render_not_found(dir.path()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"Not Found");

        fs::write(dir.path().join("404.html"), "<h1>gone</h1>").unwrap();
        let response = render_not_found(dir.path()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html");
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"<h1>gone</h1>");
    }
}
