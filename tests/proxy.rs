//! End-to-end tests for the front door against mock backends.

use std::fs;
use std::path::Path;

use axum::http::StatusCode;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::json;

mod common;

fn write(root: &Path, path: &str, content: &str) {
    let file = root.join(path);
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(file, content).unwrap();
}

fn role_token(roles: &[&str]) -> String {
    let header = URL_SAFE_NO_PAD.encode(json!({"alg": "HS256", "typ": "JWT"}).to_string());
    let payload = URL_SAFE_NO_PAD.encode(
        json!({
            "exp": 4_102_444_800u64,
            "app_metadata": {"authorization": {"roles": roles}}
        })
        .to_string(),
    );
    format!("{header}.{payload}.unsigned")
}

#[tokio::test]
async fn redirect_rule_sends_location() {
    let site = tempfile::tempdir().unwrap();
    write(site.path(), "_redirects", "/old /new 301\n/go https://example.com/landing 302\n");
    let proxy = common::start_proxy(common::site_config(site.path())).await;
    let client = common::client();

    let res = client.get(proxy.url("/old")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(res.headers()["location"], "/new");
    assert!(res.headers().get("etag").is_none());

    let res = client.get(proxy.url("/go")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers()["location"], "https://example.com/landing");
}

#[tokio::test]
async fn existing_file_wins_unless_forced() {
    let site = tempfile::tempdir().unwrap();
    write(site.path(), "logo.css", "logo");
    write(site.path(), "style.css", "style");
    write(site.path(), "other.css", "other");
    write(
        site.path(),
        "_redirects",
        "/logo.css /other.css 200\n/style.css /other.css 200!\n",
    );
    let proxy = common::start_proxy(common::site_config(site.path())).await;
    let client = common::client();

    let body = client.get(proxy.url("/logo.css")).send().await.unwrap().text().await.unwrap();
    assert_eq!(body, "logo");

    let body = client.get(proxy.url("/style.css")).send().await.unwrap().text().await.unwrap();
    assert_eq!(body, "other");
}

#[tokio::test]
async fn spa_fallback_serves_index() {
    let site = tempfile::tempdir().unwrap();
    write(site.path(), "index.html", "<h1>app</h1>");
    write(site.path(), "_redirects", "/* /index.html 200\n");
    let proxy = common::start_proxy(common::site_config(site.path())).await;

    let res = common::client().get(proxy.url("/app/settings")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "text/html");
    assert_eq!(res.text().await.unwrap(), "<h1>app</h1>");
}

#[tokio::test]
async fn rewrite_to_function_carries_original_path() {
    let site = tempfile::tempdir().unwrap();
    write(site.path(), "_redirects", "/api/* /.netlify/functions/:splat 200\n");
    let (functions, log) = common::start_fixed_backend("from function").await;
    let mut config = common::site_config(site.path());
    config.functions.port = Some(functions.port());
    let proxy = common::start_proxy(config).await;

    let res = common::client()
        .get(proxy.url("/api/hello?name=dev"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-nf-request-id"));
    assert_eq!(res.text().await.unwrap(), "from function");

    let seen = log.lock().unwrap()[0].clone();
    assert_eq!(seen.target, "/.netlify/functions/hello?name=dev");
    assert_eq!(seen.header("x-netlify-original-pathname"), Some("/api/hello"));
    assert_eq!(seen.header("x-forwarded-for"), Some("127.0.0.1"));
    assert!(seen.header("x-nf-request-id").is_some());
}

#[tokio::test]
async fn form_post_goes_to_functions() {
    let site = tempfile::tempdir().unwrap();
    write(site.path(), "_redirects", "/contact /thanks 200\n");
    let (functions, log) = common::start_fixed_backend("thanks").await;
    let mut config = common::site_config(site.path());
    config.functions.port = Some(functions.port());
    let proxy = common::start_proxy(config).await;

    let res = common::client()
        .post(proxy.url("/contact"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("name=dev")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let seen = log.lock().unwrap()[0].clone();
    assert_eq!(seen.method, "POST");
    assert_eq!(seen.target, "/contact");
    assert_eq!(seen.body, "name=dev");
}

#[tokio::test]
async fn role_gate_hides_content() {
    let site = tempfile::tempdir().unwrap();
    write(site.path(), "admin/panel.html", "secret panel");
    write(site.path(), "404.html", "custom not found");
    write(site.path(), "_redirects", "/admin/* /admin/:splat 200! Role=admin\n");
    let proxy = common::start_proxy(common::site_config(site.path())).await;
    let client = common::client();

    let res = client.get(proxy.url("/admin/panel.html")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.text().await.unwrap(), "custom not found");

    let res = client
        .get(proxy.url("/admin/panel.html"))
        .header("cookie", format!("nf_jwt={}", role_token(&["editor"])))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(proxy.url("/admin/panel.html"))
        .header("cookie", format!("nf_jwt={}", role_token(&["admin"])))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "secret panel");
}

#[tokio::test]
async fn framework_404_retries_alternates() {
    let site = tempfile::tempdir().unwrap();
    let (framework, log) = common::start_backend(|req| match req.target.as_str() {
        "/docs.html" => (200, "docs page".to_string()),
        _ => (404, "nope".to_string()),
    })
    .await;
    let mut config = common::site_config(site.path());
    config.framework.host = "127.0.0.1".into();
    config.framework.port = Some(framework.port());
    let proxy = common::start_proxy(config).await;

    let res = common::client().get(proxy.url("/docs")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "docs page");

    let targets: Vec<String> = log.lock().unwrap().iter().map(|r| r.target.clone()).collect();
    assert_eq!(targets, vec!["/docs", "/docs.html"]);
}

#[tokio::test]
async fn exhausted_alternates_render_404_page() {
    let site = tempfile::tempdir().unwrap();
    write(site.path(), "404.html", "custom not found");
    let (framework, _log) = common::start_backend(|_| (404, "nope".to_string())).await;
    let mut config = common::site_config(site.path());
    config.framework.host = "127.0.0.1".into();
    config.framework.port = Some(framework.port());
    let proxy = common::start_proxy(config).await;

    let res = common::client().get(proxy.url("/missing")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.text().await.unwrap(), "custom not found");
}

#[tokio::test]
async fn rule_status_overrides_framework_404() {
    let site = tempfile::tempdir().unwrap();
    write(site.path(), "404.html", "custom not found");
    write(site.path(), "_redirects", "/foo /bar 200\n");
    let (framework, log) = common::start_backend(|_| (404, "framework body".to_string())).await;
    let mut config = common::site_config(site.path());
    config.framework.host = "127.0.0.1".into();
    config.framework.port = Some(framework.port());
    let proxy = common::start_proxy(config).await;

    let res = common::client().get(proxy.url("/foo")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "framework body");
    assert_eq!(log.lock().unwrap()[0].target, "/bar");
}

#[tokio::test]
async fn unmatched_form_post_goes_to_framework() {
    let site = tempfile::tempdir().unwrap();
    let (framework, framework_log) = common::start_fixed_backend("framework").await;
    let (functions, functions_log) = common::start_fixed_backend("function").await;
    let mut config = common::site_config(site.path());
    config.framework.host = "127.0.0.1".into();
    config.framework.port = Some(framework.port());
    config.functions.port = Some(functions.port());
    let proxy = common::start_proxy(config).await;

    let res = common::client()
        .post(proxy.url("/contact"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("name=dev")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "framework");

    let seen = framework_log.lock().unwrap()[0].clone();
    assert_eq!(seen.method, "POST");
    assert_eq!(seen.body, "name=dev");
    assert!(functions_log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn role_gate_covers_redirect_rules() {
    let site = tempfile::tempdir().unwrap();
    write(site.path(), "_redirects", "/members /members-area 302 Role=member\n");
    let proxy = common::start_proxy(common::site_config(site.path())).await;
    let client = common::client();

    let res = client.get(proxy.url("/members")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(res.headers().get("location").is_none());

    let res = client
        .get(proxy.url("/members"))
        .header("cookie", format!("nf_jwt={}", role_token(&["member"])))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers()["location"], "/members-area");
}

#[tokio::test]
async fn static_only_mode_falls_back_to_404_page() {
    let site = tempfile::tempdir().unwrap();
    write(site.path(), "404.html", "custom not found");
    let proxy = common::start_proxy(common::site_config(site.path())).await;

    let res = common::client().get(proxy.url("/nothing/here")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.text().await.unwrap(), "custom not found");
}

#[tokio::test]
async fn canonical_pretty_url_redirect() {
    let site = tempfile::tempdir().unwrap();
    write(site.path(), "docs/index.html", "docs");
    write(site.path(), "about.html", "about");
    let proxy = common::start_proxy(common::site_config(site.path())).await;
    let client = common::client();

    let res = client.get(proxy.url("/docs?tab=1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(res.headers()["location"], "/docs/?tab=1");
    assert_eq!(res.headers()["cache-control"], "public, max-age=0, must-revalidate");

    let res = client.get(proxy.url("/about.html")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "about");
}

#[tokio::test]
async fn header_rules_and_server_header() {
    let site = tempfile::tempdir().unwrap();
    write(site.path(), "index.html", "home");
    write(
        site.path(),
        "_headers",
        "/*\n  X-Frame-Options: DENY\n/index.html\n  Cache-Control: max-age=60\n",
    );
    let proxy = common::start_proxy(common::site_config(site.path())).await;

    let res = common::client().get(proxy.url("/index.html")).send().await.unwrap();
    assert_eq!(res.headers()["server"], "Netlify");
    assert_eq!(res.headers()["x-frame-options"], "DENY");
    assert_eq!(res.headers()["cache-control"], "max-age=60");
}

#[tokio::test]
async fn etag_and_conditional_get() {
    let site = tempfile::tempdir().unwrap();
    write(site.path(), "app.js", "console.log(1)");
    let proxy = common::start_proxy(common::site_config(site.path())).await;
    let client = common::client();

    let res = client.get(proxy.url("/app.js")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let etag = res.headers()["etag"].to_str().unwrap().to_string();
    assert!(etag.starts_with("W/\""));

    let res = client
        .get(proxy.url("/app.js"))
        .header("if-none-match", &etag)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_MODIFIED);
    assert!(res.text().await.unwrap().is_empty());
}

#[tokio::test]
async fn external_proxy_rule() {
    let site = tempfile::tempdir().unwrap();
    let (external, log) = common::start_fixed_backend("external data").await;
    write(
        site.path(),
        "_redirects",
        &format!("/ext/* http://{external}/v1/:splat 200\n"),
    );
    let proxy = common::start_proxy(common::site_config(site.path())).await;

    let res = common::client().get(proxy.url("/ext/items?page=2")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "external data");
    assert_eq!(log.lock().unwrap()[0].target, "/v1/items?page=2");
}

#[tokio::test]
async fn unreachable_upstream_is_502() {
    let site = tempfile::tempdir().unwrap();
    let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = closed.local_addr().unwrap().port();
    drop(closed);

    let mut config = common::site_config(site.path());
    config.framework.host = "127.0.0.1".into();
    config.framework.port = Some(port);
    let proxy = common::start_proxy(config).await;

    let res = common::client().get(proxy.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(res.text().await.unwrap(), "Could not proxy request.");
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let site = tempfile::tempdir().unwrap();
    let mut config = common::site_config(site.path());
    config.limits.max_body_bytes = 16;
    let proxy = common::start_proxy(config).await;

    let res = common::client()
        .post(proxy.url("/upload"))
        .body(vec![b'x'; 64])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
