//! HTTP server setup and the front door handler.
//!
//! # Responsibilities
//! - Create the Axum router with middleware (request ID, tracing, timeout)
//! - Send WebSocket upgrades straight to the framework origin
//! - Issue canonical pretty-URL redirects before dispatch
//! - Buffer request bodies, dispatch, and execute the chosen target
//! - Retry pretty-URL alternates when the framework origin answers 404/403
//! - Apply header rules, `server`, ETags and metrics to every response
//!
//! # Design Decisions
//! - Loopback origins (framework, functions) go through the hyper client;
//!   add-ons and external URLs go through reqwest, which handles TLS
//! - No retries on connection errors; the browser gets a 502
//! - Without a framework port the static server stands in for it

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, State},
    http::{header, request::Parts, HeaderName, HeaderValue, Method, Request, Response, StatusCode, Uri},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use url::Url;

use crate::config::DevConfig;
use crate::dispatch::{BackendTarget, Dispatch, DispatchSettings, Dispatcher};
use crate::http::request::{buffer_body, forwarded_headers, is_websocket_upgrade, strip_hop_by_hop, REQUEST_ID_HEADER};
use crate::http::response::{
    apply_header_rules, canonical_redirect, redirect_response, with_etag, ProxyError,
};
use crate::http::websocket;
use crate::observability::metrics;
use crate::routing::{HeaderRuleTable, RuleSet, RuleStore};
use crate::static_files::{alternate_paths, canonical_url_path, render_not_found, serve_file, PublishDir};

/// Shared state of the front door.
pub struct FrontDoor {
    dispatcher: Arc<Dispatcher>,
    headers: Arc<RuleStore<HeaderRuleTable>>,
    client: Client<HttpConnector, Body>,
    external: reqwest::Client,
    framework: Option<String>,
    functions: Option<String>,
    max_body_bytes: usize,
}

/// Per-request context shared by the forwarding helpers.
struct Forward<'a> {
    parts: &'a Parts,
    body: Bytes,
    client_addr: Option<SocketAddr>,
    extra_headers: &'a [(String, String)],
}

impl FrontDoor {
    pub fn new(config: &DevConfig, rules: &RuleSet) -> Self {
        let addons: BTreeMap<String, Url> = config
            .addons
            .iter()
            .filter_map(|(name, url)| match Url::parse(url) {
                Ok(url) => Some((name.clone(), url)),
                Err(e) => {
                    tracing::warn!(addon = %name, error = %e, "Ignoring add-on with invalid URL");
                    None
                }
            })
            .collect();

        let settings = DispatchSettings {
            publish: PublishDir::new(&config.site.publish_dir),
            scheme: if config.listener.tls.is_some() { "https" } else { "http" }.to_string(),
            functions_enabled: config.functions.port.is_some(),
            addons,
            geo_country: config.geo.country.clone(),
        };

        let external = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_default();

        Self {
            dispatcher: Arc::new(Dispatcher::new(settings, Arc::clone(&rules.redirects))),
            headers: Arc::clone(&rules.headers),
            client: Client::builder(TokioExecutor::new()).build(HttpConnector::new()),
            external,
            framework: config.framework.origin(),
            functions: config.functions.origin(),
            max_body_bytes: config.limits.max_body_bytes,
        }
    }

    fn publish(&self) -> &PublishDir {
        &self.dispatcher.settings().publish
    }

    /// Handle one request end to end. Returns the response and the backend
    /// kind for metrics.
    async fn handle(&self, request: Request<Body>) -> (Response<Body>, &'static str) {
        if is_websocket_upgrade(request.headers()) {
            return (
                websocket::forward(self.framework.as_deref(), request).await,
                "websocket",
            );
        }

        let client_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0);
        let (parts, body) = request.into_parts();
        let path = decoded_path(&parts.uri);
        let request_id = parts
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();

        if parts.method == Method::GET {
            if let Some(location) = self.canonical_location(&path, &parts.uri) {
                let response = canonical_redirect(&location);
                return (self.finalize(response, &parts, &path).await, "redirect");
            }
        }

        let body = match buffer_body(&parts.method, body, self.max_body_bytes).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Request body rejected");
                let response = ProxyError::BodyTooLarge(self.max_body_bytes).into_response();
                return (self.finalize(response, &parts, &path).await, "rejected");
            }
        };

        // Dispatch stats the publish directory, so it runs off the reactor.
        let dispatcher = Arc::clone(&self.dispatcher);
        let decided = tokio::task::spawn_blocking(move || {
            let dispatch = dispatcher.dispatch(&parts);
            (parts, dispatch)
        })
        .await;
        let (
            parts,
            Dispatch {
                target,
                request_headers,
            },
        ) = match decided {
            Ok(decided) => decided,
            Err(e) => {
                tracing::error!(request_id = %request_id, error = %e, path = %path, "Dispatch task failed");
                let mut response = Response::new(Body::empty());
                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                return (response, "error");
            }
        };
        let kind = target.kind();
        tracing::debug!(request_id = %request_id, backend = kind, path = %path, "Dispatched");

        let forward = Forward {
            parts: &parts,
            body,
            client_addr,
            extra_headers: &request_headers,
        };
        let response = match self.execute(target, &forward).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    request_id = %request_id,
                    error = %e,
                    path = %path,
                    backend = kind,
                    "Could not proxy request"
                );
                e.into_response()
            }
        };

        (self.finalize(response, &parts, &path).await, kind)
    }

    async fn execute(&self, target: BackendTarget, forward: &Forward<'_>) -> Result<Response<Body>, ProxyError> {
        match target {
            BackendTarget::Redirect { location, status } => Ok(redirect_response(status, &location)),
            BackendTarget::NotFound => Ok(render_not_found(self.publish().root()).await),
            BackendTarget::Static { file, status } => {
                Ok(self.serve_static(&file, status.unwrap_or(StatusCode::OK)).await)
            }
            BackendTarget::Functions { path_and_query } => match &self.functions {
                Some(base) => self.forward_local(base, &path_and_query, forward).await,
                None => Ok(render_not_found(self.publish().root()).await),
            },
            BackendTarget::AddOn { url } | BackendTarget::ExternalOrigin { url } => {
                self.forward_external(url, forward).await
            }
            BackendTarget::FrameworkOrigin {
                path_and_query,
                status,
            } => self.framework_origin(&path_and_query, status, forward).await,
        }
    }

    async fn framework_origin(
        &self,
        path_and_query: &str,
        status: Option<StatusCode>,
        forward: &Forward<'_>,
    ) -> Result<Response<Body>, ProxyError> {
        let Some(base) = &self.framework else {
            return Ok(self.static_only(path_and_query, status).await);
        };

        let mut response = self.forward_local(base, path_and_query, forward).await?;
        if is_missing(response.status()) {
            let (path, query) = split_query(path_and_query);
            for alternate in alternate_paths(path) {
                let candidate = format!("{alternate}{query}");
                tracing::debug!(to = %candidate, "Retrying alternate path");
                response = self.forward_local(base, &candidate, forward).await?;
                if !is_missing(response.status()) {
                    break;
                }
            }
            // A rule with an explicit status keeps the upstream body.
            if is_missing(response.status()) && status.is_none() {
                return Ok(render_not_found(self.publish().root()).await);
            }
        }

        if let Some(status) = status {
            *response.status_mut() = status;
        }
        Ok(response)
    }

    /// The framework origin role played by the publish directory.
    async fn static_only(&self, path_and_query: &str, status: Option<StatusCode>) -> Response<Body> {
        let (path, _) = split_query(path_and_query);
        let path = urlencoding::decode(path)
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| path.to_string());
        match self.publish().resolve(&path) {
            Some(asset) => self.serve_static(&asset.file, status.unwrap_or(StatusCode::OK)).await,
            None => render_not_found(self.publish().root()).await,
        }
    }

    async fn serve_static(&self, file: &std::path::Path, status: StatusCode) -> Response<Body> {
        match serve_file(file, status).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, file = %file.display(), "Failed to read static file");
                render_not_found(self.publish().root()).await
            }
        }
    }

    async fn forward_local(
        &self,
        base: &str,
        path_and_query: &str,
        forward: &Forward<'_>,
    ) -> Result<Response<Body>, ProxyError> {
        let uri: Uri = format!("{base}{path_and_query}").parse()?;
        let mut builder = Request::builder()
            .method(forward.parts.method.clone())
            .uri(uri);
        if let Some(headers) = builder.headers_mut() {
            *headers = forwarded_headers(
                &forward.parts.headers,
                forward.client_addr,
                forward.extra_headers,
                true,
            );
        }
        let request = builder.body(Body::from(forward.body.clone()))?;

        let response = self.client.request(request).await?;
        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }

    async fn forward_external(&self, url: Url, forward: &Forward<'_>) -> Result<Response<Body>, ProxyError> {
        let headers = forwarded_headers(
            &forward.parts.headers,
            forward.client_addr,
            forward.extra_headers,
            false,
        );
        let upstream = self
            .external
            .request(forward.parts.method.clone(), url)
            .headers(headers)
            .body(forward.body.clone())
            .send()
            .await?;

        let status = upstream.status();
        let mut headers = upstream.headers().clone();
        strip_hop_by_hop(&mut headers);

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }

    /// Location for a GET that reached an HTML file through an alternate
    /// under a different canonical path.
    fn canonical_location(&self, path: &str, uri: &Uri) -> Option<String> {
        let asset = self.publish().resolve(path)?;
        if asset.url_path == path {
            return None;
        }
        let canonical = canonical_url_path(&asset.url_path)?;
        if canonical == path {
            return None;
        }
        Some(match uri.query() {
            Some(query) => format!("{canonical}?{query}"),
            None => canonical,
        })
    }

    async fn finalize(&self, response: Response<Body>, parts: &Parts, path: &str) -> Response<Body> {
        let mut response = response;
        let rules = self.headers.snapshot().headers_for_path(path);
        apply_header_rules(response.headers_mut(), &rules);
        response
            .headers_mut()
            .insert(header::SERVER, HeaderValue::from_static("Netlify"));

        with_etag(
            response,
            &parts.method,
            parts.headers.get(header::IF_NONE_MATCH),
            self.max_body_bytes,
        )
        .await
    }
}

fn is_missing(status: StatusCode) -> bool {
    status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN
}

fn split_query(path_and_query: &str) -> (&str, &str) {
    match path_and_query.find('?') {
        Some(index) => path_and_query.split_at(index),
        None => (path_and_query, ""),
    }
}

fn decoded_path(uri: &Uri) -> String {
    urlencoding::decode(uri.path())
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| uri.path().to_string())
}

/// HTTP server for the dev proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &DevConfig, rules: &RuleSet) -> Self {
        let state = Arc::new(FrontDoor::new(config, rules));
        let router = Self::build_router(config, state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &DevConfig, state: Arc<FrontDoor>) -> Router {
        let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.limits.request_secs)))
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve plain HTTP on `listener` until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS on `addr` until `handle` is told to shut down.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: axum_server::tls_rustls::RustlsConfig,
        handle: axum_server::Handle,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, "HTTPS server starting");
        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service_with_connect_info::<SocketAddr>())
            .await?;
        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

async fn proxy_handler(State(state): State<Arc<FrontDoor>>, request: Request<Body>) -> Response<Body> {
    let start = Instant::now();
    let (response, kind) = state.handle(request).await;
    metrics::record_request(kind, response.status().as_u16(), start.elapsed());
    response
}
