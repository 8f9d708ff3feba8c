//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dev_proxy::config::DevConfig;
use dev_proxy::lifecycle::{start_watchers, Shutdown, Watchers};
use dev_proxy::{HttpServer, RuleSet, RuleSources};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A request as seen by a mock backend.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub type Log = Arc<Mutex<Vec<Recorded>>>;

/// Start a mock backend on an ephemeral port. `respond` maps each request
/// to a status and body.
pub async fn start_backend<F>(respond: F) -> (SocketAddr, Log)
where
    F: Fn(&Recorded) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log: Log = Arc::default();
    let respond = Arc::new(respond);

    let requests = log.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let respond = respond.clone();
            let requests = requests.clone();
            tokio::spawn(async move {
                let _ = serve_one(socket, respond.as_ref(), &requests).await;
            });
        }
    });

    (addr, log)
}

/// A backend that answers `200` with `body` for everything.
pub async fn start_fixed_backend(body: &'static str) -> (SocketAddr, Log) {
    start_backend(move |_| (200, body.to_string())).await
}

async fn serve_one<F>(mut socket: TcpStream, respond: &F, log: &Log) -> std::io::Result<()>
where
    F: Fn(&Recorded) -> (u16, String),
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split(' ');
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(n, v)| (n.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let length: usize = headers
        .iter()
        .find(|(n, _)| n == "content-length")
        .and_then(|(_, v)| v.parse().ok())
        .unwrap_or(0);
    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    let recorded = Recorded {
        method,
        target,
        headers,
        body: String::from_utf8_lossy(&body).to_string(),
    };
    let (status, response_body) = respond(&recorded);
    log.lock().unwrap().push(recorded);

    let response = format!(
        "HTTP/1.1 {status} Mock\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{response_body}",
        response_body.len()
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}

/// A running proxy. Dropping it stops the server and its watchers.
pub struct Proxy {
    pub addr: SocketAddr,
    pub rules: RuleSet,
    shutdown: Shutdown,
    _watchers: Watchers,
}

impl Proxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for Proxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Config serving `site` with everything else at defaults.
pub fn site_config(site: &Path) -> DevConfig {
    let mut config = DevConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.site.publish_dir = site.to_path_buf();
    config.site.project_dir = site.to_path_buf();
    config.watch.debounce_ms = 50;
    config
}

pub async fn start_proxy(config: DevConfig) -> Proxy {
    let sources = RuleSources::from_config(&config.site);
    let rules = RuleSet::load(&sources, &config.auth);
    let watchers = start_watchers(
        &sources,
        &config.auth,
        &rules,
        Duration::from_millis(config.watch.debounce_ms),
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(&config, &rules);
    let shutdown = Shutdown::new();
    let stop = shutdown.wait();
    tokio::spawn(async move {
        let _ = server.run(listener, stop).await;
    });

    Proxy {
        addr,
        rules,
        shutdown,
        _watchers: watchers,
    }
}

/// Client that never follows redirects or uses a system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap()
}

/// Poll `check` until it holds or `timeout` elapses.
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}
