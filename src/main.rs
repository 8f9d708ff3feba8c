//! Local development proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────┐
//!                         │                    DEV PROXY                      │
//!                         │                                                   │
//!     Browser request     │  ┌─────────┐    ┌──────────┐    ┌────────────┐   │
//!     ────────────────────┼─▶│  http   │───▶│ dispatch │───▶│  routing   │   │
//!                         │  │front    │    │          │◀───│ rule table │◀──┼── _redirects,
//!                         │  │ door    │    └────┬─────┘    └────────────┘   │   netlify.toml
//!                         │  └────┬────┘         │ BackendTarget             │   (watched)
//!                         │       │              ▼                           │
//!     Browser response    │       │      static files │ framework │ functions │
//!     ◀───────────────────┼───────┘      add-ons │ external │ redirect │ 404  │
//!                         │                                                   │
//!                         │  config · lifecycle · observability · net (TLS)  │
//!                         └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use dev_proxy::config::{load_config, validate_config, ConfigError, DevConfig};
use dev_proxy::lifecycle::signals::spawn_signal_handler;
use dev_proxy::lifecycle::{bind_address, bind_listener, start_watchers, Shutdown};
use dev_proxy::net::load_tls_config;
use dev_proxy::observability::{logging, metrics};
use dev_proxy::{HttpServer, RuleSet, RuleSources};

/// Local development server emulating edge redirects, rewrites and headers.
#[derive(Parser, Debug)]
#[command(name = "dev-proxy", version, about)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on.
    #[arg(short, long)]
    port: Option<u16>,

    /// Publish directory with the built site.
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Port of the framework dev server.
    #[arg(long)]
    framework_port: Option<u16>,

    /// Port of the local functions server.
    #[arg(long)]
    functions_port: Option<u16>,

    /// Country code to report for geo conditions.
    #[arg(long)]
    country: Option<String>,
}

impl Cli {
    fn apply(&self, config: &mut DevConfig) {
        if let Some(port) = self.port {
            let host = config
                .listener
                .bind_address
                .rsplit_once(':')
                .map(|(host, _)| host.to_string())
                .unwrap_or_else(|| "127.0.0.1".to_string());
            config.listener.bind_address = format!("{host}:{port}");
        }
        if let Some(dir) = &self.dir {
            config.site.publish_dir = dir.clone();
        }
        if let Some(port) = self.framework_port {
            config.framework.port = Some(port);
        }
        if let Some(port) = self.functions_port {
            config.functions.port = Some(port);
        }
        if let Some(country) = &self.country {
            config.geo.country = Some(country.clone());
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => DevConfig::default(),
    };
    cli.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "dev-proxy starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        publish_dir = %config.site.publish_dir.display(),
        framework = ?config.framework.origin(),
        functions = ?config.functions.origin(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let sources = RuleSources::from_config(&config.site);
    let rules = RuleSet::load(&sources, &config.auth);
    let watchers = start_watchers(
        &sources,
        &config.auth,
        &rules,
        Duration::from_millis(config.watch.debounce_ms),
    );

    let server = HttpServer::new(&config, &rules);
    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());
    let address = bind_address(&config)?;

    match &config.listener.tls {
        Some(tls) => {
            let tls = load_tls_config(tls).await?;
            let handle = axum_server::Handle::new();
            let stop = shutdown.wait();
            let drain = handle.clone();
            let grace = Duration::from_secs(config.limits.request_secs);
            tokio::spawn(async move {
                stop.await;
                drain.graceful_shutdown(Some(grace));
            });
            println!("Server now ready on https://{address}");
            server.run_tls(address, tls, handle).await?;
        }
        None => {
            let listener = bind_listener(address).await?;
            println!("Server now ready on http://{}", listener.local_addr()?);
            server.run(listener, shutdown.wait()).await?;
        }
    }

    drop(watchers);
    tracing::info!("Shutdown complete");
    Ok(())
}
