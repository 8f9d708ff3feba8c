//! Startup orchestration.
//!
//! # Responsibilities
//! - Bind the listening socket
//! - Start the rule watchers that hot-reload redirect and header tables
//!
//! # Design Decisions
//! - Fail fast: a bind failure is the only fatal startup error
//! - A watcher that cannot start is logged; the proxy keeps serving the
//!   rules it loaded

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::config::schema::{AuthConfig, DevConfig};
use crate::config::watcher::RuleWatcher;
use crate::routing::loader::{reload_headers, reload_redirects};
use crate::routing::RuleSet;
use crate::sources::RuleSources;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid bind address {address}: {source}")]
    Address {
        address: String,
        source: std::net::AddrParseError,
    },
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        source: std::io::Error,
    },
}

pub fn bind_address(config: &DevConfig) -> Result<SocketAddr, StartupError> {
    config
        .listener
        .bind_address
        .parse()
        .map_err(|source| StartupError::Address {
            address: config.listener.bind_address.clone(),
            source,
        })
}

pub async fn bind_listener(address: SocketAddr) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind { address, source })
}

/// Watchers for both rule kinds. Dropping them stops hot reload.
pub struct Watchers {
    _redirects: Option<RuleWatcher>,
    _headers: Option<RuleWatcher>,
}

pub fn start_watchers(
    sources: &RuleSources,
    auth: &AuthConfig,
    rules: &RuleSet,
    debounce: Duration,
) -> Watchers {
    let redirects = {
        let sources = sources.clone();
        let auth = auth.clone();
        let store = Arc::clone(&rules.redirects);
        spawn_logged("redirects", &sources.watched_redirect_paths(), debounce, move |_| {
            match reload_redirects(&store, &sources, &auth) {
                Ok(count) => tracing::info!(rules = count, "Reloaded redirect rules"),
                Err(error) => tracing::error!(%error, "Redirect reload failed, keeping previous rules"),
            }
        })
    };

    let headers = {
        let sources = sources.clone();
        let store = Arc::clone(&rules.headers);
        spawn_logged("headers", &sources.watched_header_paths(), debounce, move |_| {
            match reload_headers(&store, &sources) {
                Ok(count) => tracing::info!(rules = count, "Reloaded header rules"),
                Err(error) => tracing::error!(%error, "Header reload failed, keeping previous rules"),
            }
        })
    };

    Watchers {
        _redirects: redirects,
        _headers: headers,
    }
}

fn spawn_logged<F>(
    kind: &'static str,
    paths: &[std::path::PathBuf],
    debounce: Duration,
    on_change: F,
) -> Option<RuleWatcher>
where
    F: Fn(Vec<std::path::PathBuf>) + Send + Sync + 'static,
{
    match RuleWatcher::spawn(paths, debounce, on_change) {
        Ok(watcher) => Some(watcher),
        Err(error) => {
            tracing::error!(kind, %error, "Failed to watch rule files");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let first = bind_listener("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let taken = first.local_addr().unwrap();
        let err = bind_listener(taken).await.unwrap_err();
        assert!(matches!(err, StartupError::Bind { .. }));
    }

    #[test]
    fn bad_address_is_rejected() {
        let mut config = DevConfig::default();
        config.listener.bind_address = "localhost".into();
        assert!(matches!(bind_address(&config), Err(StartupError::Address { .. })));
    }
}
