//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the dev proxy.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the local dev proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DevConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Where the site lives on disk and where rules are read from.
    pub site: SiteConfig,

    /// The user's framework dev server.
    pub framework: FrameworkConfig,

    /// The local functions runtime.
    pub functions: FunctionsConfig,

    /// Add-on namespaces mapped to their base URLs.
    pub addons: BTreeMap<String, String>,

    /// Role gate settings.
    pub auth: AuthConfig,

    /// Simulated geolocation.
    pub geo: GeoConfig,

    /// Request limits.
    pub limits: LimitsConfig,

    /// Rule file watching.
    pub watch: WatchConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8888").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8888".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Site layout on disk.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Static root served for existing files.
    pub publish_dir: PathBuf,

    /// Project root, the second location searched for rule files.
    pub project_dir: PathBuf,

    /// Declarative rule config (`[[redirects]]` / `[[headers]]` tables).
    pub config_path: Option<PathBuf>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            publish_dir: PathBuf::from("."),
            project_dir: PathBuf::from("."),
            config_path: None,
        }
    }
}

/// Framework origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FrameworkConfig {
    /// Host the framework dev server listens on.
    pub host: String,

    /// Port of the framework dev server. `None` runs in static-only mode.
    pub port: Option<u16>,
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: None,
        }
    }
}

impl FrameworkConfig {
    /// Base URL of the framework origin, if one is configured.
    pub fn origin(&self) -> Option<String> {
        let port = self.port?;
        if self.host.contains(':') && !self.host.starts_with('[') {
            // IPv6 literal
            Some(format!("http://[{}]:{}", self.host, port))
        } else {
            Some(format!("http://{}:{}", self.host, port))
        }
    }
}

/// Functions runtime configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FunctionsConfig {
    /// Port of the local functions server.
    pub port: Option<u16>,
}

impl FunctionsConfig {
    /// Base URL of the functions origin, if one is configured.
    pub fn origin(&self) -> Option<String> {
        self.port.map(|port| format!("http://127.0.0.1:{}", port))
    }
}

/// Role gate configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 secret used to verify role tokens. Unverified when absent.
    pub jwt_secret: Option<String>,

    /// Dotted path of the roles array inside the token payload.
    pub jwt_role_path: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_role_path: "app_metadata.authorization.roles".to_string(),
        }
    }
}

/// Simulated geolocation.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GeoConfig {
    /// Country code reported for every request lacking an `nf_country` cookie.
    pub country: Option<String>,
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum buffered request body in bytes.
    pub max_body_bytes: usize,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 6 * 1024 * 1024, // 6MB
            request_secs: 30,
        }
    }
}

/// Rule file watching.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Quiet period before a burst of file events triggers a reload.
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: 300 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
