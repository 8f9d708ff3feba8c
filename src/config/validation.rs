//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ports, debounce)
//! - Check add-on URLs and namespaces
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DevConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use url::Url;

use crate::config::schema::DevConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),
    #[error("{0} must not be 0")]
    ZeroPort(&'static str),
    #[error("addon `{name}` has invalid url `{url}`")]
    AddonUrl { name: String, url: String },
    #[error("addon namespace `{0}` is reserved")]
    ReservedNamespace(String),
    #[error("watch.debounce_ms must be greater than 0")]
    Debounce,
    #[error("limits.max_body_bytes must be greater than 0")]
    BodyLimit,
    #[error("listener.tls requires both cert_path and key_path")]
    Tls,
}

/// Check a configuration, collecting every violation.
pub fn validate_config(config: &DevConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if config.framework.port == Some(0) {
        errors.push(ValidationError::ZeroPort("framework.port"));
    }
    if config.functions.port == Some(0) {
        errors.push(ValidationError::ZeroPort("functions.port"));
    }

    for (name, url) in &config.addons {
        if name == "functions" || name == "builders" {
            errors.push(ValidationError::ReservedNamespace(name.clone()));
        }
        let valid = Url::parse(url)
            .map(|u| u.scheme() == "http" || u.scheme() == "https")
            .unwrap_or(false);
        if !valid {
            errors.push(ValidationError::AddonUrl {
                name: name.clone(),
                url: url.clone(),
            });
        }
    }

    if config.watch.debounce_ms == 0 {
        errors.push(ValidationError::Debounce);
    }
    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::BodyLimit);
    }

    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.is_empty() || tls.key_path.is_empty() {
            errors.push(ValidationError::Tls);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
