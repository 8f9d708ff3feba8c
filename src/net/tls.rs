//! TLS for the listener.

use std::io;
use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

use crate::config::schema::TlsConfig;

/// Load the certificate chain and key named by `tls`.
pub async fn load_tls_config(tls: &TlsConfig) -> io::Result<RustlsConfig> {
    let cert = Path::new(&tls.cert_path);
    let key = Path::new(&tls.key_path);
    for (what, path) in [("certificate", cert), ("private key", key)] {
        if !path.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("TLS {what} not found: {}", path.display()),
            ));
        }
    }
    RustlsConfig::from_pem_file(cert, key).await
}
