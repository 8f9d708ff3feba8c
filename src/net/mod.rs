//! Network layer subsystem.
//!
//! # Design Decisions
//! - Plain HTTP binds through `tokio::net::TcpListener` in `lifecycle::startup`
//! - TLS is optional and terminated by `axum-server` with rustls

pub mod tls;

pub use tls::load_tls_config;
