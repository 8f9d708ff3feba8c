//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request ID, front door handler)
//!     → websocket.rs (upgrades go straight to the framework origin)
//!     → request.rs (buffer body, forwarded headers)
//!     → [dispatch decides the backend]
//!     → response.rs (header rules, server header, ETag)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use request::REQUEST_ID_HEADER;
pub use response::ProxyError;
pub use server::HttpServer;
