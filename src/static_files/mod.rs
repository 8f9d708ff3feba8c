//! Static asset subsystem.
//!
//! # Data Flow
//! ```text
//! decoded URL path
//!     → resolver.rs (literal path, then pretty-URL alternates)
//!     → StaticAsset or None
//!     → serve.rs (file response, 404 page)
//! ```

pub mod resolver;
pub mod serve;

pub use resolver::{alternate_paths, canonical_url_path, PublishDir, StaticAsset};
pub use serve::{render_not_found, serve_file};
