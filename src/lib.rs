//! Local development proxy emulating edge routing.
//!
//! Every request is matched against redirect rules loaded from `_redirects`
//! files and a declarative TOML config, then answered by the static publish
//! directory, the framework dev server, the local functions runtime, an
//! add-on, or an external origin.

pub mod config;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;
pub mod sources;
pub mod static_files;

pub use config::DevConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::RuleSet;
pub use sources::RuleSources;
