//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → DevConfig, overlaid with CLI flags in main.rs
//!
//! Rule files (not the config itself) are hot reloaded:
//!     watcher.rs detects change
//!     → routing::loader rebuilds the table
//!     → atomic swap in RuleStore
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Validation reports every violation, not just the first

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::DevConfig;
pub use validation::{validate_config, ValidationError};
pub use watcher::RuleWatcher;
