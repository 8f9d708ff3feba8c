//! Routing subsystem: redirect rules and header rules.
//!
//! # Data Flow
//! ```text
//! Rule compilation (startup and every watched file change):
//!     RuleRecord[] (sources::*)
//!     → compiler.rs (validate, build patterns, classify action)
//!     → CompiledRuleTable (immutable)
//!     → table.rs RuleStore (atomic swap)
//!
//! Per request:
//!     request.rs MatchRequest (host, decoded path, headers, cookies)
//!     → matcher.rs (first match wins, conditions, substitution)
//!     → MatchResult or None
//! ```
//!
//! # Design Decisions
//! - Tables are compiled once and never mutated
//! - File order is the only precedence
//! - Invalid records are dropped with a warning, never fatal

pub mod compiler;
pub mod headers;
pub mod loader;
pub mod matcher;
pub mod pattern;
pub mod record;
pub mod request;
pub mod rule;
pub mod table;

pub use compiler::{compile_rules, CompileWarning, RuleError};
pub use headers::HeaderRuleTable;
pub use loader::RuleSet;
pub use matcher::{match_request, MatchResult};
pub use pattern::{Captures, PathPattern};
pub use request::MatchRequest;
pub use rule::{RedirectRule, RuleAction};
pub use table::{CompiledRuleTable, Provenance, RuleStore};
