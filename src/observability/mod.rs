//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Front door, dispatcher, rule loader produce:
//!     → logging.rs (tracing subscriber, env filter)
//!     → metrics.rs (counters, histograms, Prometheus exporter)
//! ```
//!
//! # Design Decisions
//! - Request ID (`x-nf-request-id`) is a field on front door events
//! - Metrics are opt-in; logging is always on

pub mod logging;
pub mod metrics;
