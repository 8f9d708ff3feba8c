//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! request parts
//!     → internal.rs (reserved /.netlify/ namespace short-circuit)
//!     → routing::matcher (first matching rule)
//!     → gate.rs (role token check for Role conditions)
//!     → static_files::resolver (existing-file precedence)
//!     → target.rs BackendTarget
//! ```

pub mod dispatcher;
pub mod gate;
pub mod internal;
pub mod target;

pub use dispatcher::{is_form_submission, DispatchSettings, Dispatcher};
pub use target::{BackendTarget, Dispatch};
