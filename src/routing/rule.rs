//! Compiled redirect rules.

use axum::http::StatusCode;

use crate::routing::pattern::PathPattern;
use crate::routing::record::RecordOrigin;

/// What a rule does once it matched.
///
/// Rule records are loosely shaped; the compiler validates them once and
/// produces exactly one of these, so the matcher never inspects raw fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleAction {
    /// Serve `to` under the original URL. `status` is `Some` only when the
    /// rule declared one, in which case it overrides the upstream status.
    Rewrite {
        to: String,
        status: Option<StatusCode>,
    },
    /// Send the client to `to`.
    Redirect { to: String, status: StatusCode },
    /// Answer with the 404 page, no destination.
    ForceNotFound,
}

/// One query-string constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryConstraint {
    /// The key must be present with exactly this value.
    Exact { key: String, value: String },
    /// The key must be present; its value is bound as `name`.
    Capture { key: String, name: String },
}

/// Role/Country/Language conditions. `None` means unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conditions {
    pub roles: Option<Vec<String>>,
    pub countries: Option<Vec<String>>,
    pub languages: Option<Vec<String>>,
}

/// A validated, immutable rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectRule {
    pub from: PathPattern,
    /// Scheme and host from a fully qualified `from`.
    pub scheme: Option<String>,
    pub host: Option<String>,
    pub negative: bool,
    pub force: bool,
    pub action: RuleAction,
    pub conditions: Conditions,
    pub query: Vec<QueryConstraint>,
    /// Lowercased header names with required values.
    pub match_headers: Vec<(String, String)>,
    /// Headers added to the proxied request.
    pub proxy_headers: Vec<(String, String)>,
    pub origin: RecordOrigin,
}

impl RedirectRule {
    /// The `to` template, if the rule has one.
    pub fn to(&self) -> Option<&str> {
        match &self.action {
            RuleAction::Rewrite { to, .. } | RuleAction::Redirect { to, .. } => Some(to),
            RuleAction::ForceNotFound => None,
        }
    }

    /// True when `to` names an absolute `http(s)://` URL.
    pub fn is_external(&self) -> bool {
        self.to().is_some_and(is_absolute_url)
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self.action, RuleAction::Redirect { .. })
    }
}

pub(crate) fn is_absolute_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// `300..=400` is treated as a redirect, matching the emulated edge.
pub(crate) fn is_redirect_status(status: u16) -> bool {
    (300..=400).contains(&status)
}
