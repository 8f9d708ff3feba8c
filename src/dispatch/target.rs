//! The dispatcher's per-request decision.

use std::path::PathBuf;

use axum::http::StatusCode;
use url::Url;

/// Which backend answers a request, and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendTarget {
    /// Serve a file from the publish directory. `status` overrides 200.
    Static {
        file: PathBuf,
        status: Option<StatusCode>,
    },
    /// Forward to the functions runtime.
    Functions { path_and_query: String },
    /// Forward to a registered add-on.
    AddOn { url: Url },
    /// Forward to an absolute URL named by a proxy rule.
    ExternalOrigin { url: Url },
    /// Forward to the framework dev server (or the static server when none
    /// is configured). `status` overrides whatever the upstream returns.
    FrameworkOrigin {
        path_and_query: String,
        status: Option<StatusCode>,
    },
    /// Answer with a redirect.
    Redirect { location: String, status: StatusCode },
    /// Answer with the 404 page.
    NotFound,
}

impl BackendTarget {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            BackendTarget::Static { .. } => "static",
            BackendTarget::Functions { .. } => "functions",
            BackendTarget::AddOn { .. } => "addon",
            BackendTarget::ExternalOrigin { .. } => "external",
            BackendTarget::FrameworkOrigin { .. } => "framework",
            BackendTarget::Redirect { .. } => "redirect",
            BackendTarget::NotFound => "not_found",
        }
    }
}

/// A target plus the headers to add to the forwarded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub target: BackendTarget,
    pub request_headers: Vec<(String, String)>,
}

impl Dispatch {
    pub fn new(target: BackendTarget) -> Self {
        Self {
            target,
            request_headers: Vec::new(),
        }
    }

    pub fn with_headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.request_headers.extend(headers);
        self
    }
}

impl From<BackendTarget> for Dispatch {
    fn from(target: BackendTarget) -> Self {
        Self::new(target)
    }
}
