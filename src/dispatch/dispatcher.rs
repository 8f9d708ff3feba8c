//! Per-request dispatch policy.
//!
//! # Responsibilities
//! - Short-circuit the reserved `/.netlify/` namespace
//! - Match the request against one rule table snapshot
//! - Apply redirects, proxy rules, the role gate and static precedence
//! - Classify the final URL into a [`BackendTarget`]
//!
//! # Design Decisions
//! - Pure decision: no network I/O, only publish-directory lookups, so the
//!   whole policy is testable without sockets
//! - Existing files win over non-forced rules for everything but POST
//! - A failed role gate is a 404, never an error status

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::http::{header, request::Parts, HeaderMap, Method};
use url::Url;

use crate::dispatch::gate::{RoleGate, AUTH_COOKIE};
use crate::dispatch::internal::{
    addon_destination, is_function_path, is_internal, ORIGINAL_PATHNAME_HEADER,
};
use crate::dispatch::target::{BackendTarget, Dispatch};
use crate::routing::matcher::{match_request, MatchResult};
use crate::routing::request::MatchRequest;
use crate::routing::rule::RuleAction;
use crate::routing::table::{CompiledRuleTable, RuleStore};
use crate::static_files::PublishDir;

/// Inputs the dispatcher needs besides the rule table.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub publish: PublishDir,
    /// Scheme the front door is served under.
    pub scheme: String,
    pub functions_enabled: bool,
    pub addons: BTreeMap<String, Url>,
    pub geo_country: Option<String>,
}

pub struct Dispatcher {
    settings: DispatchSettings,
    rules: Arc<RuleStore<CompiledRuleTable>>,
}

impl Dispatcher {
    pub fn new(settings: DispatchSettings, rules: Arc<RuleStore<CompiledRuleTable>>) -> Self {
        Self { settings, rules }
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Decide the backend for a request using the current rule table.
    pub fn dispatch(&self, parts: &Parts) -> Dispatch {
        let table = self.rules.snapshot();
        self.dispatch_with(&table, parts)
    }

    /// Decide the backend for a request against `table`.
    pub fn dispatch_with(&self, table: &CompiledRuleTable, parts: &Parts) -> Dispatch {
        let path = parts.uri.path();
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or(path);

        if let Some(target) = self.internal_target(path, path_and_query) {
            return target.into();
        }

        let request = MatchRequest::from_parts(
            parts,
            &self.settings.scheme,
            self.settings.geo_country.as_deref(),
        );

        let Some(matched) = match_request(table, &request) else {
            return BackendTarget::FrameworkOrigin {
                path_and_query: path_and_query.to_string(),
                status: None,
            }
            .into();
        };

        self.apply_rule(table, parts, &request, path_and_query, matched)
    }

    fn apply_rule(
        &self,
        table: &CompiledRuleTable,
        parts: &Parts,
        request: &MatchRequest,
        path_and_query: &str,
        matched: MatchResult<'_>,
    ) -> Dispatch {
        let rule = matched.rule;

        // Role conditions gate every action, redirects and proxies included.
        if let Some(allowed) = &rule.conditions.roles {
            let provenance = table.provenance();
            let gate = RoleGate::new(provenance.jwt_secret.as_deref(), &provenance.jwt_role_path);
            if !gate.allows(request.cookie(AUTH_COOKIE), allowed) {
                tracing::debug!(path = %request.path, "Role gate denied request");
                return BackendTarget::NotFound.into();
            }
        }

        if let RuleAction::Redirect { status, .. } = &rule.action {
            if let Some(destination) = &matched.destination {
                let location = if rule.is_external() {
                    destination.to_string()
                } else {
                    strip_origin(destination)
                };
                tracing::info!(from = %path_and_query, to = %location, "Redirecting");
                return BackendTarget::Redirect {
                    location,
                    status: *status,
                }
                .into();
            }
        }

        if rule.is_external() {
            if let Some(url) = matched.destination.clone() {
                tracing::info!(to = %url, "Proxying");
                return Dispatch::new(BackendTarget::ExternalOrigin { url })
                    .with_headers(rule.proxy_headers.iter().cloned());
            }
        }

        let explicit_status = match &rule.action {
            RuleAction::ForceNotFound => return BackendTarget::NotFound.into(),
            RuleAction::Rewrite { status, .. } => *status,
            RuleAction::Redirect { .. } => None,
        };

        let static_file = self.settings.publish.resolve(&request.path);
        if let Some(asset) = static_file {
            if !rule.force && parts.method != Method::POST {
                return BackendTarget::Static {
                    file: asset.file,
                    status: None,
                }
                .into();
            }
        }

        let Some(destination) = &matched.destination else {
            return BackendTarget::FrameworkOrigin {
                path_and_query: path_and_query.to_string(),
                status: None,
            }
            .into();
        };
        let destination_pq = path_and_query_of(destination);

        if parts.method == Method::POST
            && self.settings.functions_enabled
            && !is_internal(&request.path)
            && !is_internal(destination.path())
            && is_form_submission(&parts.headers)
        {
            return BackendTarget::Functions {
                path_and_query: path_and_query.to_string(),
            }
            .into();
        }

        if !rule.force {
            let destination_path = urlencoding::decode(destination.path())
                .map(|p| p.into_owned())
                .unwrap_or_else(|_| destination.path().to_string());
            if let Some(asset) = self.settings.publish.resolve(&destination_path) {
                tracing::info!(to = %asset.url_path, "Rewrote URL");
                return BackendTarget::Static {
                    file: asset.file,
                    status: explicit_status,
                }
                .into();
            }
        }

        tracing::info!(to = %destination_pq, "Rewrote URL");
        let proxy_headers = rule.proxy_headers.iter().cloned();
        if is_function_path(destination.path()) && self.settings.functions_enabled {
            return Dispatch::new(BackendTarget::Functions {
                path_and_query: destination_pq,
            })
            .with_headers(proxy_headers)
            .with_headers([(ORIGINAL_PATHNAME_HEADER.to_string(), parts.uri.path().to_string())]);
        }

        if let Some(url) = addon_destination(&destination_pq, &self.settings.addons) {
            return Dispatch::new(BackendTarget::AddOn { url }).with_headers(proxy_headers);
        }

        Dispatch::new(BackendTarget::FrameworkOrigin {
            path_and_query: destination_pq,
            status: explicit_status,
        })
        .with_headers(proxy_headers)
    }

    fn internal_target(&self, path: &str, path_and_query: &str) -> Option<BackendTarget> {
        if !is_internal(path) {
            return None;
        }
        if self.settings.functions_enabled && is_function_path(path) {
            return Some(BackendTarget::Functions {
                path_and_query: path_and_query.to_string(),
            });
        }
        addon_destination(path_and_query, &self.settings.addons).map(|url| BackendTarget::AddOn { url })
    }
}

/// `application/x-www-form-urlencoded` or `multipart/form-data`.
pub fn is_form_submission(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence.ends_with("/x-www-form-urlencoded") || essence == "multipart/form-data"
}

fn path_and_query_of(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

fn strip_origin(url: &Url) -> String {
    let mut location = path_and_query_of(url);
    if let Some(fragment) = url.fragment() {
        location.push('#');
        location.push_str(fragment);
    }
    location
}
