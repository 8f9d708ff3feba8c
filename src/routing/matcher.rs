//! Rule matching.
//!
//! # Responsibilities
//! - Walk the table in file order and return the first matching rule
//! - Test the path pattern (optionally inverted), then the conditions
//! - Substitute placeholders into `to` for the winner only
//!
//! # Design Decisions
//! - Pure first-match-wins: position is the only precedence
//! - No backtracking once a rule has matched
//! - Conditions combine with AND semantics

use url::Url;

use crate::routing::pattern::Captures;
use crate::routing::request::MatchRequest;
use crate::routing::rule::{QueryConstraint, RedirectRule};
use crate::routing::table::CompiledRuleTable;

/// The winning rule with its destination resolved.
#[derive(Debug, Clone)]
pub struct MatchResult<'t> {
    pub rule: &'t RedirectRule,
    pub captures: Captures,
    /// `to` with placeholders and splat substituted.
    pub to: Option<String>,
    /// `to` resolved against the request origin, query passed through.
    pub destination: Option<Url>,
}

/// Find the first rule in `table` matching `request`.
pub fn match_request<'t>(
    table: &'t CompiledRuleTable,
    request: &MatchRequest,
) -> Option<MatchResult<'t>> {
    table.rules().iter().find_map(|rule| {
        let captures = path_test(rule, request)?;
        let captures = condition_test(rule, request, captures)?;
        Some(resolve(rule, request, captures))
    })
}

fn path_test(rule: &RedirectRule, request: &MatchRequest) -> Option<Captures> {
    if let Some(host) = &rule.host {
        if !host.eq_ignore_ascii_case(&request.host) {
            return None;
        }
    }
    if let Some(scheme) = &rule.scheme {
        if !scheme.eq_ignore_ascii_case(&request.scheme) {
            return None;
        }
    }

    let matched = rule.from.matches(&request.path);
    if rule.negative {
        match matched {
            Some(_) => None,
            None => Some(Captures::default()),
        }
    } else {
        matched
    }
}

fn condition_test(
    rule: &RedirectRule,
    request: &MatchRequest,
    mut captures: Captures,
) -> Option<Captures> {
    let conditions = &rule.conditions;

    if let Some(countries) = &conditions.countries {
        let country = request.country();
        if !countries.iter().any(|c| c.eq_ignore_ascii_case(country)) {
            return None;
        }
    }

    if let Some(languages) = &conditions.languages {
        let language = request.language();
        if !languages.iter().any(|l| l.eq_ignore_ascii_case(language)) {
            return None;
        }
    }

    if let (Some(allowed), Some(presented)) = (&conditions.roles, &request.roles) {
        if !presented.iter().any(|role| allowed.contains(role)) {
            return None;
        }
    }

    for constraint in &rule.query {
        match constraint {
            QueryConstraint::Exact { key, value } => {
                if request.query_value(key).as_deref() != Some(value.as_str()) {
                    return None;
                }
            }
            QueryConstraint::Capture { key, name } => {
                let value = request.query_value(key)?;
                captures.bind(name.clone(), value);
            }
        }
    }

    for (name, value) in &rule.match_headers {
        if request.header(name) != Some(value.as_str()) {
            return None;
        }
    }

    Some(captures)
}

fn resolve<'t>(rule: &'t RedirectRule, request: &MatchRequest, captures: Captures) -> MatchResult<'t> {
    let to = rule.to().map(|template| captures.substitute(template));
    let destination = to.as_deref().and_then(|to| request.destination(to));
    MatchResult {
        rule,
        captures,
        to,
        destination,
    }
}
