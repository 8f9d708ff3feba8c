//! Rule compilation.
//!
//! Turns raw [`RuleRecord`]s into a [`CompiledRuleTable`]. Invalid records
//! are dropped with a warning carrying their file and line; they never make
//! the whole table fail. Record order is kept exactly: it is the matching
//! precedence.

use axum::http::StatusCode;
use url::Url;

use crate::routing::pattern::{PathPattern, PatternError};
use crate::routing::record::{RecordOrigin, RuleRecord};
use crate::routing::rule::{
    is_absolute_url, is_redirect_status, Conditions, QueryConstraint, RedirectRule, RuleAction,
};
use crate::routing::table::{CompiledRuleTable, Provenance};

/// Why a single record was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("missing `from`")]
    MissingFrom,
    #[error("invalid `from` url `{0}`")]
    InvalidFrom(String),
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error("`*` must be the last segment of `{0}`")]
    SplatNotLast(String),
    #[error("status {0} requires a `to`")]
    MissingTo(u16),
    #[error("invalid `to` `{0}`")]
    InvalidTo(String),
    #[error("invalid status {0}")]
    InvalidStatus(u16),
    #[error("unknown condition `{0}`")]
    UnknownCondition(String),
    #[error("condition `{0}` has no values")]
    EmptyCondition(String),
}

/// A dropped record and the reason.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{origin}: {reason}")]
pub struct CompileWarning {
    pub origin: RecordOrigin,
    pub reason: RuleError,
}

/// Compile records, in order, into a table.
pub fn compile_rules(
    records: &[RuleRecord],
    provenance: Provenance,
) -> (CompiledRuleTable, Vec<CompileWarning>) {
    let mut rules = Vec::with_capacity(records.len());
    let mut warnings = Vec::new();

    for record in records {
        match compile_record(record) {
            Ok(rule) => rules.push(rule),
            Err(reason) => warnings.push(CompileWarning {
                origin: record.origin.clone(),
                reason,
            }),
        }
    }

    (CompiledRuleTable::new(rules, provenance), warnings)
}

/// Validate and compile a single record.
pub fn compile_record(record: &RuleRecord) -> Result<RedirectRule, RuleError> {
    let from = record.from.trim();
    if from.is_empty() {
        return Err(RuleError::MissingFrom);
    }

    let (scheme, host, path) = if is_absolute_url(from) {
        let url = Url::parse(from).map_err(|_| RuleError::InvalidFrom(from.to_string()))?;
        (
            Some(url.scheme().to_string()),
            url.host_str().map(str::to_ascii_lowercase),
            url.path().to_string(),
        )
    } else {
        (None, None, from.to_string())
    };

    let pattern = PathPattern::parse(&path)?;
    if pattern.has_inner_splat() {
        return Err(RuleError::SplatNotLast(from.to_string()));
    }

    Ok(RedirectRule {
        from: pattern,
        scheme,
        host,
        negative: record.negative,
        force: record.force,
        action: compile_action(record)?,
        conditions: compile_conditions(record)?,
        query: record
            .query
            .iter()
            .map(|(key, value)| match value.strip_prefix(':') {
                Some(name) if !name.is_empty() => QueryConstraint::Capture {
                    key: key.clone(),
                    name: name.to_string(),
                },
                _ => QueryConstraint::Exact {
                    key: key.clone(),
                    value: value.clone(),
                },
            })
            .collect(),
        match_headers: record
            .match_headers
            .iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
            .collect(),
        proxy_headers: record
            .headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect(),
        origin: record.origin.clone(),
    })
}

fn compile_action(record: &RuleRecord) -> Result<RuleAction, RuleError> {
    let to = record
        .to
        .as_deref()
        .map(str::trim)
        .filter(|to| !to.is_empty());

    let Some(to) = to else {
        return match record.status {
            None | Some(404) => Ok(RuleAction::ForceNotFound),
            Some(status) => Err(RuleError::MissingTo(status)),
        };
    };

    let absolute = is_absolute_url(to);
    if absolute {
        Url::parse(to).map_err(|_| RuleError::InvalidTo(to.to_string()))?;
    } else if !to.starts_with('/') {
        return Err(RuleError::InvalidTo(to.to_string()));
    }

    let to = to.to_string();
    match record.status {
        Some(status) if !(200..=599).contains(&status) => Err(RuleError::InvalidStatus(status)),
        Some(status) => {
            let code = StatusCode::from_u16(status).map_err(|_| RuleError::InvalidStatus(status))?;
            if is_redirect_status(status) {
                Ok(RuleAction::Redirect { to, status: code })
            } else {
                Ok(RuleAction::Rewrite {
                    to,
                    status: Some(code),
                })
            }
        }
        None if absolute => Ok(RuleAction::Redirect {
            to,
            status: StatusCode::MOVED_PERMANENTLY,
        }),
        None => Ok(RuleAction::Rewrite { to, status: None }),
    }
}

fn compile_conditions(record: &RuleRecord) -> Result<Conditions, RuleError> {
    let mut conditions = Conditions::default();

    for (key, values) in &record.conditions {
        let items = values.items();
        if items.is_empty() {
            return Err(RuleError::EmptyCondition(key.clone()));
        }
        match key.to_ascii_lowercase().as_str() {
            "role" => {
                // Role values may be written as `:admin`.
                conditions.roles = Some(
                    items
                        .into_iter()
                        .map(|role| role.strip_prefix(':').map(str::to_string).unwrap_or(role))
                        .collect(),
                );
            }
            "country" => {
                conditions.countries = Some(items.iter().map(|c| c.to_ascii_lowercase()).collect());
            }
            "language" => {
                conditions.languages = Some(items.iter().map(|l| l.to_ascii_lowercase()).collect());
            }
            _ => return Err(RuleError::UnknownCondition(key.clone())),
        }
    }

    Ok(conditions)
}
