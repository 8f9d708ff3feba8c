//! Building rule tables from their sources and swapping them in.
//!
//! # Responsibilities
//! - Read records through [`RuleSources`] and compile them
//! - Log every dropped line and record with its file/line
//! - Replace the active table only when the sources could be read

use std::sync::Arc;

use crate::config::schema::AuthConfig;
use crate::observability::metrics;
use crate::routing::compiler::compile_rules;
use crate::routing::headers::{compile_headers, HeaderRuleTable};
use crate::routing::table::{CompiledRuleTable, Provenance, RuleStore};
use crate::sources::{RuleSources, SourceError};

/// Compile the redirect table from every source.
pub fn load_redirect_table(
    sources: &RuleSources,
    auth: &AuthConfig,
) -> Result<CompiledRuleTable, SourceError> {
    let loaded = sources.load_redirects()?;
    for error in &loaded.errors {
        tracing::warn!(%error, "Skipping invalid redirect line");
    }

    let provenance = Provenance {
        sources: sources
            .watched_redirect_paths()
            .into_iter()
            .filter(|path| path.is_file())
            .collect(),
        jwt_secret: auth.jwt_secret.clone(),
        jwt_role_path: auth.jwt_role_path.clone(),
    };

    let (table, warnings) = compile_rules(&loaded.records, provenance);
    for warning in &warnings {
        tracing::warn!(%warning, "Skipping invalid redirect rule");
    }
    Ok(table)
}

/// Compile the header table from every source.
pub fn load_header_table(sources: &RuleSources) -> Result<HeaderRuleTable, SourceError> {
    let loaded = sources.load_headers()?;
    for error in &loaded.errors {
        tracing::warn!(%error, "Skipping invalid header line");
    }

    let (table, warnings) = compile_headers(&loaded.records);
    for warning in &warnings {
        tracing::warn!(%warning, "Skipping invalid header rule");
    }
    Ok(table)
}

/// Reload redirects into `store`. On failure the previous table stays active.
pub fn reload_redirects(
    store: &RuleStore<CompiledRuleTable>,
    sources: &RuleSources,
    auth: &AuthConfig,
) -> Result<usize, SourceError> {
    let result = load_redirect_table(sources, auth);
    metrics::record_rule_reload("redirects", result.is_ok());
    let table = result?;
    let count = table.len();
    store.replace(table);
    Ok(count)
}

/// Reload header rules into `store`. On failure the previous table stays active.
pub fn reload_headers(
    store: &RuleStore<HeaderRuleTable>,
    sources: &RuleSources,
) -> Result<usize, SourceError> {
    let result = load_header_table(sources);
    metrics::record_rule_reload("headers", result.is_ok());
    let table = result?;
    let count = table.len();
    store.replace(table);
    Ok(count)
}

/// The two live rule stores shared by the front door and the watchers.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub redirects: Arc<RuleStore<CompiledRuleTable>>,
    pub headers: Arc<RuleStore<HeaderRuleTable>>,
}

impl RuleSet {
    /// Initial load. Unreadable sources start with an empty table.
    pub fn load(sources: &RuleSources, auth: &AuthConfig) -> Self {
        let set = Self::default();
        match reload_redirects(&set.redirects, sources, auth) {
            Ok(count) => tracing::info!(rules = count, "Loaded redirect rules"),
            Err(error) => tracing::error!(%error, "Failed to load redirect rules"),
        }
        match reload_headers(&set.headers, sources) {
            Ok(count) => tracing::info!(rules = count, "Loaded header rules"),
            Err(error) => tracing::error!(%error, "Failed to load header rules"),
        }
        set
    }
}
