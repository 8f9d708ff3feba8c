//! Response header rules.
//!
//! An ordered list of `(pattern, headers)` pairs sharing the redirect path
//! primitive. Every matching rule contributes; later rules override earlier
//! values for the same header name.

use crate::routing::compiler::{CompileWarning, RuleError};
use crate::routing::pattern::PathPattern;
use crate::routing::record::HeaderRecord;

#[derive(Debug, Clone)]
pub struct HeaderRule {
    pub pattern: PathPattern,
    pub values: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default)]
pub struct HeaderRuleTable {
    rules: Vec<HeaderRule>,
}

impl HeaderRuleTable {
    pub fn rules(&self) -> &[HeaderRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Headers for `path`, merged across all matching rules.
    pub fn headers_for_path(&self, path: &str) -> Vec<(String, String)> {
        let mut merged: Vec<(String, String)> = Vec::new();
        for rule in self.rules.iter().filter(|r| r.pattern.matches(path).is_some()) {
            for (name, value) in &rule.values {
                match merged.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
                    Some(existing) => existing.1 = value.clone(),
                    None => merged.push((name.clone(), value.clone())),
                }
            }
        }
        merged
    }
}

/// Compile header records; invalid ones are dropped with a warning.
pub fn compile_headers(records: &[HeaderRecord]) -> (HeaderRuleTable, Vec<CompileWarning>) {
    let mut rules = Vec::new();
    let mut warnings = Vec::new();

    for record in records {
        match PathPattern::parse(record.path.trim()) {
            Ok(pattern) => rules.push(HeaderRule {
                pattern,
                values: record
                    .values
                    .iter()
                    .map(|(name, value)| (name.clone(), value.joined()))
                    .collect(),
            }),
            Err(err) => warnings.push(CompileWarning {
                origin: record.origin.clone(),
                reason: RuleError::Pattern(err),
            }),
        }
    }

    (HeaderRuleTable { rules }, warnings)
}
