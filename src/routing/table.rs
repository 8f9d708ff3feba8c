//! Immutable rule table snapshots and the store that swaps them.
//!
//! # Design Decisions
//! - Tables are never edited in place; a reload builds a new one
//! - The store is a single `ArcSwap`, so readers never lock
//! - A request loads the current snapshot once and keeps it to the end

use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::routing::rule::RedirectRule;

/// What a table was built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Provenance {
    /// Rule files that existed when the table was compiled.
    pub sources: Vec<PathBuf>,
    /// HS256 secret for role tokens at compile time.
    pub jwt_secret: Option<String>,
    /// Dotted path of the roles array in role tokens.
    pub jwt_role_path: String,
}

/// An ordered, immutable sequence of rules.
#[derive(Debug, Clone, Default)]
pub struct CompiledRuleTable {
    rules: Vec<RedirectRule>,
    provenance: Provenance,
}

impl CompiledRuleTable {
    pub fn new(rules: Vec<RedirectRule>, provenance: Provenance) -> Self {
        Self { rules, provenance }
    }

    pub fn rules(&self) -> &[RedirectRule] {
        &self.rules
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Holds the active snapshot of some immutable table.
#[derive(Debug)]
pub struct RuleStore<T> {
    current: ArcSwap<T>,
}

impl<T> RuleStore<T> {
    pub fn new(initial: T) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
        }
    }

    /// The current snapshot. Later swaps do not affect it.
    pub fn snapshot(&self) -> Arc<T> {
        self.current.load_full()
    }

    /// Atomically replace the active table.
    pub fn replace(&self, next: T) {
        self.current.store(Arc::new(next));
    }
}

impl<T: Default> Default for RuleStore<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
