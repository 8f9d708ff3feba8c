//! Raw rule records, as produced by the rule file readers.
//!
//! Records are loosely shaped: every field is optional and nothing is
//! validated until the compiler turns them into [`RedirectRule`]s.
//!
//! [`RedirectRule`]: crate::routing::rule::RedirectRule

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

/// Where a record was read from, for warnings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordOrigin {
    pub file: Option<PathBuf>,
    pub line: Option<usize>,
}

impl RecordOrigin {
    pub fn new(file: impl Into<PathBuf>, line: Option<usize>) -> Self {
        Self {
            file: Some(file.into()),
            line,
        }
    }
}

impl fmt::Display for RecordOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "{}:{}", file.display(), line),
            (Some(file), None) => write!(f, "{}", file.display()),
            (None, _) => write!(f, "<inline>"),
        }
    }
}

/// A value that may be written as `"a,b"` or `["a", "b"]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ValueList {
    One(String),
    Many(Vec<String>),
}

impl ValueList {
    /// Split into trimmed, non-empty items.
    pub fn items(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            ValueList::One(value) => value.split(',').collect(),
            ValueList::Many(values) => values.iter().map(String::as_str).collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Join into a single header value.
    pub fn joined(&self) -> String {
        match self {
            ValueList::One(value) => value.clone(),
            ValueList::Many(values) => values.join(", "),
        }
    }
}

/// One redirect/rewrite rule before compilation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RuleRecord {
    pub from: String,
    pub to: Option<String>,
    pub status: Option<u16>,
    pub force: bool,
    pub negative: bool,
    #[serde(alias = "params")]
    pub query: BTreeMap<String, String>,
    pub conditions: BTreeMap<String, ValueList>,
    /// Headers added to the request when it is proxied.
    pub headers: BTreeMap<String, String>,
    /// Request headers that must be present with exactly these values.
    pub match_headers: BTreeMap<String, String>,
    #[serde(skip)]
    pub origin: RecordOrigin,
}

/// One header rule before compilation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HeaderRecord {
    #[serde(rename = "for")]
    pub path: String,
    pub values: BTreeMap<String, ValueList>,
    #[serde(skip)]
    pub origin: RecordOrigin,
}
