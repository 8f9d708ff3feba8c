//! `[[redirects]]` and `[[headers]]` tables of the declarative config.
//!
//! Other sections of the file are ignored.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::routing::record::{HeaderRecord, RecordOrigin, RuleRecord};
use crate::sources::{Loaded, SourceError};

/// Records of both tables. Entries that fail to deserialize are reported in
/// the `errors` of their table and skipped.
#[derive(Debug, Default)]
pub struct DeclarativeRules {
    pub redirects: Loaded<RuleRecord>,
    pub headers: Loaded<HeaderRecord>,
}

/// Parse the config. Only a TOML syntax error fails the whole file.
pub fn parse(path: &Path, content: &str) -> Result<DeclarativeRules, SourceError> {
    let document: toml::Table = content.parse().map_err(|source| SourceError::Toml {
        path: path.to_path_buf(),
        source,
    })?;

    let mut rules = DeclarativeRules {
        redirects: entries(path, &document, "redirects"),
        headers: entries(path, &document, "headers"),
    };
    for record in &mut rules.redirects.records {
        record.origin = RecordOrigin::new(path, None);
    }
    for record in &mut rules.headers.records {
        record.origin = RecordOrigin::new(path, None);
    }
    Ok(rules)
}

fn entries<T: DeserializeOwned>(path: &Path, document: &toml::Table, table: &'static str) -> Loaded<T> {
    let mut loaded = Loaded { records: Vec::new(), errors: Vec::new() };
    let Some(value) = document.get(table) else {
        return loaded;
    };
    let Some(items) = value.as_array() else {
        loaded.errors.push(SourceError::Record {
            path: path.to_path_buf(),
            table,
            index: 0,
            message: "expected an array of tables".to_string(),
        });
        return loaded;
    };

    for (index, item) in items.iter().enumerate() {
        match item.clone().try_into::<T>() {
            Ok(record) => loaded.records.push(record),
            Err(e) => loaded.errors.push(SourceError::Record {
                path: path.to_path_buf(),
                table,
                index,
                message: e.message().to_string(),
            }),
        }
    }
    loaded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::record::ValueList;

    #[test]
    fn reads_redirects_and_headers() {
        let content = r#"
[build]
publish = "dist"

[[redirects]]
from = "/api/*"
to = "/.netlify/functions/:splat"
status = 200

[[redirects]]
from = "/admin/*"
to = "/admin/:splat"
status = 200
force = true
conditions = { Role = ["admin", "editor"] }
headers = { X-From = "dev" }

[[redirects]]
from = "/search"
to = "/results/:q"
query = { q = ":q" }

[[headers]]
for = "/*"
[headers.values]
X-Frame-Options = "DENY"
Cache-Control = ["no-cache", "no-store"]
"#;
        let rules = parse(Path::new("netlify.toml"), content).unwrap();
        assert!(rules.redirects.errors.is_empty());
        let (redirects, headers) = (rules.redirects.records, rules.headers.records);

        assert_eq!(redirects.len(), 3);
        assert_eq!(redirects[0].status, Some(200));
        assert!(redirects[1].force);
        assert_eq!(
            redirects[1].conditions["Role"],
            ValueList::Many(vec!["admin".into(), "editor".into()])
        );
        assert_eq!(redirects[1].headers["X-From"], "dev");
        assert_eq!(redirects[2].query["q"], ":q");
        assert_eq!(redirects[2].origin.to_string(), "netlify.toml");

        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].path, "/*");
        assert_eq!(headers[0].values["Cache-Control"].joined(), "no-cache, no-store");
    }

    #[test]
    fn empty_config_has_no_rules() {
        let rules = parse(Path::new("netlify.toml"), "").unwrap();
        assert!(rules.redirects.records.is_empty());
        assert!(rules.headers.records.is_empty());
    }

    #[test]
    fn bad_entry_is_skipped_alone() {
        let content = r#"
[[redirects]]
from = "/good"
to = "/target"

[[redirects]]
from = "/bad"
to = "/target"
status = "oops"

[[headers]]
for = "/*"
[headers.values]
X-Frame-Options = "DENY"
"#;
        let rules = parse(Path::new("netlify.toml"), content).unwrap();

        assert_eq!(rules.redirects.records.len(), 1);
        assert_eq!(rules.redirects.records[0].from, "/good");
        assert_eq!(rules.redirects.errors.len(), 1);
        let message = rules.redirects.errors[0].to_string();
        assert!(message.contains("redirects[1]"), "{message}");
        assert_eq!(rules.headers.records.len(), 1);
    }

    #[test]
    fn syntax_error_fails_the_file() {
        let err = parse(Path::new("netlify.toml"), "[[redirects]\n").unwrap_err();
        assert!(matches!(err, SourceError::Toml { .. }));
    }
}
