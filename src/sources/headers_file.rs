//! Plain `_headers` file parser.
//!
//! ```text
//! /path/*
//!   X-Frame-Options: DENY
//!   Cache-Control: no-cache
//! ```
//! A path line starts in column zero; header lines are indented.

use std::path::Path;

use crate::routing::record::{HeaderRecord, RecordOrigin, ValueList};
use crate::sources::{Loaded, SourceError};

pub fn parse(path: &Path, content: &str) -> Loaded<HeaderRecord> {
    let mut loaded = Loaded::default();
    let mut current: Option<HeaderRecord> = None;

    let line_error = |line: usize, message: String| SourceError::Line {
        path: path.to_path_buf(),
        line,
        message,
    };

    for (index, line) in content.lines().enumerate() {
        let number = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let indented = line.starts_with(char::is_whitespace);
        if !indented {
            if let Some(done) = current.take() {
                loaded.records.push(done);
            }
            current = Some(HeaderRecord {
                path: trimmed.to_string(),
                origin: RecordOrigin::new(path, Some(number)),
                ..HeaderRecord::default()
            });
            continue;
        }

        let Some(record) = current.as_mut() else {
            loaded
                .errors
                .push(line_error(number, "header line without a path".to_string()));
            continue;
        };

        let Some((name, value)) = trimmed.split_once(':') else {
            loaded
                .errors
                .push(line_error(number, format!("expected `Name: value`, got `{trimmed}`")));
            continue;
        };
        let (name, value) = (name.trim(), value.trim());
        if name.is_empty() || value.is_empty() {
            loaded
                .errors
                .push(line_error(number, format!("header `{name}` has no value")));
            continue;
        }

        let entry = record
            .values
            .entry(name.to_string())
            .or_insert_with(|| ValueList::Many(Vec::new()));
        if let ValueList::Many(values) = entry {
            values.push(value.to_string());
        }
    }

    if let Some(done) = current {
        loaded.records.push(done);
    }
    loaded
}
