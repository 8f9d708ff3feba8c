//! Plain `_redirects` file parser.
//!
//! One rule per line:
//! ```text
//! [!]FROM [key=value ...] [TO] [STATUS[!]] [Condition=v1,v2 ...]
//! ```
//! Blank lines and `#` comments are skipped.

use std::path::Path;

use crate::routing::record::{RecordOrigin, RuleRecord, ValueList};
use crate::sources::{Loaded, SourceError};

pub fn parse(path: &Path, content: &str) -> Loaded<RuleRecord> {
    let mut loaded = Loaded::default();

    for (index, line) in content.lines().enumerate() {
        let number = index + 1;
        let tokens: Vec<&str> = line
            .split_whitespace()
            .take_while(|token| !token.starts_with('#'))
            .collect();
        if tokens.is_empty() {
            continue;
        }

        match parse_line(&tokens) {
            Ok(mut record) => {
                record.origin = RecordOrigin::new(path, Some(number));
                loaded.records.push(record);
            }
            Err(message) => loaded.errors.push(SourceError::Line {
                path: path.to_path_buf(),
                line: number,
                message,
            }),
        }
    }

    loaded
}

fn parse_line(tokens: &[&str]) -> Result<RuleRecord, String> {
    let mut record = RuleRecord::default();

    let (from, rest) = tokens
        .split_first()
        .ok_or_else(|| "empty rule".to_string())?;
    match from.strip_prefix('!') {
        Some(inverted) => {
            record.negative = true;
            record.from = inverted.to_string();
        }
        None => record.from = from.to_string(),
    }

    let mut rest = rest.iter().copied().peekable();

    // Query constraints sit between FROM and TO.
    while let Some(token) = rest.peek().copied() {
        if is_status(token) || is_destination(token) {
            break;
        }
        let (key, value) = token
            .split_once('=')
            .ok_or_else(|| format!("unexpected token `{token}`"))?;
        record.query.insert(key.to_string(), value.to_string());
        rest.next();
    }

    if let Some(token) = rest.peek().copied() {
        if is_destination(token) {
            record.to = Some(token.to_string());
            rest.next();
        }
    }

    if let Some(token) = rest.peek().copied() {
        if is_status(token) {
            let (code, force) = match token.strip_suffix('!') {
                Some(code) => (code, true),
                None => (token, false),
            };
            let status = code
                .parse::<u16>()
                .map_err(|_| format!("invalid status `{token}`"))?;
            record.status = Some(status);
            record.force = force;
            rest.next();
        }
    }

    if record.to.is_none() && record.status.is_none() {
        return Err(format!("missing destination for `{}`", record.from));
    }

    for token in rest {
        let (key, values) = token
            .split_once('=')
            .ok_or_else(|| format!("unexpected token `{token}`"))?;
        record
            .conditions
            .insert(key.to_string(), ValueList::One(values.to_string()));
    }

    Ok(record)
}

fn is_destination(token: &str) -> bool {
    token.starts_with('/') || token.contains("://")
}

fn is_status(token: &str) -> bool {
    let code = token.strip_suffix('!').unwrap_or(token);
    !code.is_empty() && code.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(content: &str) -> Vec<RuleRecord> {
        let loaded = parse(Path::new("_redirects"), content);
        assert!(loaded.errors.is_empty(), "{:?}", loaded.errors);
        loaded.records
    }

    #[test]
    fn simple_rules_and_comments() {
        let records = parse_ok(
            "# comment\n\n/old /new 301\n/api/*  /.netlify/functions/:splat  200 # trailing\n/spa/* /index.html\n",
        );
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].from, "/old");
        assert_eq!(records[0].to.as_deref(), Some("/new"));
        assert_eq!(records[0].status, Some(301));
        assert_eq!(records[0].origin.to_string(), "_redirects:3");
        assert_eq!(records[1].status, Some(200));
        assert_eq!(records[2].status, None);
    }

    #[test]
    fn force_and_negative() {
        let records = parse_ok("/app/* /app/index.html 200!\n!/admin/* /login 302\n");
        assert!(records[0].force);
        assert_eq!(records[0].status, Some(200));
        assert!(records[1].negative);
        assert_eq!(records[1].from, "/admin/*");
    }

    #[test]
    fn query_and_conditions() {
        let records = parse_ok(
            "/store id=:id /blog/:id 301\n/ /china 302 Country=cn,hk,tw Language=zh\n/admin/* /admin/:splat 200! Role=admin,editor\n",
        );
        assert_eq!(records[0].query["id"], ":id");
        assert_eq!(records[0].to.as_deref(), Some("/blog/:id"));
        assert_eq!(records[1].conditions["Country"].items(), vec!["cn", "hk", "tw"]);
        assert_eq!(records[1].conditions["Language"].items(), vec!["zh"]);
        assert_eq!(records[2].conditions["Role"].items(), vec!["admin", "editor"]);
    }

    #[test]
    fn bare_status_has_no_destination() {
        let records = parse_ok("/private/* 404!\n");
        assert_eq!(records[0].to, None);
        assert_eq!(records[0].status, Some(404));
        assert!(records[0].force);
    }

    #[test]
    fn absolute_destinations() {
        let records = parse_ok("/proxy/* https://api.example.com/:splat 200\nhttps://old.example.com/* https://new.example.com/:splat 301!\n");
        assert_eq!(records[0].to.as_deref(), Some("https://api.example.com/:splat"));
        assert_eq!(records[1].from, "https://old.example.com/*");
    }

    #[test]
    fn malformed_lines_are_reported_and_skipped() {
        let loaded = parse(
            Path::new("_redirects"),
            "/ok /fine\n/only-from\n/bad /x 301 garbage\n/big /x 99999\n/also-ok /fine 302\n",
        );
        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.errors.len(), 3);
        let lines: Vec<usize> = loaded
            .errors
            .iter()
            .map(|e| match e {
                SourceError::Line { line, .. } => *line,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(lines, vec![2, 3, 4]);
    }
}
