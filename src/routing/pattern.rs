//! Segment-wise path patterns.
//!
//! A pattern is a `/`-separated list of segments, each one of:
//! - a literal, compared exactly (case-sensitive)
//! - `:name`, consuming exactly one segment and binding it
//! - `*`, consuming the rest of the path and binding it as `splat`
//!
//! Empty segments are ignored on both sides, so `/blog/` and `/blog` match
//! the same patterns. No regex is involved.

use std::fmt;

/// A single compiled path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Placeholder(String),
    Splat,
}

/// Error raised for patterns that cannot be compiled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("path `{0}` must start with `/`")]
    Relative(String),
    #[error("placeholder in `{0}` has no name")]
    EmptyPlaceholder(String),
}

/// Values bound while matching a path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures {
    params: Vec<(String, String)>,
    splat: Option<String>,
}

impl Captures {
    pub fn get(&self, name: &str) -> Option<&str> {
        if name == "splat" {
            if let Some(splat) = &self.splat {
                return Some(splat);
            }
        }
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn splat(&self) -> Option<&str> {
        self.splat.as_deref()
    }

    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params.push((name.into(), value.into()));
    }

    /// Replace `:name` tokens (and a bare `*`) in `template`.
    ///
    /// Unbound placeholders are left untouched, which keeps ports such as
    /// `http://host:8080/` intact.
    pub fn substitute(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut chars = template.char_indices().peekable();

        while let Some((start, ch)) = chars.next() {
            match ch {
                ':' => {
                    let mut end = start + 1;
                    while let Some(&(idx, next)) = chars.peek() {
                        if next.is_ascii_alphanumeric() || next == '_' {
                            end = idx + next.len_utf8();
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    let name = &template[start + 1..end];
                    match (name.is_empty(), self.get(name)) {
                        (false, Some(value)) => out.push_str(value),
                        (false, None) if name == "splat" => {}
                        _ => out.push_str(&template[start..end]),
                    }
                }
                '*' => match &self.splat {
                    Some(splat) => out.push_str(splat),
                    None => out.push('*'),
                },
                _ => out.push(ch),
            }
        }
        out
    }
}

/// A compiled path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        if !raw.starts_with('/') {
            return Err(PatternError::Relative(raw.to_string()));
        }

        let mut segments = Vec::new();
        for part in raw.split('/').filter(|s| !s.is_empty()) {
            let segment = if part == "*" {
                Segment::Splat
            } else if let Some(name) = part.strip_prefix(':') {
                if name.is_empty() {
                    return Err(PatternError::EmptyPlaceholder(raw.to_string()));
                }
                Segment::Placeholder(name.to_string())
            } else {
                Segment::Literal(part.to_string())
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// True when a splat appears anywhere but last.
    pub fn has_inner_splat(&self) -> bool {
        self.segments
            .iter()
            .rev()
            .skip(1)
            .any(|segment| *segment == Segment::Splat)
    }

    /// Match `path`, returning the bound values on success.
    pub fn matches(&self, path: &str) -> Option<Captures> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut captures = Captures::default();
        if match_segments(&self.segments, &parts, &mut captures) {
            Some(captures)
        } else {
            None
        }
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn match_segments(segments: &[Segment], parts: &[&str], captures: &mut Captures) -> bool {
    let Some((segment, rest)) = segments.split_first() else {
        return parts.is_empty();
    };

    match segment {
        Segment::Literal(literal) => {
            parts.first().copied() == Some(literal.as_str())
                && match_segments(rest, &parts[1..], captures)
        }
        Segment::Placeholder(name) => {
            let Some((first, tail)) = parts.split_first() else {
                return false;
            };
            captures.bind(name.clone(), *first);
            if match_segments(rest, tail, captures) {
                true
            } else {
                captures.params.pop();
                false
            }
        }
        Segment::Splat if rest.is_empty() => {
            captures.splat = Some(parts.join("/"));
            true
        }
        Segment::Splat => {
            // Inner splats (header rules only) take at least one segment.
            for taken in 1..=parts.len() {
                let saved = captures.params.len();
                if match_segments(rest, &parts[taken..], captures) {
                    captures.splat = Some(parts[..taken].join("/"));
                    return true;
                }
                captures.params.truncate(saved);
            }
            false
        }
    }
}
