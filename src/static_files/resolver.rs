//! Static asset resolution with pretty-URL alternates.
//!
//! # Design Decisions
//! - The literal path is always tried first, then alternates in a fixed
//!   order; `.html` beats `/index.html` for extensionless paths
//! - Paths containing `..` never resolve
//! - Only regular files count; directories are not assets

use std::path::{Component, Path, PathBuf};

use crate::dispatch::internal::is_function_path;

/// Extensions that never get pretty-URL alternates.
const ASSET_EXTENSIONS: &[&str] = &[
    "html", "htm", "png", "jpg", "js", "css", "svg", "gif", "ico", "woff", "woff2",
];

/// A file found under the publish directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticAsset {
    /// URL path of the candidate that matched, e.g. `/about.html`.
    pub url_path: String,
    pub file: PathBuf,
}

/// Alternate URL paths to try after the literal one.
pub fn alternate_paths(url_path: &str) -> Vec<String> {
    if is_function_path(url_path) {
        return Vec::new();
    }

    if let Some(trimmed) = url_path.strip_suffix('/') {
        let mut paths = vec![format!("{url_path}index.html"), format!("{url_path}index.htm")];
        if !trimmed.is_empty() {
            paths.push(format!("{trimmed}.html"));
            paths.push(format!("{trimmed}.htm"));
        }
        return paths;
    }

    if has_asset_extension(url_path) {
        return Vec::new();
    }

    vec![
        format!("{url_path}.html"),
        format!("{url_path}.htm"),
        format!("{url_path}/index.html"),
        format!("{url_path}/index.htm"),
    ]
}

fn has_asset_extension(url_path: &str) -> bool {
    let last = url_path.rsplit('/').next().unwrap_or_default();
    last.rsplit_once('.')
        .is_some_and(|(_, ext)| ASSET_EXTENSIONS.contains(&ext))
}

/// The URL a pretty-URL asset should be requested under.
///
/// `/about.html` → `/about`, `/docs/index.html` → `/docs/`. Returns `None`
/// for anything that is not an HTML page.
pub fn canonical_url_path(asset_url_path: &str) -> Option<String> {
    for index in ["index.html", "index.htm"] {
        if let Some(dir) = asset_url_path.strip_suffix(index) {
            if dir.ends_with('/') {
                return Some(dir.to_string());
            }
        }
    }
    asset_url_path
        .strip_suffix(".html")
        .or_else(|| asset_url_path.strip_suffix(".htm"))
        .map(str::to_string)
}

/// The static root.
#[derive(Debug, Clone)]
pub struct PublishDir {
    root: PathBuf,
}

impl PublishDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Probe `url_path` (decoded) and its alternates, in order.
    pub fn resolve(&self, url_path: &str) -> Option<StaticAsset> {
        std::iter::once(url_path.to_string())
            .chain(alternate_paths(url_path))
            .find_map(|candidate| {
                let file = self.file_for(&candidate)?;
                Some(StaticAsset {
                    url_path: candidate,
                    file,
                })
            })
    }

    /// The regular file backing `url_path`, without alternates.
    pub fn file_for(&self, url_path: &str) -> Option<PathBuf> {
        let mut file = self.root.clone();
        for component in Path::new(url_path.trim_start_matches('/')).components() {
            match component {
                Component::Normal(part) => file.push(part),
                Component::CurDir => {}
                _ => return None,
            }
        }
        file.is_file().then_some(file)
    }
}
