//! Rule file readers.
//!
//! # Data Flow
//! ```text
//! {publish_dir}/_redirects, {project_dir}/_redirects, config file
//!     → redirects_file.rs / declarative.rs (parse into RuleRecord)
//!     → routing::compiler (validate, compile)
//!
//! {project_dir}/_headers, {publish_dir}/_headers, config file
//!     → headers_file.rs / declarative.rs (parse into HeaderRecord)
//!     → routing::headers (compile)
//! ```
//!
//! # Design Decisions
//! - Missing files contribute nothing and are not errors
//! - A bad line is reported and skipped; the rest of the file still loads
//! - An unreadable or unparseable file fails the whole load, so a reload
//!   keeps the previous table instead of silently losing rules

pub mod declarative;
pub mod headers_file;
pub mod redirects_file;

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::schema::SiteConfig;
use crate::routing::record::{HeaderRecord, RuleRecord};

/// Error raised while reading a rule file.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{}:{line}: {message}", path.display())]
    Line {
        path: PathBuf,
        line: usize,
        message: String,
    },
    #[error("{}: {table}[{index}]: {message}", path.display())]
    Record {
        path: PathBuf,
        table: &'static str,
        index: usize,
        message: String,
    },
}

/// Records read from all sources plus the per-line problems found.
#[derive(Debug, Default)]
pub struct Loaded<T> {
    pub records: Vec<T>,
    pub errors: Vec<SourceError>,
}

impl<T> Loaded<T> {
    fn extend(&mut self, other: Loaded<T>) {
        self.records.extend(other.records);
        self.errors.extend(other.errors);
    }
}

/// The candidate rule files of a site.
#[derive(Debug, Clone)]
pub struct RuleSources {
    publish_dir: PathBuf,
    project_dir: PathBuf,
    config_path: Option<PathBuf>,
}

impl RuleSources {
    pub fn new(publish_dir: &Path, project_dir: &Path, config_path: Option<&Path>) -> Self {
        Self {
            publish_dir: absolute(publish_dir),
            project_dir: absolute(project_dir),
            config_path: config_path.map(absolute),
        }
    }

    pub fn from_config(site: &SiteConfig) -> Self {
        Self::new(&site.publish_dir, &site.project_dir, site.config_path.as_deref())
    }

    /// Plain redirect files, publish directory first.
    pub fn redirects_files(&self) -> Vec<PathBuf> {
        dedup(vec![
            self.publish_dir.join("_redirects"),
            self.project_dir.join("_redirects"),
        ])
    }

    /// Plain header files, project root first.
    pub fn headers_files(&self) -> Vec<PathBuf> {
        dedup(vec![
            self.project_dir.join("_headers"),
            self.publish_dir.join("_headers"),
        ])
    }

    pub fn watched_redirect_paths(&self) -> Vec<PathBuf> {
        self.with_config(self.redirects_files())
    }

    pub fn watched_header_paths(&self) -> Vec<PathBuf> {
        self.with_config(self.headers_files())
    }

    /// Read redirect records: plain files in order, then the config file.
    pub fn load_redirects(&self) -> Result<Loaded<RuleRecord>, SourceError> {
        let mut loaded = Loaded::default();
        for path in self.redirects_files() {
            if let Some(content) = read_optional(&path)? {
                loaded.extend(redirects_file::parse(&path, &content));
            }
        }
        if let Some(config) = self.read_config()? {
            loaded.extend(config.redirects);
        }
        Ok(loaded)
    }

    /// Read header records: plain files in order, then the config file.
    pub fn load_headers(&self) -> Result<Loaded<HeaderRecord>, SourceError> {
        let mut loaded = Loaded::default();
        for path in self.headers_files() {
            if let Some(content) = read_optional(&path)? {
                loaded.extend(headers_file::parse(&path, &content));
            }
        }
        if let Some(config) = self.read_config()? {
            loaded.extend(config.headers);
        }
        Ok(loaded)
    }

    fn read_config(&self) -> Result<Option<declarative::DeclarativeRules>, SourceError> {
        let Some(path) = &self.config_path else {
            return Ok(None);
        };
        match read_optional(path)? {
            Some(content) => declarative::parse(path, &content).map(Some),
            None => Ok(None),
        }
    }

    fn with_config(&self, mut paths: Vec<PathBuf>) -> Vec<PathBuf> {
        if let Some(config) = &self.config_path {
            paths.push(config.clone());
        }
        dedup(paths)
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, SourceError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(SourceError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn dedup(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut unique: Vec<PathBuf> = Vec::with_capacity(paths.len());
    for path in paths {
        if !unique.contains(&path) {
            unique.push(path);
        }
    }
    unique
}
