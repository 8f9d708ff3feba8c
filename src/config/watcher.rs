//! Rule file watcher for hot reload.
//!
//! # Responsibilities
//! - Watch the directories holding the candidate rule files
//! - Collapse bursts of events into one reload (debounce)
//! - Run the reload callback off the async workers
//!
//! # Design Decisions
//! - Parent directories are watched, so files that do not exist yet are
//!   picked up when they are created
//! - The watcher owns its event task and stops it when dropped

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Watches a fixed set of rule files.
pub struct RuleWatcher {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl RuleWatcher {
    /// Start watching `paths`, calling `on_change` once per quiet period
    /// with the changed files that currently exist.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn spawn<F>(paths: &[PathBuf], debounce: Duration, on_change: F) -> Result<Self, notify::Error>
    where
        F: Fn(Vec<PathBuf>) + Send + Sync + 'static,
    {
        let watched: BTreeSet<PathBuf> = paths.iter().map(|p| canonical_file(p)).collect();
        let dirs: BTreeSet<PathBuf> = watched
            .iter()
            .filter_map(|p| p.parent().map(Path::to_path_buf))
            .collect();

        let (tx, mut rx) = mpsc::unbounded_channel::<PathBuf>();
        let filter = watched.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !(event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove()) {
                        return;
                    }
                    for path in event.paths {
                        if filter.contains(&path) {
                            let _ = tx.send(path);
                        }
                    }
                }
                Err(e) => tracing::error!(error = %e, "Rule watch error"),
            },
            Config::default(),
        )?;

        for dir in &dirs {
            if dir.is_dir() {
                watcher.watch(dir, RecursiveMode::NonRecursive)?;
            } else {
                tracing::debug!(dir = %dir.display(), "Rule directory missing, not watched");
            }
        }

        let on_change = Arc::new(on_change);
        let task = tokio::spawn(async move {
            while let Some(first) = rx.recv().await {
                let mut changed = BTreeSet::from([first]);
                loop {
                    match tokio::time::timeout(debounce, rx.recv()).await {
                        Ok(Some(path)) => {
                            changed.insert(path);
                        }
                        Ok(None) | Err(_) => break,
                    }
                }

                let existing: Vec<PathBuf> = changed.into_iter().filter(|p| p.exists()).collect();
                tracing::info!(files = ?existing, "Rule files changed, reloading");

                let callback = Arc::clone(&on_change);
                if let Err(e) = tokio::task::spawn_blocking(move || callback(existing)).await {
                    tracing::error!(error = %e, "Rule reload task failed");
                }
            }
        });

        tracing::info!(files = watched.len(), "Rule watcher started");
        Ok(Self {
            _watcher: watcher,
            task,
        })
    }
}

impl Drop for RuleWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Resolve the directory part through symlinks so event paths compare equal.
fn canonical_file(path: &Path) -> PathBuf {
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        return path.to_path_buf();
    };
    match parent.canonicalize() {
        Ok(dir) => dir.join(name),
        Err(_) => path.to_path_buf(),
    }
}
