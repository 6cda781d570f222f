//! Template root watcher.
//!
//! Logs writes and creations under the template root. The filesystem registry
//! re-reads templates on every request, so the watcher never touches engine
//! state; it exists to make edits visible in the logs during development.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

/// A change observed under the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootChange {
    Modified(PathBuf),
    Created(PathBuf),
}

impl RootChange {
    fn from_event(event: Event) -> Vec<Self> {
        match event.kind {
            EventKind::Modify(_) => event.paths.into_iter().map(RootChange::Modified).collect(),
            EventKind::Create(_) => event.paths.into_iter().map(RootChange::Created).collect(),
            _ => Vec::new(),
        }
    }
}

/// A watcher that monitors the template root recursively.
pub struct RootWatcher {
    path: PathBuf,
    change_tx: mpsc::UnboundedSender<RootChange>,
}

impl RootWatcher {
    /// Create a new RootWatcher.
    ///
    /// Returns the watcher and a receiver for observed changes.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<RootChange>) {
        let (change_tx, change_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                change_tx,
            },
            change_rx,
        )
    }

    /// Start watching. The returned handle must be kept alive.
    ///
    /// Watching is recursive, so directories created later are covered
    /// without re-registering them.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.change_tx.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for change in RootChange::from_event(event) {
                        let _ = tx.send(change);
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::Recursive)?;

        tracing::info!(path = ?self.path, "Template watcher started");
        Ok(watcher)
    }
}

/// Log every change until the sender side is dropped.
pub async fn log_changes(mut changes: mpsc::UnboundedReceiver<RootChange>) {
    while let Some(change) = changes.recv().await {
        match change {
            RootChange::Modified(path) => tracing::info!(path = %path.display(), "File modified"),
            RootChange::Created(path) => {
                if path.is_dir() {
                    tracing::info!(path = %path.display(), "Directory created");
                } else {
                    tracing::info!(path = %path.display(), "File created");
                }
            }
        }
    }
}
