//! Recursive filesystem watcher for the notes root.
//!
//! # Responsibility
//! - Own the OS subscription (`notify::RecommendedWatcher`) for one root.
//! - Forward modification events on non-directory paths as `FileChanged`.
//!
//! # Invariants
//! - At most one OS subscription exists per `ChangeWatcher`.
//! - `stop()` releases the subscription; the event receiver then drains and
//!   closes, so a later `start()` never duplicates deliveries.
//! - A missing or non-directory root fails fast instead of watching nothing.

use super::FileChanged;
use log::{debug, info, warn};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

pub type WatchResult<T> = Result<T, WatchError>;

#[derive(Debug)]
pub enum WatchError {
    /// The configured root does not exist or is not a directory.
    WatchRootMissing(PathBuf),
    /// `start()` was called while a subscription is active.
    AlreadyRunning,
    /// The platform watcher backend failed.
    Notify(notify::Error),
}

impl Display for WatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WatchRootMissing(path) => {
                write!(f, "watch root not found: {}", path.display())
            }
            Self::AlreadyRunning => write!(f, "watcher is already running"),
            Self::Notify(err) => write!(f, "filesystem watcher error: {err}"),
        }
    }
}

impl Error for WatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Notify(err) => Some(err),
            Self::WatchRootMissing(_) | Self::AlreadyRunning => None,
        }
    }
}

impl From<notify::Error> for WatchError {
    fn from(value: notify::Error) -> Self {
        Self::Notify(value)
    }
}

/// Restartable recursive watcher over one directory tree.
pub struct ChangeWatcher {
    root: PathBuf,
    // Dropping the notify watcher deregisters the OS watch.
    subscription: Option<RecommendedWatcher>,
}

impl ChangeWatcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            subscription: None,
        }
    }

    /// Configured root, as given.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_running(&self) -> bool {
        self.subscription.is_some()
    }

    /// Subscribes to the root recursively.
    ///
    /// Returns the receiving end of the event stream. The stream closes after
    /// `stop()` once the backend has released its handler.
    ///
    /// # Errors
    /// - `WatchRootMissing` when the root is absent or not a directory.
    /// - `AlreadyRunning` when a subscription is active.
    /// - `Notify` when the platform backend cannot be created.
    pub fn start(&mut self) -> WatchResult<mpsc::UnboundedReceiver<FileChanged>> {
        if self.subscription.is_some() {
            return Err(WatchError::AlreadyRunning);
        }

        let root = std::fs::canonicalize(&self.root)
            .ok()
            .filter(|path| path.is_dir())
            .ok_or_else(|| WatchError::WatchRootMissing(self.root.clone()))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) => forward_event(event, &tx),
                Err(err) => warn!("event=watch_event module=watch status=error error={err}"),
            },
            notify::Config::default(),
        )?;
        watcher.watch(&root, RecursiveMode::Recursive)?;

        info!(
            "event=watch_start module=watch status=ok root={}",
            root.display()
        );
        self.subscription = Some(watcher);
        Ok(rx)
    }

    /// Releases the OS subscription. No-op when not running.
    pub fn stop(&mut self) {
        if self.subscription.take().is_some() {
            info!(
                "event=watch_stop module=watch status=ok root={}",
                self.root.display()
            );
        }
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn forward_event(event: Event, tx: &mpsc::UnboundedSender<FileChanged>) {
    if !matches!(event.kind, EventKind::Modify(_)) {
        return;
    }

    for path in event.paths {
        if path.is_dir() {
            continue;
        }
        debug!(
            "event=file_changed module=watch status=ok path={}",
            path.display()
        );
        if tx.send(FileChanged::now(path)).is_err() {
            // Receiver dropped: the runtime is shutting this subscription down.
            return;
        }
    }
}
