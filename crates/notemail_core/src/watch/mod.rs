//! File-change watching and per-path debouncing.
//!
//! # Responsibility
//! - Subscribe to recursive filesystem notifications under the watch root.
//! - Turn them into `FileChanged` events for the delivery pipeline.
//! - Suppress rapid duplicate events per path.

pub mod debounce;
pub mod watcher;

use std::path::PathBuf;
use std::time::Instant;

/// One observed modification of a non-directory path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChanged {
    /// Absolute path of the modified file.
    pub path: PathBuf,
    /// When the notification was received.
    pub timestamp: Instant,
}

impl FileChanged {
    /// Creates an event stamped with the current instant.
    pub fn now(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            timestamp: Instant::now(),
        }
    }
}
