//! Per-path debounce gate.
//!
//! # Invariants
//! - An event is suppressed iff the same path was accepted less than
//!   `window` earlier.
//! - Suppressed events do not move the accepted timestamp.
//! - Unrelated paths never interfere.
//! - Entries are never evicted; memory grows with distinct paths touched.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default suppression window.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_secs(1);

/// Sliding per-path debounce over accepted event instants.
#[derive(Debug)]
pub struct DebounceGate {
    window: Duration,
    last_accepted: Mutex<HashMap<PathBuf, Instant>>,
}

impl Default for DebounceGate {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_WINDOW)
    }
}

impl DebounceGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Returns `true` and records `now` when `path` may be processed.
    pub fn should_process(&self, path: &Path, now: Instant) -> bool {
        let mut last_accepted = match self.last_accepted.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(last) = last_accepted.get(path) {
            if now.saturating_duration_since(*last) < self.window {
                return false;
            }
        }

        last_accepted.insert(path.to_path_buf(), now);
        true
    }

    /// Number of distinct paths seen so far.
    pub fn tracked_paths(&self) -> usize {
        match self.last_accepted.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}
