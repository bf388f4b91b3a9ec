//! Delivery orchestration.
//!
//! # Responsibility
//! - Run each file-changed event through ledger, debounce, parse, send and
//!   annotate steps (`pipeline`).
//! - Report outcomes back into the note itself (`annotate`).
//! - Own the watcher lifecycle behind start/stop controls (`runtime`).

pub mod annotate;
pub mod pipeline;
pub mod runtime;
