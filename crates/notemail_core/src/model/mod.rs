//! Domain model for parsed notes and ledger records.
//!
//! # Invariants
//! - A `ProcessedRecord` exists at most once per absolute file path.
//! - `ParsedNote` values are transient; only ledger records are persisted.

pub mod note;
pub mod record;
