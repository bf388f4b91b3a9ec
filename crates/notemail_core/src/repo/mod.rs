//! Persistence contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define the processed-files ledger contract.
//! - Isolate SQL details from pipeline orchestration.
//!
//! # Invariants
//! - The ledger is the single source of truth for delivery idempotence.

pub mod ledger_repo;
