//! Ledger record model.

use serde::Serialize;

/// One durable "this file was delivered" fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedRecord {
    /// Absolute path of the delivered note. Primary key.
    pub file_path: String,
    /// Delivery confirmation time in epoch milliseconds (UTC).
    pub processed_at: i64,
}
