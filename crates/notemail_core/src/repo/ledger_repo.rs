//! Processed-files ledger contract and SQLite implementation.
//!
//! # Responsibility
//! - Answer "was this file already delivered?" durably across restarts.
//! - Record a delivery exactly once per absolute file path.
//!
//! # Invariants
//! - At most one row per `file_path`; rows are never updated or deleted.
//! - Marking an already-marked path fails with `DuplicateKey`, which callers
//!   treat as success.
//! - Readers use pooled connections concurrently; writers serialize on the
//!   SQLite write lock.

use crate::db::{open_pool, open_pool_in_memory, DbError, DbPool};
use crate::model::record::ProcessedRecord;
use rusqlite::{params, ErrorCode, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger read/write error.
#[derive(Debug)]
pub enum LedgerError {
    Db(DbError),
    /// The path is already recorded.
    DuplicateKey(String),
    /// Ledger keys are UTF-8 strings; this path has no UTF-8 form.
    NonUtf8Path(PathBuf),
}

impl LedgerError {
    /// Whether this error means "already recorded", i.e. success for `mark`.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateKey(_))
    }
}

impl Display for LedgerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::DuplicateKey(path) => write!(f, "file already recorded as processed: {path}"),
            Self::NonUtf8Path(path) => {
                write!(f, "file path is not valid UTF-8: {}", path.display())
            }
        }
    }
}

impl Error for LedgerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::DuplicateKey(_) | Self::NonUtf8Path(_) => None,
        }
    }
}

impl From<DbError> for LedgerError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<r2d2::Error> for LedgerError {
    fn from(value: r2d2::Error) -> Self {
        Self::Db(DbError::Pool(value))
    }
}

/// Durable set of delivered file paths.
pub trait Ledger: Send + Sync {
    /// Returns whether `path` was already delivered.
    fn has(&self, path: &Path) -> LedgerResult<bool>;
    /// Records `path` as delivered now.
    fn mark(&self, path: &Path) -> LedgerResult<()>;
    /// Lists every record, oldest first.
    fn records(&self) -> LedgerResult<Vec<ProcessedRecord>>;
}

/// SQLite-backed ledger over a connection pool.
#[derive(Clone)]
pub struct SqliteLedger {
    pool: DbPool,
}

impl SqliteLedger {
    /// Opens the ledger file, creating it and its parent directories if absent.
    ///
    /// # Errors
    /// - Returns an error when the directory cannot be created, the database
    ///   cannot be opened, or migrations fail. Callers treat this as fatal.
    pub fn open(path: impl AsRef<Path>) -> LedgerResult<Self> {
        Ok(Self::from_pool(open_pool(path)?))
    }

    /// Opens a private in-memory ledger.
    pub fn open_in_memory() -> LedgerResult<Self> {
        Ok(Self::from_pool(open_pool_in_memory()?))
    }

    /// Wraps an already migrated pool.
    pub fn from_pool(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl Ledger for SqliteLedger {
    fn has(&self, path: &Path) -> LedgerResult<bool> {
        let key = ledger_key(path)?;
        let conn = self.pool.get()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM processed_files WHERE file_path = ?1;",
                [key],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn mark(&self, path: &Path) -> LedgerResult<()> {
        let key = ledger_key(path)?;
        let processed_at = chrono::Utc::now().timestamp_millis();
        let conn = self.pool.get()?;
        match conn.execute(
            "INSERT INTO processed_files (file_path, processed_at) VALUES (?1, ?2);",
            params![key, processed_at],
        ) {
            Ok(_) => Ok(()),
            Err(err) if err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) => {
                Err(LedgerError::DuplicateKey(key.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn records(&self) -> LedgerResult<Vec<ProcessedRecord>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT file_path, processed_at
             FROM processed_files
             ORDER BY processed_at ASC, file_path ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(ProcessedRecord {
                file_path: row.get("file_path")?,
                processed_at: row.get("processed_at")?,
            });
        }
        Ok(records)
    }
}

fn ledger_key(path: &Path) -> LedgerResult<&str> {
    path.to_str()
        .ok_or_else(|| LedgerError::NonUtf8Path(path.to_path_buf()))
}
