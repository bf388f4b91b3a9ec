//! Connection pool bootstrap for the ledger database.
//!
//! # Responsibility
//! - Create the ledger directory and open a pooled SQLite database.
//! - Configure per-connection pragmas (WAL journal, busy timeout).
//! - Trigger schema migrations before returning a usable pool.
//!
//! # Invariants
//! - Every pooled connection waits on the write lock instead of failing.
//! - Returned pools have migrations fully applied.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use log::{error, info};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Pooled SQLite connections shared by ledger readers and the single writer.
pub type DbPool = r2d2::Pool<SqliteConnectionManager>;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_POOL_SIZE: u32 = 4;

/// Opens (creating if needed) the ledger database file and applies migrations.
///
/// Parent directories of `path` are created when absent.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_pool(path: impl AsRef<Path>) -> DbResult<DbPool> {
    let path = path.as_ref();
    let started_at = Instant::now();
    info!(
        "event=db_open module=db status=start mode=file path={}",
        path.display()
    );

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        if let Err(source) = std::fs::create_dir_all(parent) {
            error!(
                "event=db_open module=db status=error mode=file error_code=create_dir_failed path={} error={}",
                parent.display(),
                source
            );
            return Err(DbError::CreateDir {
                path: parent.to_path_buf(),
                source,
            });
        }
    }

    let manager = SqliteConnectionManager::file(path).with_init(configure_connection);
    let pool = r2d2::Pool::builder()
        .max_size(MAX_POOL_SIZE)
        .build(manager);
    finish_open(pool, started_at, "file")
}

/// Opens a single-connection in-memory ledger database.
///
/// The pool holds exactly one connection so every checkout sees the same
/// in-memory schema.
pub fn open_pool_in_memory() -> DbResult<DbPool> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode=memory");

    let manager = SqliteConnectionManager::memory().with_init(configure_connection);
    let pool = r2d2::Pool::builder().max_size(1).build(manager);
    finish_open(pool, started_at, "memory")
}

fn finish_open(
    pool: Result<DbPool, r2d2::Error>,
    started_at: Instant,
    mode: &str,
) -> DbResult<DbPool> {
    let result = pool.map_err(DbError::from).and_then(|pool| {
        let mut conn = pool.get()?;
        apply_migrations(&mut conn)?;
        drop(conn);
        Ok(pool)
    });

    match &result {
        Ok(_) => info!(
            "event=db_open module=db status=ok mode={} duration_ms={}",
            mode,
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
            mode,
            started_at.elapsed().as_millis(),
            err
        ),
    }
    result
}

fn configure_connection(conn: &mut Connection) -> Result<(), rusqlite::Error> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    // journal_mode answers with the resulting mode; in-memory databases stay `memory`.
    let _mode: String = conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
    Ok(())
}
