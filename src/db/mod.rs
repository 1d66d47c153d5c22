use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection, ErrorCode};
use std::path::Path;
use thiserror::Error;

use crate::state::DbPool;

pub const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_initial",
        include_str!("../../migrations/001_initial.sql"),
    ),
    (
        "002_bookings_comments",
        include_str!("../../migrations/002_bookings_comments.sql"),
    ),
];

/// Failure inside a repository. Everything except `Conflict` surfaces as an
/// internal error.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(rusqlite::Error),

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, message)
                if failure.code == ErrorCode::ConstraintViolation
                    && failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                RepositoryError::Conflict(
                    message
                        .clone()
                        .unwrap_or_else(|| "Unique constraint violated".to_string()),
                )
            }
            _ => RepositoryError::Sql(err),
        }
    }
}

/// Outcome of a guarded store operation: a domain rule refused it, or the
/// store itself failed. Either way the transaction was rolled back.
#[derive(Debug)]
pub enum TxError<E> {
    Rejected(E),
    Store(RepositoryError),
}

impl<E> From<RepositoryError> for TxError<E> {
    fn from(err: RepositoryError) -> Self {
        TxError::Store(err)
    }
}

impl<E> From<rusqlite::Error> for TxError<E> {
    fn from(err: rusqlite::Error) -> Self {
        TxError::Store(err.into())
    }
}

impl<E> From<r2d2::Error> for TxError<E> {
    fn from(err: r2d2::Error) -> Self {
        TxError::Store(err.into())
    }
}

/// Runs `work` between `BEGIN IMMEDIATE` and `COMMIT`, rolling back on any
/// error. The write lock is taken up front, so checks made inside `work`
/// still hold when its writes land.
pub fn immediate<T, E>(
    conn: &Connection,
    work: impl FnOnce(&Connection) -> Result<T, E>,
) -> Result<T, E>
where
    E: From<rusqlite::Error>,
{
    within(conn, "BEGIN IMMEDIATE", work)
}

/// Runs `work` inside one read transaction so every query sees the same
/// snapshot.
pub fn snapshot<T, E>(
    conn: &Connection,
    work: impl FnOnce(&Connection) -> Result<T, E>,
) -> Result<T, E>
where
    E: From<rusqlite::Error>,
{
    within(conn, "BEGIN DEFERRED", work)
}

fn within<T, E>(
    conn: &Connection,
    begin: &str,
    work: impl FnOnce(&Connection) -> Result<T, E>,
) -> Result<T, E>
where
    E: From<rusqlite::Error>,
{
    conn.execute_batch(begin)?;

    match work(conn) {
        Ok(value) => match conn.execute_batch("COMMIT") {
            Ok(()) => Ok(value),
            Err(e) => {
                // A pooled connection must never go back with a transaction open.
                let _ = conn.execute_batch("ROLLBACK");
                Err(e.into())
            }
        },
        Err(e) => {
            conn.execute_batch("ROLLBACK")?;
            Err(e)
        }
    }
}

/// `unicode_lower(text)`: full Unicode lowercasing. SQLite's own `lower()`
/// only folds ASCII.
fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "unicode_lower",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
}

pub fn create_pool(db_path: &Path) -> anyhow::Result<DbPool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Pragmas are per connection, so they go into the manager's init hook.
    let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            ",
        )?;
        register_functions(conn)
    });
    let pool = Pool::builder().max_size(8).build(manager)?;

    let conn = pool.get()?;
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        ",
    )?;

    Ok(pool)
}

pub fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    let conn = pool.get()?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    for (name, sql) in MIGRATIONS {
        let already_applied: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM schema_version WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;

        if !already_applied {
            tracing::info!("Applying migration: {}", name);
            conn.execute_batch(sql)?;
            conn.execute(
                "INSERT INTO schema_version (name) VALUES (?1)",
                params![name],
            )?;
        }
    }

    tracing::info!("Database migrations complete");
    Ok(())
}

/// `?, ?, ?` for an `IN (...)` clause of `count` positional parameters.
pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
