//! Database layer for genereport.

mod mutations;
mod patients;
mod reports;
mod result_files;
mod samples;
mod schema;

pub use reports::CompletedReport;
pub use schema::*;

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

/// Relational store failures. `Conflict` marks a second in-flight report
/// for a sample.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Stored JSON is unreadable: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Patients, samples, result files, mutations and report attempts in one
/// SQLite file. Table-specific queries live in the sibling modules.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the genereport database file, creating tables on first use.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Self::with_schema(Connection::open(path)?)
    }

    /// Throwaway database for unit tests and `open_core_in_memory`.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::with_schema(Connection::open_in_memory()?)
    }

    /// Schema creation is idempotent, so reopening an existing file is safe.
    fn with_schema(conn: Connection) -> DbResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Underlying connection, for ad hoc queries in tests and tooling.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Whether a SQLite error is a UNIQUE index violation.
fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
