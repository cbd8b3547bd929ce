//! # tessera-db
//!
//! SQLite storage for the Tessera daemon, at `$TESSERA_DATA_DIR/tessera.db`.
//!
//! The ledger itself lives in memory. This crate keeps what the daemon
//! observed: an append-only journal of every notification the ledger emitted,
//! and a royalty read model derived from it for dashboards.
//!
//! - WAL mode
//! - All timestamps are Unix epoch seconds
//! - Schema version stored in `PRAGMA user_version`

pub mod migrations;
pub mod queries;
pub mod schema;

use std::path::Path;

use rusqlite::Connection;

/// Version a fully migrated database reports in `user_version`.
pub const SCHEMA_VERSION: u32 = schema::MIGRATIONS.len() as u32;

const PRAGMAS: &str = "PRAGMA journal_mode = WAL;
PRAGMA busy_timeout = 5000;
PRAGMA synchronous = NORMAL;";

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// A journal payload that does not (de)serialize as a ledger event.
    #[error("bad event payload: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Open the journal database at `path`, creating and migrating it as needed.
pub fn open(path: &Path) -> Result<Connection> {
    prepare(Connection::open(path)?)
}

/// A private in-memory journal, for tests and throwaway daemons.
pub fn open_memory() -> Result<Connection> {
    prepare(Connection::open_in_memory()?)
}

fn prepare(conn: Connection) -> Result<Connection> {
    conn.execute_batch(PRAGMAS)?;
    migrations::run(&conn)?;
    Ok(conn)
}
