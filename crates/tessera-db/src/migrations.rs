//! Forward-only migrations tracked in `PRAGMA user_version`.

use rusqlite::Connection;

use crate::{schema, DbError, Result, SCHEMA_VERSION};

fn user_version(conn: &Connection) -> Result<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Apply every script past the database's current version, each in its own
/// transaction together with the version bump.
pub fn run(conn: &Connection) -> Result<()> {
    let current = user_version(conn)?;
    if current > SCHEMA_VERSION {
        return Err(DbError::Migration(format!(
            "database is at v{current}, this build knows v{SCHEMA_VERSION}"
        )));
    }

    for (index, script) in schema::MIGRATIONS.iter().enumerate().skip(current as usize) {
        let version = index as u32 + 1;
        tracing::info!(from = version - 1, to = version, "migrating journal database");
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(script)
            .map_err(|e| DbError::Migration(format!("v{version}: {e}")))?;
        tx.pragma_update(None, "user_version", version)?;
        tx.commit()?;
    }
    Ok(())
}
