//! Event journal.
//!
//! Append-only: rows are never updated or deleted. Sequence numbers are
//! assigned by SQLite and start at 1.

use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use tessera_types::events::Event;
use tessera_types::SaleId;

use crate::queries::royalties;
use crate::{DbError, Result};

/// A journaled event with its sequence number.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JournalEntry {
    pub seq: u64,
    #[serde(flatten)]
    pub event: Event,
}

/// Append an event without touching the read model.
pub fn append(conn: &Connection, event: &Event) -> Result<u64> {
    let payload = serde_json::to_string(&event.payload)
        .map_err(|e| DbError::Serialization(e.to_string()))?;
    conn.execute(
        "INSERT INTO events (event_type, sale_id, timestamp, payload)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            event.event_type.as_str(),
            event.payload.sale_id().map(|id| id as i64),
            event.timestamp as i64,
            payload,
        ],
    )?;
    Ok(conn.last_insert_rowid() as u64)
}

/// Append an event and fold it into the read model, atomically.
pub fn record(conn: &Connection, event: &Event) -> Result<u64> {
    let tx = conn.unchecked_transaction()?;
    let seq = append(&tx, event)?;
    royalties::apply(&tx, event)?;
    tx.commit()?;
    tracing::trace!(seq, event_type = event.event_type.as_str(), "event journaled");
    Ok(seq)
}

/// Events after `after_seq`, oldest first, at most `limit`.
pub fn list(conn: &Connection, after_seq: u64, limit: u32) -> Result<Vec<JournalEntry>> {
    let mut stmt = conn.prepare(
        "SELECT seq, timestamp, payload FROM events
         WHERE seq > ?1
         ORDER BY seq ASC
         LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![after_seq as i64, limit], raw_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.into_iter().map(decode).collect()
}

/// Every event concerning one sale, oldest first.
pub fn list_for_sale(conn: &Connection, sale_id: SaleId) -> Result<Vec<JournalEntry>> {
    let mut stmt = conn.prepare(
        "SELECT seq, timestamp, payload FROM events
         WHERE sale_id = ?1
         ORDER BY seq ASC",
    )?;
    let rows = stmt
        .query_map([sale_id as i64], raw_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.into_iter().map(decode).collect()
}

/// Highest sequence number, or 0 for an empty journal.
pub fn last_seq(conn: &Connection) -> Result<u64> {
    let seq: Option<i64> = conn
        .query_row("SELECT MAX(seq) FROM events", [], |row| row.get(0))
        .optional()?
        .flatten();
    Ok(seq.unwrap_or(0) as u64)
}

pub fn count(conn: &Connection) -> Result<u64> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
    Ok(n as u64)
}

type RawRow = (i64, i64, String);

fn raw_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn decode((seq, timestamp, payload): RawRow) -> Result<JournalEntry> {
    let payload =
        serde_json::from_str(&payload).map_err(|e| DbError::Serialization(e.to_string()))?;
    Ok(JournalEntry {
        seq: seq as u64,
        event: Event::new(payload, timestamp as u64),
    })
}
