//! Royalty read model.
//!
//! One row per recorded sale, moved to released when the journal sees the
//! matching `royalty_decrypted` event. Decrypted content totals are kept as
//! a separate append-only report table.

use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use tessera_types::events::{Event, LedgerEvent};
use tessera_types::SaleId;

use crate::{DbError, Result};

/// Fold one event into the read model. Events with no bearing on it are ignored.
pub fn apply(conn: &Connection, event: &Event) -> Result<()> {
    match &event.payload {
        LedgerEvent::SaleRecorded { sale_id, timestamp } => {
            conn.execute(
                "INSERT OR IGNORE INTO royalties (sale_id, recorded_at) VALUES (?1, ?2)",
                rusqlite::params![*sale_id as i64, *timestamp as i64],
            )?;
        }
        LedgerEvent::RoyaltyDecrypted {
            sale_id,
            content_id,
            amount,
        } => {
            conn.execute(
                "INSERT INTO royalties (sale_id, recorded_at, released, content_id, amount, released_at)
                 VALUES (?1, ?2, 1, ?3, ?4, ?2)
                 ON CONFLICT(sale_id) DO UPDATE SET
                    released = 1,
                    content_id = excluded.content_id,
                    amount = excluded.amount,
                    released_at = excluded.released_at
                 WHERE released = 0",
                rusqlite::params![
                    *sale_id as i64,
                    event.timestamp as i64,
                    content_id,
                    i64::from(*amount),
                ],
            )?;
        }
        LedgerEvent::ContentTotalDecrypted { content_id, total } => {
            conn.execute(
                "INSERT INTO content_reports (content_id, total, reported_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![content_id, *total as i64, event.timestamp as i64],
            )?;
        }
        LedgerEvent::DecryptionRequested { .. } | LedgerEvent::ContentTotalRequested { .. } => {}
    }
    Ok(())
}

/// A royalty row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RoyaltyRow {
    pub sale_id: SaleId,
    pub recorded_at: u64,
    pub released: bool,
    pub content_id: Option<String>,
    pub amount: Option<u32>,
    pub released_at: Option<u64>,
}

/// Per-content aggregate of released royalties.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ContentSummary {
    pub content_id: String,
    pub released_sales: u64,
    pub released_amount: u64,
}

/// A decrypted running total as reported by the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ContentReport {
    pub content_id: String,
    pub total: u64,
    pub reported_at: u64,
}

const ROYALTY_COLUMNS: &str =
    "sale_id, recorded_at, released, content_id, amount, released_at";

fn royalty_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RoyaltyRow> {
    Ok(RoyaltyRow {
        sale_id: row.get::<_, i64>(0)? as u64,
        recorded_at: row.get::<_, i64>(1)? as u64,
        released: row.get(2)?,
        content_id: row.get(3)?,
        amount: row.get::<_, Option<i64>>(4)?.map(|a| a as u32),
        released_at: row.get::<_, Option<i64>>(5)?.map(|t| t as u64),
    })
}

/// Look up one sale.
pub fn get(conn: &Connection, sale_id: SaleId) -> Result<RoyaltyRow> {
    conn.query_row(
        &format!("SELECT {ROYALTY_COLUMNS} FROM royalties WHERE sale_id = ?1"),
        [sale_id as i64],
        royalty_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("sale {sale_id}")),
        other => DbError::Sqlite(other),
    })
}

/// All sales, optionally filtered by release state, ordered by sale id.
pub fn list(conn: &Connection, released: Option<bool>) -> Result<Vec<RoyaltyRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ROYALTY_COLUMNS} FROM royalties
         WHERE ?1 IS NULL OR released = ?1
         ORDER BY sale_id ASC"
    ))?;
    let rows = stmt
        .query_map([released], royalty_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Released royalties grouped by content, ordered by content id.
pub fn summary_by_content(conn: &Connection) -> Result<Vec<ContentSummary>> {
    let mut stmt = conn.prepare(
        "SELECT content_id, COUNT(*), COALESCE(SUM(amount), 0)
         FROM royalties
         WHERE released = 1
         GROUP BY content_id
         ORDER BY content_id ASC",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(ContentSummary {
                content_id: row.get(0)?,
                released_sales: row.get::<_, i64>(1)? as u64,
                released_amount: row.get::<_, i64>(2)? as u64,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Most recent decrypted total for a content, if one was ever reported.
pub fn latest_report(conn: &Connection, content_id: &str) -> Result<Option<ContentReport>> {
    let report = conn
        .query_row(
            "SELECT content_id, total, reported_at FROM content_reports
             WHERE content_id = ?1
             ORDER BY id DESC
             LIMIT 1",
            [content_id],
            |row| {
                Ok(ContentReport {
                    content_id: row.get(0)?,
                    total: row.get::<_, i64>(1)? as u64,
                    reported_at: row.get::<_, i64>(2)? as u64,
                })
            },
        )
        .optional()?;
    Ok(report)
}
