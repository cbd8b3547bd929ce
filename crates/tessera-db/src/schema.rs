//! SQL schema, one script per version.
//!
//! `MIGRATIONS[n]` takes a database from `user_version = n` to `n + 1`.
//! Scripts are append-only once released.

pub const MIGRATIONS: &[&str] = &[V1];

/// Journal, royalty read model, decrypted content totals.
const V1: &str = r#"
-- ============================================================
-- Journal: every ledger notification, in arrival order
-- ============================================================

CREATE TABLE IF NOT EXISTS events (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    event_type TEXT NOT NULL,
    sale_id INTEGER,
    timestamp INTEGER NOT NULL,
    payload TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_sale ON events(sale_id);
CREATE INDEX IF NOT EXISTS idx_events_type ON events(event_type);

-- ============================================================
-- Read model: one row per recorded sale
-- ============================================================

CREATE TABLE IF NOT EXISTS royalties (
    sale_id INTEGER PRIMARY KEY,
    recorded_at INTEGER NOT NULL,
    released INTEGER NOT NULL DEFAULT 0,
    content_id TEXT,
    amount INTEGER,
    released_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_royalties_content ON royalties(content_id);

-- ============================================================
-- Decrypted content totals, as reported
-- ============================================================

CREATE TABLE IF NOT EXISTS content_reports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    content_id TEXT NOT NULL,
    total INTEGER NOT NULL,
    reported_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_content_reports_content ON content_reports(content_id);
"#;
