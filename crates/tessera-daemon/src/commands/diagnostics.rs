//! Diagnostics command handlers.

use std::sync::Arc;

use serde_json::Value;
use tessera_db::queries::{journal, royalties};

use super::u64_param;
use crate::events::EventFilter;
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Largest page `get_journal` returns.
const MAX_JOURNAL_PAGE: u32 = 1000;

fn db_error(e: tessera_db::DbError) -> RpcError {
    RpcError::internal_error(&format!("db error: {e}"))
}

/// Requests queued at the oracle and requests the ledger is still tracking.
pub async fn get_pending_decryptions(state: &Arc<DaemonState>) -> Result {
    let queued = state
        .oracle
        .pending()
        .map_err(|e| RpcError::internal_error(&e.to_string()))?;
    let tracked: Vec<Value> = state
        .ledger
        .lock()
        .await
        .outstanding_requests()
        .into_iter()
        .map(|(request_id, request)| {
            serde_json::json!({ "request_id": request_id, "request": request })
        })
        .collect();
    Ok(serde_json::json!({
        "oracle_queue": queued,
        "ledger_outstanding": tracked,
    }))
}

/// Page through the event journal.
///
/// Params: `after_seq` (default 0), `limit` (default 100), optional `filter`.
pub async fn get_journal(state: &Arc<DaemonState>, params: &Value) -> Result {
    let after_seq = params.get("after_seq").and_then(|v| v.as_u64()).unwrap_or(0);
    let limit = params
        .get("limit")
        .and_then(|v| v.as_u64())
        .map_or(100, |l| l.min(u64::from(MAX_JOURNAL_PAGE)) as u32);
    let filter: EventFilter = match params.get("filter") {
        Some(f) => serde_json::from_value(f.clone())
            .map_err(|e| RpcError::invalid_params(&format!("filter: {e}")))?,
        None => EventFilter::default(),
    };

    let db = state.db.lock().await;
    let entries = journal::list(&db, after_seq, limit).map_err(db_error)?;
    let matching: Vec<_> = entries
        .into_iter()
        .filter(|entry| filter.matches(&entry.event))
        .collect();
    Ok(serde_json::json!(matching))
}

/// The royalty read model.
///
/// Params: optional `released` (bool) to filter rows, optional `sale_id` for
/// a single row.
pub async fn get_royalty_projection(state: &Arc<DaemonState>, params: &Value) -> Result {
    let db = state.db.lock().await;

    if params.get("sale_id").is_some() {
        let sale_id = u64_param(params, "sale_id")?;
        let row = royalties::get(&db, sale_id).map_err(|e| match e {
            tessera_db::DbError::NotFound(what) => {
                RpcError::invalid_params(&format!("{what} not in projection"))
            }
            other => db_error(other),
        })?;
        return Ok(serde_json::json!(row));
    }

    let released = params.get("released").and_then(|v| v.as_bool());
    let rows = royalties::list(&db, released).map_err(db_error)?;
    let mut by_content = Vec::new();
    for summary in royalties::summary_by_content(&db).map_err(db_error)? {
        let latest = royalties::latest_report(&db, &summary.content_id).map_err(db_error)?;
        by_content.push(serde_json::json!({
            "content_id": summary.content_id,
            "released_sales": summary.released_sales,
            "released_amount": summary.released_amount,
            "latest_decrypted_total": latest,
        }));
    }

    Ok(serde_json::json!({
        "royalties": rows,
        "by_content": by_content,
    }))
}

pub async fn get_daemon_status(state: &Arc<DaemonState>) -> Result {
    let (sales, content_count, owner, open_recording) = {
        let ledger = state.ledger.lock().await;
        (
            ledger.sale_count(),
            ledger.content_ids().len(),
            hex::encode(ledger.policy().owner()),
            ledger.policy().is_open(),
        )
    };
    let journal_seq = {
        let db = state.db.lock().await;
        journal::last_seq(&db).map_err(db_error)?
    };
    let oracle_queue = state
        .oracle
        .pending_count()
        .map_err(|e| RpcError::internal_error(&e.to_string()))?;

    Ok(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.uptime_secs(),
        "operator": hex::encode(state.operator),
        "owner": owner,
        "open_recording": open_recording,
        "sales": sales,
        "content_count": content_count,
        "oracle_queue": oracle_queue,
        "oracle_signers": state.oracle.signer_set().signers().len(),
        "oracle_threshold": state.oracle.signer_set().threshold(),
        "oracle_decryption_bound": state.oracle.decryption_bound(),
        "events_emitted": state.event_bus.sequence(),
        "journal_seq": journal_seq,
    }))
}
