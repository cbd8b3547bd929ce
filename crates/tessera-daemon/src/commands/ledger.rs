//! Ledger command handlers.
//!
//! Callers identify themselves with a hex account id. The Unix socket is the
//! trust boundary; the access policy decides what each account may do.

use std::sync::Arc;

use serde_json::Value;
use tessera_ledger::LedgerError;
use tessera_oracle::{Coprocessor, OracleError};

use super::{account_param, handle_param, str_param, u64_param};
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

fn oracle_error(err: OracleError) -> RpcError {
    RpcError::from(LedgerError::from(err))
}

/// Encrypt a sale amount. Amounts must fit in 32 bits.
pub async fn encrypt_amount(state: &Arc<DaemonState>, params: &Value) -> Result {
    let amount = u64_param(params, "amount")?;
    if amount > u64::from(u32::MAX) {
        return Err(RpcError::invalid_params("amount must fit in u32"));
    }
    let handle = state
        .oracle
        .coprocessor()
        .encrypt_u64(amount)
        .map_err(oracle_error)?;
    Ok(serde_json::json!({ "handle": handle.to_string() }))
}

/// Encrypt a content identifier.
pub async fn encrypt_content_id(state: &Arc<DaemonState>, params: &Value) -> Result {
    let content_id = str_param(params, "content_id")?;
    let handle = state
        .oracle
        .coprocessor()
        .encrypt_bytes(content_id.as_bytes())
        .map_err(oracle_error)?;
    Ok(serde_json::json!({ "handle": handle.to_string() }))
}

pub async fn record_sale(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = account_param(params, "caller")?;
    let amount = handle_param(params, "encrypted_amount")?;
    let content = handle_param(params, "encrypted_content_id")?;

    let sale_id = state
        .ledger
        .lock()
        .await
        .record_sale(&caller, amount, content)?;
    Ok(serde_json::json!({ "sale_id": sale_id }))
}

pub async fn request_sale_decryption(state: &Arc<DaemonState>, params: &Value) -> Result {
    let sale_id = u64_param(params, "sale_id")?;
    let request_id = state
        .ledger
        .lock()
        .await
        .request_sale_decryption(sale_id)?;
    Ok(serde_json::json!({ "request_id": request_id }))
}

pub async fn request_content_total_decryption(state: &Arc<DaemonState>, params: &Value) -> Result {
    let content_id = str_param(params, "content_id")?;
    let request_id = state
        .ledger
        .lock()
        .await
        .request_content_total_decryption(content_id)?;
    Ok(serde_json::json!({ "request_id": request_id }))
}

/// Royalty record for a sale. `released = false` means not yet available.
pub async fn get_decrypted_royalty(state: &Arc<DaemonState>, params: &Value) -> Result {
    let sale_id = u64_param(params, "sale_id")?;
    let ledger = state.ledger.lock().await;
    let royalty = ledger
        .get_decrypted_royalty(sale_id)
        .ok_or(LedgerError::SaleNotFound(sale_id))?;
    Ok(serde_json::json!({
        "sale_id": sale_id,
        "content_id": royalty.content_id,
        "amount": royalty.amount,
        "released": royalty.released,
    }))
}

pub async fn get_encrypted_content_total(state: &Arc<DaemonState>, params: &Value) -> Result {
    let content_id = str_param(params, "content_id")?;
    let handle = state
        .ledger
        .lock()
        .await
        .get_encrypted_content_total(content_id)
        .ok_or_else(|| LedgerError::ContentNotFound(content_id.to_string()))?;
    Ok(serde_json::json!({
        "content_id": content_id,
        "handle": handle.to_string(),
    }))
}

pub async fn get_sale(state: &Arc<DaemonState>, params: &Value) -> Result {
    let sale_id = u64_param(params, "sale_id")?;
    let ledger = state.ledger.lock().await;
    let sale = ledger
        .get_sale(sale_id)
        .ok_or(LedgerError::SaleNotFound(sale_id))?;
    Ok(serde_json::json!({
        "sale_id": sale.sale_id,
        "encrypted_amount": sale.encrypted_amount.to_string(),
        "encrypted_content_id": sale.encrypted_content_id.to_string(),
        "created_at": sale.created_at,
    }))
}

/// Content identifiers with a running total, in first-release order.
pub async fn list_content(state: &Arc<DaemonState>) -> Result {
    let ledger = state.ledger.lock().await;
    let items: Vec<Value> = ledger
        .content_ids()
        .iter()
        .map(|content_id| {
            serde_json::json!({
                "content_id": content_id,
                "handle": ledger
                    .get_encrypted_content_total(content_id)
                    .map(|h| h.to_string()),
            })
        })
        .collect();
    Ok(serde_json::json!(items))
}

pub async fn authorize_recorder(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = account_param(params, "caller")?;
    let account = account_param(params, "account")?;
    let added = state
        .ledger
        .lock()
        .await
        .authorize_recorder(&caller, account)?;
    Ok(serde_json::json!({ "added": added }))
}

pub async fn revoke_recorder(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = account_param(params, "caller")?;
    let account = account_param(params, "account")?;
    let removed = state
        .ledger
        .lock()
        .await
        .revoke_recorder(&caller, &account)?;
    Ok(serde_json::json!({ "removed": removed }))
}
