//! IPC command handlers.
//!
//! Each submodule implements the commands for one IPC category.

pub mod diagnostics;
pub mod ledger;

use serde_json::Value;
use tessera_types::{parse_account_id, AccountId, CiphertextHandle};

use crate::rpc::RpcError;

fn str_param<'a>(params: &'a Value, name: &str) -> Result<&'a str, RpcError> {
    params
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params(&format!("{name} required")))
}

fn u64_param(params: &Value, name: &str) -> Result<u64, RpcError> {
    params
        .get(name)
        .and_then(|v| v.as_u64())
        .ok_or_else(|| RpcError::invalid_params(&format!("{name} required")))
}

fn account_param(params: &Value, name: &str) -> Result<AccountId, RpcError> {
    parse_account_id(str_param(params, name)?)
        .map_err(|e| RpcError::invalid_params(&format!("{name}: {e}")))
}

fn handle_param(params: &Value, name: &str) -> Result<CiphertextHandle, RpcError> {
    str_param(params, name)?
        .parse()
        .map_err(|e| RpcError::invalid_params(&format!("{name}: {e}")))
}
