//! Newline-delimited JSON-RPC 2.0 on `$data_dir/daemon.sock`.
//!
//! Anyone who can open the socket can call every method; filesystem
//! permissions on the data directory are the access control. Ledger errors
//! keep their own code range so clients can tell a rejected callback from a
//! malformed call.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tessera_ledger::LedgerError;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info, warn};

use crate::commands;
use crate::DaemonState;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    pub id: serde_json::Value,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC response.
#[derive(Debug, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RpcError {
    pub code: i32,
    /// Error name.
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcResponse {
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: serde_json::Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

impl RpcError {
    fn new(code: i32, message: &str, detail: Option<String>) -> Self {
        Self {
            code,
            message: message.to_string(),
            data: detail.map(|d| serde_json::json!({ "detail": d })),
        }
    }

    /// Parse error (-32700).
    pub fn parse_error() -> Self {
        Self::new(-32700, "PARSE_ERROR", None)
    }

    /// Invalid request (-32600).
    pub fn invalid_request() -> Self {
        Self::new(-32600, "INVALID_REQUEST", None)
    }

    /// Method not found (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: "METHOD_NOT_FOUND".to_string(),
            data: Some(serde_json::json!({"method": method})),
        }
    }

    /// Invalid params (-32602).
    pub fn invalid_params(detail: &str) -> Self {
        Self::new(-32602, "INVALID_PARAMS", Some(detail.to_string()))
    }

    /// Internal error (-32603).
    pub fn internal_error(detail: &str) -> Self {
        Self::new(-32603, "INTERNAL_ERROR", Some(detail.to_string()))
    }
}

/// Ledger errors occupy -32100..=-32111.
impl From<LedgerError> for RpcError {
    fn from(err: LedgerError) -> Self {
        let (code, name) = match &err {
            LedgerError::AlreadyDecrypted(_) => (-32100, "ALREADY_DECRYPTED"),
            LedgerError::UnknownRequest(_) => (-32101, "UNKNOWN_REQUEST"),
            LedgerError::AlreadyReleased(_) => (-32102, "ALREADY_RELEASED"),
            LedgerError::InvalidProof(_) => (-32103, "INVALID_PROOF"),
            LedgerError::MalformedAmount(_) => (-32104, "MALFORMED_AMOUNT"),
            LedgerError::ContentNotFound(_) => (-32105, "CONTENT_NOT_FOUND"),
            LedgerError::SaleNotFound(_) => (-32106, "SALE_NOT_FOUND"),
            LedgerError::CallbackMismatch { .. } => (-32107, "CALLBACK_MISMATCH"),
            LedgerError::MalformedPayload(_) => (-32108, "MALFORMED_PAYLOAD"),
            LedgerError::Unauthorized(_) => (-32109, "UNAUTHORIZED"),
            LedgerError::Oracle(_) => (-32110, "ORACLE_REJECTED"),
            LedgerError::HandleKind { .. } => (-32111, "WRONG_HANDLE_KIND"),
        };
        Self::new(code, name, Some(err.to_string()))
    }
}

/// Serves one task per client connection on a Unix socket.
pub struct RpcServer {
    state: Arc<DaemonState>,
    socket_path: PathBuf,
}

impl RpcServer {
    pub fn new(state: Arc<DaemonState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    /// Bind the socket, replacing a stale one, and accept until cancelled.
    pub async fn run(&self) -> anyhow::Result<()> {
        let _ = std::fs::remove_file(&self.socket_path);
        let listener = UnixListener::bind(&self.socket_path)?;
        info!(path = ?self.socket_path, "rpc socket bound");

        loop {
            let stream = match listener.accept().await {
                Ok((stream, _)) => stream,
                Err(e) => {
                    error!(error = %e, "accept failed");
                    continue;
                }
            };
            let state = Arc::clone(&self.state);
            tokio::spawn(async move {
                if let Err(e) = serve_client(state, stream).await {
                    warn!(error = %e, "rpc client dropped");
                }
            });
        }
    }
}

/// One request per line in, one response per line out, until EOF.
async fn serve_client(state: Arc<DaemonState>, stream: UnixStream) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(&state, &line).await;
        let mut encoded = serde_json::to_vec(&response)?;
        encoded.push(b'\n');
        writer.write_all(&encoded).await?;
    }
    Ok(())
}

/// Decode and validate one line, then dispatch it.
pub async fn handle_line(state: &Arc<DaemonState>, line: &str) -> RpcResponse {
    match serde_json::from_str::<RpcRequest>(line) {
        Ok(request) if request.jsonrpc == "2.0" => dispatch_request(state, request).await,
        Ok(request) => RpcResponse::error(request.id, RpcError::invalid_request()),
        Err(_) => RpcResponse::error(serde_json::Value::Null, RpcError::parse_error()),
    }
}

/// Dispatch a JSON-RPC request to the appropriate command handler.
pub async fn dispatch_request(state: &Arc<DaemonState>, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    let method = request.method.as_str();
    let params = &request.params;

    debug!(method, "rpc call");

    let result = match method {
        // Trusted encryption boundary
        "encrypt_amount" => commands::ledger::encrypt_amount(state, params).await,
        "encrypt_content_id" => commands::ledger::encrypt_content_id(state, params).await,

        // Ledger
        "record_sale" => commands::ledger::record_sale(state, params).await,
        "request_sale_decryption" => commands::ledger::request_sale_decryption(state, params).await,
        "request_content_total_decryption" => {
            commands::ledger::request_content_total_decryption(state, params).await
        }
        "get_decrypted_royalty" => commands::ledger::get_decrypted_royalty(state, params).await,
        "get_encrypted_content_total" => {
            commands::ledger::get_encrypted_content_total(state, params).await
        }
        "get_sale" => commands::ledger::get_sale(state, params).await,
        "list_content" => commands::ledger::list_content(state).await,
        "authorize_recorder" => commands::ledger::authorize_recorder(state, params).await,
        "revoke_recorder" => commands::ledger::revoke_recorder(state, params).await,

        // Diagnostics
        "get_pending_decryptions" => commands::diagnostics::get_pending_decryptions(state).await,
        "get_journal" => commands::diagnostics::get_journal(state, params).await,
        "get_royalty_projection" => {
            commands::diagnostics::get_royalty_projection(state, params).await
        }
        "get_daemon_status" => commands::diagnostics::get_daemon_status(state).await,

        _ => Err(RpcError::method_not_found(method)),
    };

    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => RpcResponse::error(id, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_types::ValueKind;

    #[test]
    fn test_rpc_error_codes() {
        let err = RpcError::method_not_found("unknown");
        assert_eq!(err.code, -32601);

        let err = RpcError::from(LedgerError::AlreadyDecrypted(1));
        assert_eq!(err.code, -32100);
        assert_eq!(err.message, "ALREADY_DECRYPTED");

        let err = RpcError::from(LedgerError::ContentNotFound("no-such-content".into()));
        assert_eq!(err.code, -32105);
        assert!(err.data.is_some());

        let err = RpcError::from(LedgerError::HandleKind {
            field: "amount",
            expected: ValueKind::U64,
            actual: ValueKind::Bytes,
        });
        assert_eq!(err.code, -32111);
        assert_eq!(err.message, "WRONG_HANDLE_KIND");
    }

    #[test]
    fn test_rpc_response_success() {
        let resp = RpcResponse::success(serde_json::json!(1), serde_json::json!({"sale_id": 1}));
        assert!(resp.result.is_some());
        assert!(resp.error.is_none());
    }

    #[test]
    fn test_rpc_response_error() {
        let resp = RpcResponse::error(serde_json::json!(1), RpcError::internal_error("test"));
        let json = serde_json::to_value(&resp).expect("serialize");
        assert!(json.get("result").is_none());
        assert_eq!(json["error"]["code"], -32603);
    }
}
