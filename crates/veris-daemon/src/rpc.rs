//! JSON-RPC server over Unix socket.
//!
//! Listens on a Unix domain socket, accepts connections, and dispatches
//! line-delimited JSON-RPC method calls to the command handlers. Every
//! oracle error maps to a distinct error code so callers can branch on
//! cause.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tracing::{debug, error, info, warn};

use veris_oracle::OracleError;

use crate::commands;
use crate::DaemonState;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Method name.
    pub method: String,
    /// Parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC response.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    /// JSON-RPC version.
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Result or error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RpcError {
    /// Error code.
    pub code: i32,
    /// Error name.
    pub message: String,
    /// Optional structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcResponse {
    /// Create a success response.
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
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
    // Standard JSON-RPC errors

    /// Parse error (-32700).
    pub fn parse_error() -> Self {
        Self {
            code: -32700,
            message: "PARSE_ERROR".to_string(),
            data: None,
        }
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
        Self {
            code: -32602,
            message: "INVALID_PARAMS".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    /// Internal error (-32603).
    pub fn internal_error(detail: &str) -> Self {
        Self {
            code: -32603,
            message: "INTERNAL_ERROR".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    /// Map an oracle rejection to its wire error.
    pub fn from_oracle(err: &OracleError) -> Self {
        let (code, message, data) = match err {
            OracleError::Unauthorized(role) => (
                -32020,
                "UNAUTHORIZED",
                Some(serde_json::json!({"required_role": role.as_str()})),
            ),
            OracleError::UnknownChain(chain) => (
                -32021,
                "UNKNOWN_CHAIN",
                Some(serde_json::json!({"chain": chain})),
            ),
            OracleError::ChainAlreadyTracked(chain) => (
                -32022,
                "CHAIN_ALREADY_TRACKED",
                Some(serde_json::json!({"chain": chain})),
            ),
            OracleError::LockedExceedsTotal { locked, total } => (
                -32023,
                "LOCKED_EXCEEDS_TOTAL",
                Some(serde_json::json!({"locked": locked, "total": total})),
            ),
            OracleError::ZeroExpectedSupply => (-32024, "ZERO_EXPECTED_SUPPLY", None),
            OracleError::ZeroSignatureCount => (-32025, "ZERO_SIGNATURE_COUNT", None),
            OracleError::DuplicateBridge { chain } => (
                -32026,
                "DUPLICATE_BRIDGE",
                Some(serde_json::json!({"chain": chain})),
            ),
            OracleError::StaleNonce {
                chain,
                nonce,
                cursor,
            } => (
                -32027,
                "STALE_NONCE",
                Some(serde_json::json!({"chain": chain, "nonce": nonce, "cursor": cursor})),
            ),
            OracleError::DuplicateSignature => (-32028, "DUPLICATE_SIGNATURE", None),
            OracleError::Paused => (-32029, "ORACLE_PAUSED", None),
            OracleError::EmergencyNotActive => (-32030, "EMERGENCY_NOT_ACTIVE", None),
            OracleError::Overflow => (-32031, "AGGREGATION_OVERFLOW", None),
        };
        Self {
            code,
            message: message.to_string(),
            data,
        }
    }
}

/// The RPC server.
pub struct RpcServer {
    state: Arc<DaemonState>,
    socket_path: PathBuf,
}

impl RpcServer {
    /// Create a new RPC server.
    pub fn new(state: Arc<DaemonState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) -> anyhow::Result<()> {
        // Remove stale socket file
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        info!("RPC server listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(state, stream).await {
                            warn!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single client connection.
async fn handle_connection(
    state: Arc<DaemonState>,
    stream: tokio::net::UnixStream,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break; // EOF
        }

        let response = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) => dispatch_request(state.clone(), request).await,
            Err(_) => RpcResponse::error(serde_json::Value::Null, RpcError::parse_error()),
        };

        let mut response_json = serde_json::to_string(&response)?;
        response_json.push('\n');
        writer.write_all(response_json.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}

/// Dispatch a JSON-RPC request to the appropriate command handler.
async fn dispatch_request(state: Arc<DaemonState>, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    let method = request.method.as_str();
    let params = &request.params;

    debug!("Dispatching RPC method: {}", method);

    let result = match method {
        // Report submission
        "oracle.submit_report" => commands::report::submit_report(&state, params).await,

        // Administration
        "oracle.add_chain" => commands::admin::add_chain(&state, params).await,
        "oracle.remove_chain" => commands::admin::remove_chain(&state, params).await,
        "oracle.register_bridge" => commands::admin::register_bridge(&state, params).await,
        "oracle.grant_role" => commands::admin::grant_role(&state, params).await,
        "oracle.revoke_role" => commands::admin::revoke_role(&state, params).await,
        "oracle.update_expected_supply" => {
            commands::admin::update_expected_supply(&state, params).await
        }
        "oracle.update_required_signatures" => {
            commands::admin::update_required_signatures(&state, params).await
        }
        "oracle.update_deviation_threshold" => {
            commands::admin::update_deviation_threshold(&state, params).await
        }
        "oracle.reconcile" => commands::admin::reconcile(&state, params).await,
        "oracle.pause" => commands::admin::pause(&state, params).await,
        "oracle.unpause" => commands::admin::unpause(&state, params).await,

        // Emergency
        "oracle.emergency_activate" => commands::emergency::activate(&state, params).await,
        "oracle.emergency_deactivate" => commands::emergency::deactivate(&state, params).await,
        "oracle.force_reconcile" => commands::emergency::force_reconcile(&state, params).await,

        // Queries
        "oracle.get_chains" => commands::query::get_chains(&state).await,
        "oracle.get_supply" => commands::query::get_supply(&state, params).await,
        "oracle.get_global_state" => commands::query::get_global_state(&state).await,
        "oracle.get_pending" => commands::query::get_pending(&state, params).await,
        "oracle.is_bridge_registered" => {
            commands::query::is_bridge_registered(&state, params).await
        }
        "oracle.get_roles" => commands::query::get_roles(&state, params).await,

        _ => Err(RpcError::method_not_found(method)),
    };

    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(error) => RpcResponse::error(id, error),
    }
}
