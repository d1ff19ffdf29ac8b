//! RPC command handlers, split by capability class.
//!
//! Every mutating handler follows the same shape: parse params, take the
//! service lock, apply the operation to the in-memory oracle, persist a
//! snapshot, then broadcast the emitted signals. The single lock around
//! oracle and database keeps each operation one atomic, totally-ordered
//! step.

pub mod admin;
pub mod emergency;
pub mod query;
pub mod report;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

use veris_types::{IdentityId, Signal};

use crate::rpc::RpcError;
use crate::{DaemonState, OracleService};

/// Current Unix timestamp in seconds.
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Extract a hex-encoded 32-byte identity parameter.
pub(crate) fn parse_identity(
    params: &Value,
    key: &str,
) -> std::result::Result<IdentityId, RpcError> {
    let hex_str = params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))?;
    let bytes = hex::decode(hex_str)
        .map_err(|_| RpcError::invalid_params(&format!("{key} must be hex")))?;
    IdentityId::try_from(bytes.as_slice())
        .map_err(|_| RpcError::invalid_params(&format!("{key} must be 32 bytes of hex")))
}

/// Extract an unsigned integer parameter.
pub(crate) fn parse_u64(params: &Value, key: &str) -> std::result::Result<u64, RpcError> {
    params
        .get(key)
        .and_then(|v| v.as_u64())
        .ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))
}

/// Persist the oracle state, then broadcast the operation's signals.
pub(crate) fn persist_and_emit(
    state: &Arc<DaemonState>,
    service: &mut OracleService,
    signals: &[Signal],
) -> std::result::Result<(), RpcError> {
    veris_db::snapshot::save(&mut service.db, &service.oracle)
        .map_err(|e| RpcError::internal_error(&format!("snapshot persist failed: {e}")))?;
    let now = unix_now();
    for signal in signals {
        state.event_bus.emit_signal(signal, now);
    }
    Ok(())
}
