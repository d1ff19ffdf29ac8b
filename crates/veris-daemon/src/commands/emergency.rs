//! Emergency command handlers.

use std::sync::Arc;

use serde_json::Value;

use crate::commands::{parse_identity, persist_and_emit, unix_now};
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Activate emergency mode with an operator reason.
pub async fn activate(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = parse_identity(params, "caller")?;
    let reason = params
        .get("reason")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("reason required"))?
        .to_string();

    let mut service = state.service.lock().await;
    let signals = service
        .oracle
        .activate_emergency(caller, reason.clone(), unix_now())
        .map_err(|e| RpcError::from_oracle(&e))?;
    persist_and_emit(state, &mut service, &signals)?;

    Ok(serde_json::json!({
        "emergency_mode": true,
        "reason": reason,
    }))
}

/// Deactivate emergency mode.
pub async fn deactivate(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = parse_identity(params, "caller")?;

    let mut service = state.service.lock().await;
    let signals = service
        .oracle
        .deactivate_emergency(caller)
        .map_err(|e| RpcError::from_oracle(&e))?;
    persist_and_emit(state, &mut service, &signals)?;

    Ok(serde_json::json!({"emergency_mode": false}))
}

/// Reconcile while emergency mode is active.
pub async fn force_reconcile(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = parse_identity(params, "caller")?;

    let mut service = state.service.lock().await;
    let signals = service
        .oracle
        .force_reconcile(caller)
        .map_err(|e| RpcError::from_oracle(&e))?;
    persist_and_emit(state, &mut service, &signals)?;

    let global = service.oracle.global_state();
    Ok(serde_json::json!({
        "aggregate_actual": global.aggregate_actual,
        "expected_supply": global.expected_supply,
    }))
}
