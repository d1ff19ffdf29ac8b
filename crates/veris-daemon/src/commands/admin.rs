//! Admin command handlers.

use std::sync::Arc;

use serde_json::Value;

use veris_oracle::Role;

use crate::commands::{parse_identity, parse_u64, persist_and_emit};
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Extract and parse a role parameter.
fn parse_role(params: &Value) -> std::result::Result<Role, RpcError> {
    let name = params
        .get("role")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("role required"))?;
    Role::parse(name)
        .ok_or_else(|| RpcError::invalid_params("role must be reporter, admin, or emergency"))
}

/// Start tracking a chain.
pub async fn add_chain(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = parse_identity(params, "caller")?;
    let chain = parse_u64(params, "chain")?;

    let mut service = state.service.lock().await;
    service
        .oracle
        .add_chain(caller, chain)
        .map_err(|e| RpcError::from_oracle(&e))?;
    persist_and_emit(state, &mut service, &[])?;

    Ok(serde_json::json!({"chain": chain}))
}

/// Stop tracking a chain.
pub async fn remove_chain(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = parse_identity(params, "caller")?;
    let chain = parse_u64(params, "chain")?;

    let mut service = state.service.lock().await;
    service
        .oracle
        .remove_chain(caller, chain)
        .map_err(|e| RpcError::from_oracle(&e))?;
    persist_and_emit(state, &mut service, &[])?;

    Ok(serde_json::json!({"chain": chain}))
}

/// Register a bridge identity for a tracked chain.
pub async fn register_bridge(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = parse_identity(params, "caller")?;
    let chain = parse_u64(params, "chain")?;
    let bridge = parse_identity(params, "bridge")?;

    let mut service = state.service.lock().await;
    service
        .oracle
        .register_bridge(caller, chain, bridge)
        .map_err(|e| RpcError::from_oracle(&e))?;
    persist_and_emit(state, &mut service, &[])?;

    Ok(serde_json::json!({
        "chain": chain,
        "bridge": hex::encode(bridge),
    }))
}

/// Grant a capability to an identity.
pub async fn grant_role(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = parse_identity(params, "caller")?;
    let identity = parse_identity(params, "identity")?;
    let role = parse_role(params)?;

    let mut service = state.service.lock().await;
    service
        .oracle
        .grant_role(caller, identity, role)
        .map_err(|e| RpcError::from_oracle(&e))?;
    persist_and_emit(state, &mut service, &[])?;

    Ok(serde_json::json!({
        "identity": hex::encode(identity),
        "role": role.as_str(),
    }))
}

/// Revoke a capability from an identity.
pub async fn revoke_role(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = parse_identity(params, "caller")?;
    let identity = parse_identity(params, "identity")?;
    let role = parse_role(params)?;

    let mut service = state.service.lock().await;
    service
        .oracle
        .revoke_role(caller, identity, role)
        .map_err(|e| RpcError::from_oracle(&e))?;
    persist_and_emit(state, &mut service, &[])?;

    Ok(serde_json::json!({
        "identity": hex::encode(identity),
        "role": role.as_str(),
    }))
}

/// Replace the expected supply.
pub async fn update_expected_supply(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = parse_identity(params, "caller")?;
    let new_value = parse_u64(params, "expected_supply")?;

    let mut service = state.service.lock().await;
    let signals = service
        .oracle
        .update_expected_supply(caller, new_value)
        .map_err(|e| RpcError::from_oracle(&e))?;
    persist_and_emit(state, &mut service, &signals)?;

    Ok(serde_json::json!({"expected_supply": new_value}))
}

/// Set the required signature count.
pub async fn update_required_signatures(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = parse_identity(params, "caller")?;
    let count = parse_u64(params, "count")?;
    let count = u32::try_from(count)
        .map_err(|_| RpcError::invalid_params("count out of range"))?;

    let mut service = state.service.lock().await;
    service
        .oracle
        .update_required_signatures(caller, count)
        .map_err(|e| RpcError::from_oracle(&e))?;
    persist_and_emit(state, &mut service, &[])?;

    Ok(serde_json::json!({"required_signatures": count}))
}

/// Set the deviation alarm threshold.
pub async fn update_deviation_threshold(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = parse_identity(params, "caller")?;
    let bps = parse_u64(params, "bps")?;

    let mut service = state.service.lock().await;
    service
        .oracle
        .update_deviation_threshold(caller, bps)
        .map_err(|e| RpcError::from_oracle(&e))?;
    persist_and_emit(state, &mut service, &[])?;

    Ok(serde_json::json!({"deviation_threshold_bps": bps}))
}

/// Reconcile the aggregate and clear the deviation flag.
pub async fn reconcile(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = parse_identity(params, "caller")?;

    let mut service = state.service.lock().await;
    let signals = service
        .oracle
        .reconcile(caller)
        .map_err(|e| RpcError::from_oracle(&e))?;
    persist_and_emit(state, &mut service, &signals)?;

    let global = service.oracle.global_state();
    Ok(serde_json::json!({
        "aggregate_actual": global.aggregate_actual,
        "expected_supply": global.expected_supply,
    }))
}

/// Pause report submission.
pub async fn pause(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = parse_identity(params, "caller")?;

    let mut service = state.service.lock().await;
    let signals = service
        .oracle
        .pause(caller)
        .map_err(|e| RpcError::from_oracle(&e))?;
    persist_and_emit(state, &mut service, &signals)?;

    Ok(serde_json::json!({"paused": true}))
}

/// Resume report submission.
pub async fn unpause(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = parse_identity(params, "caller")?;

    let mut service = state.service.lock().await;
    let signals = service
        .oracle
        .unpause(caller)
        .map_err(|e| RpcError::from_oracle(&e))?;
    persist_and_emit(state, &mut service, &signals)?;

    Ok(serde_json::json!({"paused": false}))
}
