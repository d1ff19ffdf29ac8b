//! Read-only query handlers.

use std::sync::Arc;

use serde_json::Value;

use veris_oracle::ReportTuple;

use crate::commands::{parse_identity, parse_u64};
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// List tracked chains.
pub async fn get_chains(state: &Arc<DaemonState>) -> Result {
    let service = state.service.lock().await;
    Ok(serde_json::json!({"chains": service.oracle.chains()}))
}

/// Per-chain supply record and nonce cursor.
pub async fn get_supply(state: &Arc<DaemonState>, params: &Value) -> Result {
    let chain = parse_u64(params, "chain")?;

    let service = state.service.lock().await;
    let cursor = service.oracle.nonce_cursor(chain);
    let record = service.oracle.supply_record(chain).map(|r| {
        serde_json::json!({
            "total_supply": r.total_supply,
            "locked_supply": r.locked_supply,
            "circulating_supply": r.circulating_supply,
            "last_update_time": r.last_update_time,
        })
    });
    Ok(serde_json::json!({
        "chain": chain,
        "record": record,
        "nonce_cursor": cursor,
    }))
}

/// Global supply state.
pub async fn get_global_state(state: &Arc<DaemonState>) -> Result {
    let service = state.service.lock().await;
    let global = service.oracle.global_state();
    let emergency = service.oracle.emergency();
    Ok(serde_json::json!({
        "expected_supply": global.expected_supply,
        "aggregate_actual": global.aggregate_actual,
        "deviation_flag": global.deviation_flag,
        "deviation_threshold_bps": global.deviation_threshold_bps,
        "required_signatures": global.required_signatures,
        "paused": emergency.is_paused(),
        "emergency_mode": emergency.is_active(),
        "emergency_reason": emergency.reason(),
    }))
}

/// Introspect a pending entry by its full report tuple.
pub async fn get_pending(state: &Arc<DaemonState>, params: &Value) -> Result {
    let tuple = ReportTuple {
        chain: parse_u64(params, "chain")?,
        nonce: parse_u64(params, "nonce")?,
        total_supply: parse_u64(params, "total_supply")?,
        locked_supply: parse_u64(params, "locked_supply")?,
    };

    let service = state.service.lock().await;
    match service.oracle.pending_status(&tuple) {
        Some(status) => Ok(serde_json::json!({
            "signatures": status.signatures,
            "required": status.required,
            "signers": status
                .signers
                .iter()
                .map(hex::encode)
                .collect::<Vec<String>>(),
        })),
        None => Ok(Value::Null),
    }
}

/// Bridge-registration membership query.
pub async fn is_bridge_registered(state: &Arc<DaemonState>, params: &Value) -> Result {
    let chain = parse_u64(params, "chain")?;
    let bridge = parse_identity(params, "bridge")?;

    let service = state.service.lock().await;
    Ok(serde_json::json!({
        "registered": service.oracle.is_bridge_registered(chain, &bridge),
    }))
}

/// Capabilities held by an identity.
pub async fn get_roles(state: &Arc<DaemonState>, params: &Value) -> Result {
    let identity = parse_identity(params, "identity")?;

    let service = state.service.lock().await;
    let roles: Vec<&str> = service
        .oracle
        .roles_of(&identity)
        .iter()
        .map(|r| r.as_str())
        .collect();
    Ok(serde_json::json!({"roles": roles}))
}
