//! Reporter command handlers.

use std::sync::Arc;

use serde_json::Value;

use veris_oracle::SubmitStatus;

use crate::commands::{parse_identity, parse_u64, persist_and_emit, unix_now};
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Submit a supply report for a chain.
pub async fn submit_report(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = parse_identity(params, "caller")?;
    let chain = parse_u64(params, "chain")?;
    let total_supply = parse_u64(params, "total_supply")?;
    let locked_supply = parse_u64(params, "locked_supply")?;
    let nonce = parse_u64(params, "nonce")?;

    let mut service = state.service.lock().await;
    let receipt = service
        .oracle
        .submit_report(caller, chain, total_supply, locked_supply, nonce, unix_now())
        .map_err(|e| RpcError::from_oracle(&e))?;
    persist_and_emit(state, &mut service, &receipt.signals)?;

    match receipt.status {
        SubmitStatus::Pending {
            signatures,
            required,
        } => Ok(serde_json::json!({
            "status": "pending",
            "signatures": signatures,
            "required": required,
        })),
        SubmitStatus::Finalized(record) => Ok(serde_json::json!({
            "status": "finalized",
            "chain": chain,
            "total_supply": record.total_supply,
            "locked_supply": record.locked_supply,
            "circulating_supply": record.circulating_supply,
            "last_update_time": record.last_update_time,
        })),
    }
}
