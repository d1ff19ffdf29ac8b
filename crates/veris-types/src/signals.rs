//! Outbound oracle signals.
//!
//! Every mutating oracle operation returns the signals it emitted. The
//! daemon forwards them to event-bus subscribers; tests assert on them
//! directly. Signals are advisory: the oracle never reacts to its own
//! deviation signals, reaction is left to an external operator.

use serde::{Deserialize, Serialize};

use crate::{Amount, ChainId};

/// Scope of a deviation signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviationScope {
    /// Aggregate actual supply versus the configured expected supply.
    Global,
    /// One chain's newly finalized total versus its prior recorded total.
    Chain(ChainId),
}

/// A signal emitted by an oracle operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    /// A supply report reached quorum and was written to the ledger.
    SupplyFinalized {
        chain: ChainId,
        total_supply: Amount,
        locked_supply: Amount,
        circulating_supply: Amount,
    },
    /// A deviation at or above the configured threshold was observed.
    Deviation {
        scope: DeviationScope,
        observed: Amount,
        reference: Amount,
        deviation_bps: u64,
    },
    /// An administrative reconciliation acknowledged the current aggregate.
    Reconciled {
        aggregate_actual: Amount,
        expected: Amount,
    },
    /// The configured expected supply was replaced.
    ExpectedSupplyChanged { old: Amount, new: Amount },
    /// Emergency mode was activated with the given operator reason.
    EmergencyActivated { reason: String },
    /// Emergency mode was deactivated.
    EmergencyDeactivated,
    /// Report submission was paused.
    Paused,
    /// Report submission was resumed.
    Unpaused,
}

impl Signal {
    /// Wire-level event type name for this signal.
    pub fn event_type(&self) -> &'static str {
        match self {
            Signal::SupplyFinalized { .. } => "SupplyFinalized",
            Signal::Deviation { scope: DeviationScope::Global, .. } => "GlobalSupplyDeviation",
            Signal::Deviation { scope: DeviationScope::Chain(_), .. } => "ChainSupplyDeviation",
            Signal::Reconciled { .. } => "SupplyReconciled",
            Signal::ExpectedSupplyChanged { .. } => "ExpectedSupplyChanged",
            Signal::EmergencyActivated { .. } => "EmergencyActivated",
            Signal::EmergencyDeactivated => "EmergencyDeactivated",
            Signal::Paused => "OraclePaused",
            Signal::Unpaused => "OracleUnpaused",
        }
    }
}
