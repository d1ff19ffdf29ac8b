//! # veris-oracle
//!
//! Supply consensus core for the veris bridged-token oracle.
//!
//! Independent reporter identities attest per-chain supply figures.
//! Matching reports accumulate signatures in a pending table; the report
//! that brings a tuple to the required signer count finalizes it into the
//! authoritative supply ledger, advances the chain's nonce cursor, and
//! re-evaluates the aggregate supply against the configured expected
//! supply. "Signature" here means a distinct authorized caller, not a
//! cryptographic signature.
//!
//! ## Modules
//!
//! - [`access`] — per-identity capability sets
//! - [`registry`] — tracked-chain registry
//! - [`bridges`] — per-chain bridge identity registry
//! - [`pending`] — pending report tuples and signer accounting
//! - [`ledger`] — authoritative supply records and nonce cursors
//! - [`deviation`] — basis-point deviation arithmetic
//! - [`emergency`] — pause gate and emergency mode
//! - [`oracle`] — the [`SupplyOracle`] state machine tying it together

pub mod access;
pub mod bridges;
pub mod deviation;
pub mod emergency;
pub mod ledger;
pub mod oracle;
pub mod pending;
pub mod registry;

pub use access::Role;
pub use ledger::ChainSupplyRecord;
pub use oracle::{
    GlobalSupplyState, OracleGenesis, OracleSnapshot, PendingStatus, SubmitReceipt, SubmitStatus,
    SupplyOracle,
};
pub use pending::ReportTuple;

use veris_types::{Amount, ChainId, Nonce};

/// Error types for oracle operations.
///
/// Every rejection carries a distinguishable kind so callers can branch on
/// cause. A rejected operation leaves all oracle state unchanged.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    /// Caller lacks the capability required for the operation.
    #[error("caller lacks the {0} capability")]
    Unauthorized(Role),

    /// The chain is not tracked by the oracle.
    #[error("chain {0} is not tracked")]
    UnknownChain(ChainId),

    /// The chain is already tracked.
    #[error("chain {0} is already tracked")]
    ChainAlreadyTracked(ChainId),

    /// A report's locked supply exceeded its total supply.
    #[error("locked supply {locked} exceeds total supply {total}")]
    LockedExceedsTotal { locked: Amount, total: Amount },

    /// The expected supply must be nonzero.
    #[error("expected supply must be nonzero")]
    ZeroExpectedSupply,

    /// The required signature count must be nonzero.
    #[error("required signature count must be nonzero")]
    ZeroSignatureCount,

    /// The bridge identity is already registered for the chain.
    #[error("bridge is already registered for chain {chain}")]
    DuplicateBridge { chain: ChainId },

    /// The report nonce does not advance past the chain's cursor.
    #[error("stale nonce {nonce} for chain {chain} (cursor at {cursor})")]
    StaleNonce {
        chain: ChainId,
        nonce: Nonce,
        cursor: Nonce,
    },

    /// The caller already signed this exact report tuple.
    #[error("caller already signed this report")]
    DuplicateSignature,

    /// Report submission is paused.
    #[error("oracle is paused")]
    Paused,

    /// The operation requires active emergency mode.
    #[error("emergency mode is not active")]
    EmergencyNotActive,

    /// Arithmetic overflow while aggregating supply.
    #[error("supply aggregation overflow")]
    Overflow,
}

/// Convenience result type for oracle operations.
pub type Result<T> = std::result::Result<T, OracleError>;
