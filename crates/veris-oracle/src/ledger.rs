//! Authoritative supply records and nonce cursors.
//!
//! One record per chain, created at first finalize and overwritten on
//! every subsequent finalize. Records survive chain removal and stay
//! queryable; only the tracked set decides what the aggregate sums.
//! Cursors are monotonic: once nonce `n` finalizes for a chain, nothing
//! at or below `n` may finalize again.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use veris_types::{Amount, ChainId, Nonce};

use crate::{OracleError, Result};

/// Authoritative supply record for one chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSupplyRecord {
    /// Finalized total supply.
    pub total_supply: Amount,
    /// Finalized locked supply.
    pub locked_supply: Amount,
    /// Derived: total minus locked.
    pub circulating_supply: Amount,
    /// Unix timestamp of the finalize that wrote this record.
    pub last_update_time: u64,
}

/// Per-chain supply records plus finalized nonce cursors.
#[derive(Clone, Debug, Default)]
pub struct SupplyLedger {
    records: BTreeMap<ChainId, ChainSupplyRecord>,
    cursors: BTreeMap<ChainId, Nonce>,
}

impl SupplyLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest finalized nonce for a chain (0 if none).
    pub fn cursor(&self, chain: ChainId) -> Nonce {
        self.cursors.get(&chain).copied().unwrap_or(0)
    }

    /// The chain's supply record, if one has ever finalized.
    pub fn record(&self, chain: ChainId) -> Option<ChainSupplyRecord> {
        self.records.get(&chain).copied()
    }

    /// Write the chain's record and advance its cursor.
    ///
    /// Callers must have validated `locked <= total` and `nonce` strictly
    /// above the current cursor. Returns the previously recorded total
    /// supply (0 on first write), which per-chain deviation compares
    /// against.
    pub fn finalize(
        &mut self,
        chain: ChainId,
        total: Amount,
        locked: Amount,
        nonce: Nonce,
        now: u64,
    ) -> Amount {
        let prior = self
            .records
            .get(&chain)
            .map(|r| r.total_supply)
            .unwrap_or(0);
        self.records.insert(
            chain,
            ChainSupplyRecord {
                total_supply: total,
                locked_supply: locked,
                circulating_supply: total.saturating_sub(locked),
                last_update_time: now,
            },
        );
        self.cursors.insert(chain, nonce);
        prior
    }

    /// Sum of recorded total supply over the given chains.
    ///
    /// Chains without a record contribute 0.
    ///
    /// # Errors
    ///
    /// - [`OracleError::Overflow`] if the sum exceeds the amount range
    pub fn aggregate_total<I>(&self, chains: I) -> Result<Amount>
    where
        I: IntoIterator<Item = ChainId>,
    {
        let mut sum: Amount = 0;
        for chain in chains {
            if let Some(record) = self.records.get(&chain) {
                sum = sum
                    .checked_add(record.total_supply)
                    .ok_or(OracleError::Overflow)?;
            }
        }
        Ok(sum)
    }

    /// Iterate over all records in ascending chain order.
    pub fn records_iter(&self) -> impl Iterator<Item = (ChainId, &ChainSupplyRecord)> {
        self.records.iter().map(|(c, r)| (*c, r))
    }

    /// Iterate over all cursors in ascending chain order.
    pub fn cursors_iter(&self) -> impl Iterator<Item = (ChainId, Nonce)> + '_ {
        self.cursors.iter().map(|(c, n)| (*c, *n))
    }

    /// Rebuild a ledger from persisted rows.
    pub fn restore(
        records: Vec<(ChainId, ChainSupplyRecord)>,
        cursors: Vec<(ChainId, Nonce)>,
    ) -> Self {
        Self {
            records: records.into_iter().collect(),
            cursors: cursors.into_iter().collect(),
        }
    }
}
