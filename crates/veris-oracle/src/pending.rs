//! Pending report tuples and signer accounting.
//!
//! A pending update is keyed by the full report tuple (chain, nonce,
//! total supply, locked supply). Two reporters proposing different values
//! under the same (chain, nonce) therefore accumulate in separate entries
//! and never share a signer count; disagreeing reporters can only reach
//! quorum by resubmitting matching values.
//!
//! Entries have no timeout. They live until the tuple finalizes or a
//! higher nonce finalizes for the chain, at which point they are
//! permanently superseded and pruned.

use std::collections::HashMap;

use veris_types::{Amount, ChainId, IdentityId, Nonce};

use crate::{OracleError, Result};

/// Full report tuple identifying one pending update.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct ReportTuple {
    /// Reported chain.
    pub chain: ChainId,
    /// Report sequence number for the chain.
    pub nonce: Nonce,
    /// Proposed total supply.
    pub total_supply: Amount,
    /// Proposed locked supply.
    pub locked_supply: Amount,
}

/// Signer accounting for one pending tuple.
#[derive(Clone, Debug, Default)]
pub struct PendingUpdate {
    signers: Vec<IdentityId>,
}

impl PendingUpdate {
    /// Number of distinct signatures collected.
    pub fn signatures(&self) -> usize {
        self.signers.len()
    }

    /// Whether an identity already signed this tuple.
    pub fn has_signed(&self, identity: &IdentityId) -> bool {
        self.signers.contains(identity)
    }

    /// Signers in signing order.
    pub fn signers(&self) -> &[IdentityId] {
        &self.signers
    }
}

/// Table of pending updates awaiting quorum.
#[derive(Clone, Debug, Default)]
pub struct PendingTable {
    entries: HashMap<ReportTuple, PendingUpdate>,
}

impl PendingTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a signature to the tuple's entry, creating the entry on first
    /// signature. Returns the entry's signature count after insertion.
    ///
    /// # Errors
    ///
    /// - [`OracleError::DuplicateSignature`] if the signer already signed
    ///   this exact tuple (the entry is left unchanged)
    pub fn sign(&mut self, tuple: ReportTuple, signer: IdentityId) -> Result<usize> {
        let entry = self.entries.entry(tuple).or_default();
        if entry.has_signed(&signer) {
            return Err(OracleError::DuplicateSignature);
        }
        entry.signers.push(signer);
        Ok(entry.signers.len())
    }

    /// Look up a pending entry.
    pub fn get(&self, tuple: &ReportTuple) -> Option<&PendingUpdate> {
        self.entries.get(tuple)
    }

    /// Remove and return a pending entry (consumed on finalize).
    pub fn take(&mut self, tuple: &ReportTuple) -> Option<PendingUpdate> {
        self.entries.remove(tuple)
    }

    /// Drop every entry for `chain` whose nonce is at or below `cursor`.
    ///
    /// Such entries can never finalize once the cursor has advanced past
    /// them. Returns the number of entries pruned.
    pub fn prune_superseded(&mut self, chain: ChainId, cursor: Nonce) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|tuple, _| tuple.chain != chain || tuple.nonce > cursor);
        before - self.entries.len()
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries (order unspecified).
    pub fn iter(&self) -> impl Iterator<Item = (&ReportTuple, &PendingUpdate)> {
        self.entries.iter()
    }

    /// Rebuild a table from persisted entries.
    pub fn restore(entries: Vec<(ReportTuple, Vec<IdentityId>)>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(tuple, signers)| (tuple, PendingUpdate { signers }))
            .collect();
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(byte: u8) -> IdentityId {
        [byte; 32]
    }

    fn tuple(chain: ChainId, nonce: Nonce, total: Amount, locked: Amount) -> ReportTuple {
        ReportTuple {
            chain,
            nonce,
            total_supply: total,
            locked_supply: locked,
        }
    }

    #[test]
    fn test_sign_accumulates() {
        let mut table = PendingTable::new();
        let t = tuple(1, 1, 300, 0);
        assert_eq!(table.sign(t, id(1)).expect("sign"), 1);
        assert_eq!(table.sign(t, id(2)).expect("sign"), 2);
        assert_eq!(table.get(&t).expect("entry").signatures(), 2);
    }

    #[test]
    fn test_duplicate_signer_rejected() {
        let mut table = PendingTable::new();
        let t = tuple(1, 1, 300, 0);
        table.sign(t, id(1)).expect("sign");
        let err = table.sign(t, id(1)).expect_err("duplicate");
        assert_eq!(err, OracleError::DuplicateSignature);
        assert_eq!(table.get(&t).expect("entry").signatures(), 1);
    }

    #[test]
    fn test_differing_values_are_separate_entries() {
        let mut table = PendingTable::new();
        let a = tuple(1, 1, 300, 0);
        let b = tuple(1, 1, 310, 0);
        table.sign(a, id(1)).expect("sign");
        table.sign(b, id(2)).expect("sign");
        // Same (chain, nonce), different values: counts never mix.
        assert_eq!(table.get(&a).expect("a").signatures(), 1);
        assert_eq!(table.get(&b).expect("b").signatures(), 1);
        // The same reporter may sign a different tuple under the same nonce.
        assert_eq!(table.sign(b, id(1)).expect("sign"), 2);
    }

    #[test]
    fn test_prune_superseded() {
        let mut table = PendingTable::new();
        table.sign(tuple(1, 1, 300, 0), id(1)).expect("sign");
        table.sign(tuple(1, 2, 310, 0), id(1)).expect("sign");
        table.sign(tuple(1, 3, 320, 0), id(1)).expect("sign");
        table.sign(tuple(2, 1, 500, 0), id(1)).expect("sign");

        let pruned = table.prune_superseded(1, 2);
        assert_eq!(pruned, 2);
        assert!(table.get(&tuple(1, 1, 300, 0)).is_none());
        assert!(table.get(&tuple(1, 2, 310, 0)).is_none());
        assert!(table.get(&tuple(1, 3, 320, 0)).is_some());
        // Other chains untouched.
        assert!(table.get(&tuple(2, 1, 500, 0)).is_some());
    }

    #[test]
    fn test_take_consumes() {
        let mut table = PendingTable::new();
        let t = tuple(1, 1, 300, 0);
        table.sign(t, id(1)).expect("sign");
        let entry = table.take(&t).expect("take");
        assert_eq!(entry.signers(), &[id(1)]);
        assert!(table.get(&t).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn test_restore_preserves_signer_order() {
        let t = tuple(1, 1, 300, 0);
        let table = PendingTable::restore(vec![(t, vec![id(3), id(1)])]);
        let entry = table.get(&t).expect("entry");
        assert_eq!(entry.signers(), &[id(3), id(1)]);
        assert!(entry.has_signed(&id(1)));
        assert!(!entry.has_signed(&id(2)));
    }
}
