//! The [`SupplyOracle`] state machine.
//!
//! Every operation is one atomic, totally-ordered step against the shared
//! ledger state. The quorum check and the finalize transition are a single
//! indivisible unit: a report either leaves its tuple pending or finalizes
//! in the same call that inserted its signature. Hosts that accept
//! concurrent callers must serialize access behind one lock; the oracle
//! itself has no interior synchronization.
//!
//! A rejected operation leaves all state unchanged. On the finalizing
//! path the new aggregate is computed before anything is written, so an
//! aggregation overflow rejects the report instead of leaving a half
//! applied update.

use veris_types::{Amount, ChainId, DeviationScope, IdentityId, Nonce, Signal};

use crate::access::{AccessControl, Role};
use crate::bridges::BridgeRegistry;
use crate::deviation;
use crate::emergency::EmergencyController;
use crate::ledger::{ChainSupplyRecord, SupplyLedger};
use crate::pending::{PendingTable, ReportTuple};
use crate::registry::ChainRegistry;
use crate::{OracleError, Result};

/// Genesis parameters for a fresh oracle.
#[derive(Clone, Debug)]
pub struct OracleGenesis {
    /// Expected global supply across all tracked chains. Must be nonzero.
    pub expected_supply: Amount,
    /// Distinct matching reports required to finalize. Must be nonzero.
    pub required_signatures: u32,
    /// Deviation alarm threshold in basis points.
    pub deviation_threshold_bps: u64,
    /// Identity granted the Admin and Emergency capabilities at genesis.
    pub admin: IdentityId,
}

/// Singleton global supply state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GlobalSupplyState {
    /// Configured expected supply.
    pub expected_supply: Amount,
    /// Sum of recorded total supply over tracked chains.
    pub aggregate_actual: Amount,
    /// Whether the last evaluation found the aggregate deviating.
    pub deviation_flag: bool,
    /// Deviation alarm threshold in basis points.
    pub deviation_threshold_bps: u64,
    /// Distinct matching reports required to finalize.
    pub required_signatures: u32,
}

/// Outcome of an accepted report submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitStatus {
    /// The report tuple is still short of quorum.
    Pending {
        /// Signatures collected so far, including this one.
        signatures: u32,
        /// Signatures required to finalize.
        required: u32,
    },
    /// This signature completed the quorum and the report finalized.
    Finalized(ChainSupplyRecord),
}

/// Receipt for an accepted report submission.
#[derive(Clone, Debug)]
pub struct SubmitReceipt {
    /// What happened to the report.
    pub status: SubmitStatus,
    /// Signals emitted (empty while the tuple is pending).
    pub signals: Vec<Signal>,
}

/// Introspection view of one pending tuple.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingStatus {
    /// Signatures collected so far.
    pub signatures: u32,
    /// Signatures required to finalize.
    pub required: u32,
    /// Signers in signing order.
    pub signers: Vec<IdentityId>,
}

/// The supply consensus oracle.
pub struct SupplyOracle {
    access: AccessControl,
    chains: ChainRegistry,
    bridges: BridgeRegistry,
    pending: PendingTable,
    ledger: SupplyLedger,
    state: GlobalSupplyState,
    emergency: EmergencyController,
}

impl SupplyOracle {
    /// Create a fresh oracle from genesis parameters.
    ///
    /// The genesis admin receives the Admin and Emergency capabilities;
    /// reporters are granted afterwards via [`SupplyOracle::grant_role`].
    ///
    /// # Errors
    ///
    /// - [`OracleError::ZeroExpectedSupply`] if `expected_supply` is 0
    /// - [`OracleError::ZeroSignatureCount`] if `required_signatures` is 0
    pub fn new(genesis: OracleGenesis) -> Result<Self> {
        if genesis.expected_supply == 0 {
            return Err(OracleError::ZeroExpectedSupply);
        }
        if genesis.required_signatures == 0 {
            return Err(OracleError::ZeroSignatureCount);
        }

        let mut access = AccessControl::new();
        access.grant(genesis.admin, Role::Admin);
        access.grant(genesis.admin, Role::Emergency);

        tracing::info!(
            expected_supply = genesis.expected_supply,
            required_signatures = genesis.required_signatures,
            deviation_threshold_bps = genesis.deviation_threshold_bps,
            "supply oracle initialized"
        );

        Ok(Self {
            access,
            chains: ChainRegistry::new(),
            bridges: BridgeRegistry::new(),
            pending: PendingTable::new(),
            ledger: SupplyLedger::new(),
            state: GlobalSupplyState {
                expected_supply: genesis.expected_supply,
                aggregate_actual: 0,
                deviation_flag: false,
                deviation_threshold_bps: genesis.deviation_threshold_bps,
                required_signatures: genesis.required_signatures,
            },
            emergency: EmergencyController::new(),
        })
    }

    // ── Report submission ───────────────────────────────────────────

    /// Submit a supply report for a chain.
    ///
    /// Failure modes, checked in order: paused (unconditional, before
    /// authorization), caller lacks Reporter, chain untracked, locked
    /// above total, stale nonce, caller already signed this tuple.
    ///
    /// The signature that brings the tuple to exactly the required count
    /// finalizes it: the chain record is written, the nonce cursor
    /// advances, superseded pending entries are pruned, and the global
    /// and per-chain deviation checks run.
    ///
    /// # Errors
    ///
    /// One of [`OracleError::Paused`], [`OracleError::Unauthorized`],
    /// [`OracleError::UnknownChain`], [`OracleError::LockedExceedsTotal`],
    /// [`OracleError::StaleNonce`], [`OracleError::DuplicateSignature`],
    /// [`OracleError::Overflow`]. State is unchanged on any error.
    pub fn submit_report(
        &mut self,
        caller: IdentityId,
        chain: ChainId,
        total_supply: Amount,
        locked_supply: Amount,
        nonce: Nonce,
        now: u64,
    ) -> Result<SubmitReceipt> {
        self.emergency.check_not_paused()?;
        self.access.require(&caller, Role::Reporter)?;
        self.chains.require(chain)?;
        if locked_supply > total_supply {
            return Err(OracleError::LockedExceedsTotal {
                locked: locked_supply,
                total: total_supply,
            });
        }
        let cursor = self.ledger.cursor(chain);
        if nonce <= cursor {
            return Err(OracleError::StaleNonce {
                chain,
                nonce,
                cursor,
            });
        }

        let tuple = ReportTuple {
            chain,
            nonce,
            total_supply,
            locked_supply,
        };
        let current = match self.pending.get(&tuple) {
            Some(entry) if entry.has_signed(&caller) => {
                return Err(OracleError::DuplicateSignature)
            }
            Some(entry) => entry.signatures() as u32,
            None => 0,
        };

        let required = self.state.required_signatures;
        if current + 1 != required {
            let signatures = self.pending.sign(tuple, caller)? as u32;
            tracing::debug!(chain, nonce, signatures, required, "supply report pending");
            return Ok(SubmitReceipt {
                status: SubmitStatus::Pending {
                    signatures,
                    required,
                },
                signals: Vec::new(),
            });
        }

        // Finalizing path. Compute the post-finalize aggregate first so an
        // overflow rejects the report with no state change.
        let prior_total = self
            .ledger
            .record(chain)
            .map(|r| r.total_supply)
            .unwrap_or(0);
        let aggregate = self
            .ledger
            .aggregate_total(self.chains.iter())?
            .saturating_sub(prior_total)
            .checked_add(total_supply)
            .ok_or(OracleError::Overflow)?;

        self.pending.take(&tuple);
        self.ledger
            .finalize(chain, total_supply, locked_supply, nonce, now);
        let pruned = self.pending.prune_superseded(chain, nonce);
        self.state.aggregate_actual = aggregate;

        let record = ChainSupplyRecord {
            total_supply,
            locked_supply,
            circulating_supply: total_supply.saturating_sub(locked_supply),
            last_update_time: now,
        };

        let mut signals = vec![Signal::SupplyFinalized {
            chain,
            total_supply,
            locked_supply,
            circulating_supply: record.circulating_supply,
        }];

        // Per-chain check against the chain's prior recorded total.
        let chain_dev = deviation::evaluate(
            total_supply,
            prior_total,
            self.state.deviation_threshold_bps,
        );
        if chain_dev.breached {
            tracing::warn!(
                chain,
                observed = total_supply,
                reference = prior_total,
                bps = chain_dev.bps,
                "per-chain supply deviation"
            );
            signals.push(Signal::Deviation {
                scope: DeviationScope::Chain(chain),
                observed: total_supply,
                reference: prior_total,
                deviation_bps: chain_dev.bps,
            });
        }

        // Global check against the configured expected supply.
        let global_dev = deviation::evaluate(
            aggregate,
            self.state.expected_supply,
            self.state.deviation_threshold_bps,
        );
        self.state.deviation_flag = global_dev.breached;
        if global_dev.breached {
            tracing::warn!(
                aggregate,
                expected = self.state.expected_supply,
                bps = global_dev.bps,
                "global supply deviation"
            );
            signals.push(Signal::Deviation {
                scope: DeviationScope::Global,
                observed: aggregate,
                reference: self.state.expected_supply,
                deviation_bps: global_dev.bps,
            });
        }

        tracing::info!(
            chain,
            nonce,
            total_supply,
            locked_supply,
            pruned,
            "supply report finalized"
        );

        Ok(SubmitReceipt {
            status: SubmitStatus::Finalized(record),
            signals,
        })
    }

    // ── Chain & bridge administration ───────────────────────────────

    /// Start tracking a chain.
    ///
    /// # Errors
    ///
    /// - [`OracleError::Unauthorized`] without Admin
    /// - [`OracleError::ChainAlreadyTracked`] if already tracked
    pub fn add_chain(&mut self, caller: IdentityId, chain: ChainId) -> Result<()> {
        self.access.require(&caller, Role::Admin)?;
        self.chains.add(chain)?;
        self.refresh_aggregate();
        tracing::info!(chain, "chain added");
        Ok(())
    }

    /// Stop tracking a chain. Its supply record survives and stays
    /// queryable, but leaves the tracked aggregate.
    ///
    /// # Errors
    ///
    /// - [`OracleError::Unauthorized`] without Admin
    /// - [`OracleError::UnknownChain`] if not tracked
    pub fn remove_chain(&mut self, caller: IdentityId, chain: ChainId) -> Result<()> {
        self.access.require(&caller, Role::Admin)?;
        self.chains.remove(chain)?;
        self.refresh_aggregate();
        tracing::info!(chain, "chain removed");
        Ok(())
    }

    /// Register a bridge identity for a tracked chain.
    ///
    /// # Errors
    ///
    /// - [`OracleError::Unauthorized`] without Admin
    /// - [`OracleError::UnknownChain`] if the chain is not tracked
    /// - [`OracleError::DuplicateBridge`] if the pair already exists
    pub fn register_bridge(
        &mut self,
        caller: IdentityId,
        chain: ChainId,
        bridge: IdentityId,
    ) -> Result<()> {
        self.access.require(&caller, Role::Admin)?;
        self.chains.require(chain)?;
        self.bridges.register(chain, bridge)?;
        tracing::info!(chain, bridge = %hex_prefix(&bridge), "bridge registered");
        Ok(())
    }

    // ── Role administration ─────────────────────────────────────────

    /// Grant a capability to an identity. Idempotent.
    ///
    /// # Errors
    ///
    /// - [`OracleError::Unauthorized`] without Admin
    pub fn grant_role(
        &mut self,
        caller: IdentityId,
        identity: IdentityId,
        role: Role,
    ) -> Result<()> {
        self.access.require(&caller, Role::Admin)?;
        if self.access.grant(identity, role) {
            tracing::info!(identity = %hex_prefix(&identity), %role, "capability granted");
        }
        Ok(())
    }

    /// Revoke a capability from an identity. Idempotent.
    ///
    /// # Errors
    ///
    /// - [`OracleError::Unauthorized`] without Admin
    pub fn revoke_role(
        &mut self,
        caller: IdentityId,
        identity: IdentityId,
        role: Role,
    ) -> Result<()> {
        self.access.require(&caller, Role::Admin)?;
        if self.access.revoke(&identity, role) {
            tracing::info!(identity = %hex_prefix(&identity), %role, "capability revoked");
        }
        Ok(())
    }

    // ── Parameter administration ────────────────────────────────────

    /// Replace the expected supply. Does not re-evaluate the deviation
    /// flag; the next finalize or reconcile will.
    ///
    /// # Errors
    ///
    /// - [`OracleError::Unauthorized`] without Admin
    /// - [`OracleError::ZeroExpectedSupply`] if `new_value` is 0
    pub fn update_expected_supply(
        &mut self,
        caller: IdentityId,
        new_value: Amount,
    ) -> Result<Vec<Signal>> {
        self.access.require(&caller, Role::Admin)?;
        if new_value == 0 {
            return Err(OracleError::ZeroExpectedSupply);
        }
        let old = self.state.expected_supply;
        self.state.expected_supply = new_value;
        tracing::info!(old, new = new_value, "expected supply updated");
        Ok(vec![Signal::ExpectedSupplyChanged {
            old,
            new: new_value,
        }])
    }

    /// Set the required signature count. Affects only future quorum
    /// evaluations; already-accumulated pending counts are untouched and
    /// may become permanently unfinalizable.
    ///
    /// # Errors
    ///
    /// - [`OracleError::Unauthorized`] without Admin
    /// - [`OracleError::ZeroSignatureCount`] if `count` is 0
    pub fn update_required_signatures(&mut self, caller: IdentityId, count: u32) -> Result<()> {
        self.access.require(&caller, Role::Admin)?;
        if count == 0 {
            return Err(OracleError::ZeroSignatureCount);
        }
        self.state.required_signatures = count;
        tracing::info!(count, "required signature count updated");
        Ok(())
    }

    /// Set the deviation alarm threshold. Affects only future evaluations.
    ///
    /// # Errors
    ///
    /// - [`OracleError::Unauthorized`] without Admin
    pub fn update_deviation_threshold(&mut self, caller: IdentityId, bps: u64) -> Result<()> {
        self.access.require(&caller, Role::Admin)?;
        self.state.deviation_threshold_bps = bps;
        tracing::info!(bps, "deviation threshold updated");
        Ok(())
    }

    // ── Reconciliation & emergency ──────────────────────────────────

    /// Recompute the aggregate, acknowledge the current state, and clear
    /// the deviation flag unconditionally.
    ///
    /// This is an acknowledge-and-suppress action, not a correction: the
    /// flag is cleared even when the aggregate still deviates from the
    /// expected supply. A residual deviation at or above the threshold is
    /// logged at warn level.
    ///
    /// # Errors
    ///
    /// - [`OracleError::Unauthorized`] without Admin
    pub fn reconcile(&mut self, caller: IdentityId) -> Result<Vec<Signal>> {
        self.access.require(&caller, Role::Admin)?;
        self.reconcile_inner()
    }

    /// Reconcile while emergency mode is active, gated on the Emergency
    /// capability instead of Admin.
    ///
    /// # Errors
    ///
    /// - [`OracleError::Unauthorized`] without Emergency
    /// - [`OracleError::EmergencyNotActive`] if emergency mode is off
    pub fn force_reconcile(&mut self, caller: IdentityId) -> Result<Vec<Signal>> {
        self.access.require(&caller, Role::Emergency)?;
        self.emergency.check_active()?;
        self.reconcile_inner()
    }

    fn reconcile_inner(&mut self) -> Result<Vec<Signal>> {
        let aggregate = self.ledger.aggregate_total(self.chains.iter())?;
        self.state.aggregate_actual = aggregate;

        let residual = deviation::evaluate(
            aggregate,
            self.state.expected_supply,
            self.state.deviation_threshold_bps,
        );
        if residual.breached {
            tracing::warn!(
                aggregate,
                expected = self.state.expected_supply,
                bps = residual.bps,
                "reconciling with unresolved supply deviation"
            );
        }
        self.state.deviation_flag = false;

        tracing::info!(
            aggregate,
            expected = self.state.expected_supply,
            "supply reconciled"
        );
        Ok(vec![Signal::Reconciled {
            aggregate_actual: aggregate,
            expected: self.state.expected_supply,
        }])
    }

    /// Pause report submission.
    ///
    /// # Errors
    ///
    /// - [`OracleError::Unauthorized`] without Admin
    pub fn pause(&mut self, caller: IdentityId) -> Result<Vec<Signal>> {
        self.access.require(&caller, Role::Admin)?;
        self.emergency.pause();
        Ok(vec![Signal::Paused])
    }

    /// Resume report submission.
    ///
    /// # Errors
    ///
    /// - [`OracleError::Unauthorized`] without Admin
    pub fn unpause(&mut self, caller: IdentityId) -> Result<Vec<Signal>> {
        self.access.require(&caller, Role::Admin)?;
        self.emergency.unpause();
        Ok(vec![Signal::Unpaused])
    }

    /// Activate emergency mode. Advisory for report submission; gates
    /// [`SupplyOracle::force_reconcile`].
    ///
    /// # Errors
    ///
    /// - [`OracleError::Unauthorized`] without Emergency
    pub fn activate_emergency(
        &mut self,
        caller: IdentityId,
        reason: String,
        now: u64,
    ) -> Result<Vec<Signal>> {
        self.access.require(&caller, Role::Emergency)?;
        self.emergency.activate(reason.clone(), now);
        Ok(vec![Signal::EmergencyActivated { reason }])
    }

    /// Deactivate emergency mode.
    ///
    /// # Errors
    ///
    /// - [`OracleError::Unauthorized`] without Emergency
    pub fn deactivate_emergency(&mut self, caller: IdentityId) -> Result<Vec<Signal>> {
        self.access.require(&caller, Role::Emergency)?;
        self.emergency.deactivate();
        Ok(vec![Signal::EmergencyDeactivated])
    }

    // ── Read surface ────────────────────────────────────────────────

    /// Tracked chains in ascending id order.
    pub fn chains(&self) -> Vec<ChainId> {
        self.chains.iter().collect()
    }

    /// The chain's supply record, if one has ever finalized. Available
    /// even after the chain is removed from tracking.
    pub fn supply_record(&self, chain: ChainId) -> Option<ChainSupplyRecord> {
        self.ledger.record(chain)
    }

    /// Highest finalized nonce for a chain (0 if none).
    pub fn nonce_cursor(&self, chain: ChainId) -> Nonce {
        self.ledger.cursor(chain)
    }

    /// The global supply state.
    pub fn global_state(&self) -> GlobalSupplyState {
        self.state
    }

    /// Introspect a pending entry by its full tuple.
    pub fn pending_status(&self, tuple: &ReportTuple) -> Option<PendingStatus> {
        self.pending.get(tuple).map(|entry| PendingStatus {
            signatures: entry.signatures() as u32,
            required: self.state.required_signatures,
            signers: entry.signers().to_vec(),
        })
    }

    /// Whether the (chain, bridge) pair is registered.
    pub fn is_bridge_registered(&self, chain: ChainId, bridge: &IdentityId) -> bool {
        self.bridges.is_registered(chain, bridge)
    }

    /// Bridges registered for a chain, in registration order.
    pub fn bridges(&self, chain: ChainId) -> &[IdentityId] {
        self.bridges.bridges(chain)
    }

    /// Bridge at a registration-order index, if any.
    pub fn bridge_at(&self, chain: ChainId, index: usize) -> Option<IdentityId> {
        self.bridges.bridge_at(chain, index)
    }

    /// All capabilities held by an identity.
    pub fn roles_of(&self, identity: &IdentityId) -> Vec<Role> {
        self.access.roles_of(identity)
    }

    /// Pause and emergency state.
    pub fn emergency(&self) -> &EmergencyController {
        &self.emergency
    }

    // ── Persistence ─────────────────────────────────────────────────

    /// Capture the full oracle state for persistence.
    pub fn snapshot(&self) -> OracleSnapshot {
        OracleSnapshot {
            grants: self
                .access
                .iter()
                .map(|(id, roles)| (*id, roles.iter().copied().collect()))
                .collect(),
            chains: self.chains.iter().collect(),
            bridges: self
                .bridges
                .iter()
                .map(|(chain, bridges)| (chain, bridges.to_vec()))
                .collect(),
            pending: self
                .pending
                .iter()
                .map(|(tuple, entry)| (*tuple, entry.signers().to_vec()))
                .collect(),
            records: self.ledger.records_iter().map(|(c, r)| (c, *r)).collect(),
            cursors: self.ledger.cursors_iter().collect(),
            state: self.state,
            paused: self.emergency.is_paused(),
            emergency_mode: self.emergency.is_active(),
            emergency_reason: self.emergency.reason().map(str::to_string),
            emergency_activated_at: self.emergency.activated_at(),
        }
    }

    /// Rebuild an oracle from a snapshot.
    ///
    /// # Errors
    ///
    /// - [`OracleError::ZeroExpectedSupply`] /
    ///   [`OracleError::ZeroSignatureCount`] if the persisted state
    ///   violates the genesis invariants
    pub fn restore(snapshot: OracleSnapshot) -> Result<Self> {
        if snapshot.state.expected_supply == 0 {
            return Err(OracleError::ZeroExpectedSupply);
        }
        if snapshot.state.required_signatures == 0 {
            return Err(OracleError::ZeroSignatureCount);
        }

        let mut access = AccessControl::new();
        for (identity, roles) in snapshot.grants {
            for role in roles {
                access.grant(identity, role);
            }
        }

        let mut chains = ChainRegistry::new();
        for chain in snapshot.chains {
            chains.add(chain)?;
        }

        let mut bridges = BridgeRegistry::new();
        for (chain, identities) in snapshot.bridges {
            for identity in identities {
                bridges.register(chain, identity)?;
            }
        }

        Ok(Self {
            access,
            chains,
            bridges,
            pending: PendingTable::restore(snapshot.pending),
            ledger: SupplyLedger::restore(snapshot.records, snapshot.cursors),
            state: snapshot.state,
            emergency: EmergencyController::restore(
                snapshot.paused,
                snapshot.emergency_mode,
                snapshot.emergency_reason,
                snapshot.emergency_activated_at,
            ),
        })
    }

    /// Keep the stored aggregate equal to the tracked-chain sum after the
    /// tracked set changes. The deviation flag is only re-derived on
    /// finalize and reconcile.
    fn refresh_aggregate(&mut self) {
        // Removing chains cannot overflow a previously valid sum; adding a
        // chain contributes nothing until its first finalize.
        if let Ok(aggregate) = self.ledger.aggregate_total(self.chains.iter()) {
            self.state.aggregate_actual = aggregate;
        }
    }
}

/// Full oracle state as written to and read from the durable store.
#[derive(Clone, Debug)]
pub struct OracleSnapshot {
    /// Capability grants per identity.
    pub grants: Vec<(IdentityId, Vec<Role>)>,
    /// Tracked chains.
    pub chains: Vec<ChainId>,
    /// Bridge registrations per chain, in registration order.
    pub bridges: Vec<(ChainId, Vec<IdentityId>)>,
    /// Pending tuples with signers in signing order.
    pub pending: Vec<(ReportTuple, Vec<IdentityId>)>,
    /// Finalized supply records.
    pub records: Vec<(ChainId, ChainSupplyRecord)>,
    /// Finalized nonce cursors.
    pub cursors: Vec<(ChainId, Nonce)>,
    /// Global supply state.
    pub state: GlobalSupplyState,
    /// Pause gate.
    pub paused: bool,
    /// Emergency mode.
    pub emergency_mode: bool,
    /// Operator reason while emergency mode is active.
    pub emergency_reason: Option<String>,
    /// Activation timestamp while emergency mode is active.
    pub emergency_activated_at: Option<u64>,
}

/// Short hex prefix of an identity for log lines.
fn hex_prefix(identity: &IdentityId) -> String {
    identity[..4].iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000;

    fn id(byte: u8) -> IdentityId {
        [byte; 32]
    }

    const ADMIN: u8 = 0xAD;
    const R1: u8 = 1;
    const R2: u8 = 2;
    const R3: u8 = 3;

    /// Oracle with expected supply 900, threshold 100 bps, quorum of 2,
    /// chains {1, 2, 3}, reporters R1..R3.
    fn oracle() -> SupplyOracle {
        let mut oracle = SupplyOracle::new(OracleGenesis {
            expected_supply: 900,
            required_signatures: 2,
            deviation_threshold_bps: 100,
            admin: id(ADMIN),
        })
        .expect("genesis");
        for chain in [1, 2, 3] {
            oracle.add_chain(id(ADMIN), chain).expect("add chain");
        }
        for reporter in [R1, R2, R3] {
            oracle
                .grant_role(id(ADMIN), id(reporter), Role::Reporter)
                .expect("grant");
        }
        oracle
    }

    fn submit(
        oracle: &mut SupplyOracle,
        reporter: u8,
        chain: ChainId,
        total: Amount,
        locked: Amount,
        nonce: Nonce,
    ) -> Result<SubmitReceipt> {
        oracle.submit_report(id(reporter), chain, total, locked, nonce, NOW)
    }

    #[test]
    fn test_genesis_rejects_zero_parameters() {
        let genesis = OracleGenesis {
            expected_supply: 0,
            required_signatures: 2,
            deviation_threshold_bps: 100,
            admin: id(ADMIN),
        };
        assert_eq!(
            SupplyOracle::new(genesis).err(),
            Some(OracleError::ZeroExpectedSupply)
        );

        let genesis = OracleGenesis {
            expected_supply: 900,
            required_signatures: 0,
            deviation_threshold_bps: 100,
            admin: id(ADMIN),
        };
        assert_eq!(
            SupplyOracle::new(genesis).err(),
            Some(OracleError::ZeroSignatureCount)
        );
    }

    #[test]
    fn test_first_report_stays_pending() {
        let mut oracle = oracle();
        let receipt = submit(&mut oracle, R1, 1, 300, 0, 1).expect("submit");
        assert_eq!(
            receipt.status,
            SubmitStatus::Pending {
                signatures: 1,
                required: 2
            }
        );
        assert!(receipt.signals.is_empty());
        // No ledger-visible change.
        assert!(oracle.supply_record(1).is_none());
        assert_eq!(oracle.nonce_cursor(1), 0);
        assert_eq!(oracle.global_state().aggregate_actual, 0);
    }

    #[test]
    fn test_quorum_finalizes_exactly_at_required_count() {
        let mut oracle = oracle();
        submit(&mut oracle, R1, 1, 300, 0, 1).expect("first");
        let receipt = submit(&mut oracle, R2, 1, 300, 0, 1).expect("second");

        match receipt.status {
            SubmitStatus::Finalized(record) => {
                assert_eq!(record.total_supply, 300);
                assert_eq!(record.circulating_supply, 300);
                assert_eq!(record.last_update_time, NOW);
            }
            other => panic!("expected finalize, got {other:?}"),
        }
        assert_eq!(oracle.nonce_cursor(1), 1);
        assert_eq!(oracle.global_state().aggregate_actual, 300);
        // The consumed tuple is gone from introspection.
        let tuple = ReportTuple {
            chain: 1,
            nonce: 1,
            total_supply: 300,
            locked_supply: 0,
        };
        assert!(oracle.pending_status(&tuple).is_none());
    }

    #[test]
    fn test_first_finalize_raises_global_deviation() {
        // E1: aggregate 300 vs expected 900 -> 6666 bps >= 100.
        let mut oracle = oracle();
        submit(&mut oracle, R1, 1, 300, 0, 1).expect("first");
        let receipt = submit(&mut oracle, R2, 1, 300, 0, 1).expect("second");

        assert!(oracle.global_state().deviation_flag);
        assert!(receipt.signals.iter().any(|s| matches!(
            s,
            Signal::Deviation {
                scope: DeviationScope::Global,
                observed: 300,
                reference: 900,
                deviation_bps: 6666,
            }
        )));
    }

    #[test]
    fn test_full_coverage_clears_deviation_flag() {
        // E2: all three chains report 300 -> aggregate 900 -> 0 bps.
        let mut oracle = oracle();
        for chain in [1, 2, 3] {
            submit(&mut oracle, R1, chain, 300, 0, 1).expect("first");
            submit(&mut oracle, R2, chain, 300, 0, 1).expect("second");
        }
        let state = oracle.global_state();
        assert_eq!(state.aggregate_actual, 900);
        assert!(!state.deviation_flag);
    }

    #[test]
    fn test_per_chain_and_global_deviation_are_independent() {
        // E3: chain 1 moves 300 -> 310. Per-chain 333 bps, global 111 bps.
        let mut oracle = oracle();
        for chain in [1, 2, 3] {
            submit(&mut oracle, R1, chain, 300, 0, 1).expect("first");
            submit(&mut oracle, R2, chain, 300, 0, 1).expect("second");
        }
        submit(&mut oracle, R1, 1, 310, 0, 2).expect("first");
        let receipt = submit(&mut oracle, R2, 1, 310, 0, 2).expect("second");

        assert!(receipt.signals.iter().any(|s| matches!(
            s,
            Signal::Deviation {
                scope: DeviationScope::Chain(1),
                observed: 310,
                reference: 300,
                deviation_bps: 333,
            }
        )));
        assert!(receipt.signals.iter().any(|s| matches!(
            s,
            Signal::Deviation {
                scope: DeviationScope::Global,
                observed: 910,
                reference: 900,
                deviation_bps: 111,
            }
        )));
        assert!(oracle.global_state().deviation_flag);
    }

    #[test]
    fn test_replayed_nonce_rejected() {
        // E4: after nonce 2 finalizes, nonce 1 is stale.
        let mut oracle = oracle();
        submit(&mut oracle, R1, 1, 300, 0, 1).expect("first");
        submit(&mut oracle, R2, 1, 300, 0, 1).expect("second");
        submit(&mut oracle, R1, 1, 310, 0, 2).expect("first");
        submit(&mut oracle, R2, 1, 310, 0, 2).expect("second");

        let err = submit(&mut oracle, R1, 1, 300, 0, 1).expect_err("replay");
        assert_eq!(
            err,
            OracleError::StaleNonce {
                chain: 1,
                nonce: 1,
                cursor: 2
            }
        );
    }

    #[test]
    fn test_locked_above_total_rejected_without_state_change() {
        // E5: locked 150 > total 100.
        let mut oracle = oracle();
        submit(&mut oracle, R1, 1, 310, 0, 1).expect("first");
        submit(&mut oracle, R2, 1, 310, 0, 1).expect("second");

        let err = submit(&mut oracle, R1, 1, 100, 150, 2).expect_err("invalid");
        assert_eq!(
            err,
            OracleError::LockedExceedsTotal {
                locked: 150,
                total: 100
            }
        );
        let record = oracle.supply_record(1).expect("record");
        assert_eq!(record.total_supply, 310);
        assert_eq!(record.locked_supply, 0);
        assert_eq!(oracle.nonce_cursor(1), 1);
    }

    #[test]
    fn test_reconcile_clears_flag_despite_residual() {
        // E6: aggregate 910 vs expected 900, flag set; reconcile clears it.
        let mut oracle = oracle();
        for chain in [1, 2, 3] {
            submit(&mut oracle, R1, chain, 300, 0, 1).expect("first");
            submit(&mut oracle, R2, chain, 300, 0, 1).expect("second");
        }
        submit(&mut oracle, R1, 1, 310, 0, 2).expect("first");
        submit(&mut oracle, R2, 1, 310, 0, 2).expect("second");
        assert!(oracle.global_state().deviation_flag);

        let signals = oracle.reconcile(id(ADMIN)).expect("reconcile");
        assert_eq!(
            signals,
            vec![Signal::Reconciled {
                aggregate_actual: 910,
                expected: 900
            }]
        );
        assert!(!oracle.global_state().deviation_flag);
        // The mismatch itself is untouched.
        assert_eq!(oracle.global_state().aggregate_actual, 910);
    }

    #[test]
    fn test_submission_check_order() {
        let mut oracle = oracle();
        submit(&mut oracle, R1, 1, 300, 0, 1).expect("first");
        submit(&mut oracle, R2, 1, 300, 0, 1).expect("second");

        // Unknown caller fails on authorization before chain lookup.
        let err = oracle
            .submit_report(id(0xEE), 99, 300, 0, 1, NOW)
            .expect_err("unauthorized");
        assert_eq!(err, OracleError::Unauthorized(Role::Reporter));

        // Untracked chain beats validation.
        let err = submit(&mut oracle, R1, 99, 100, 150, 1).expect_err("unknown chain");
        assert_eq!(err, OracleError::UnknownChain(99));

        // Validation beats the stale-nonce check.
        let err = submit(&mut oracle, R1, 1, 100, 150, 1).expect_err("locked > total");
        assert!(matches!(err, OracleError::LockedExceedsTotal { .. }));

        // Stale nonce beats the duplicate-signature check.
        let err = submit(&mut oracle, R1, 1, 300, 0, 1).expect_err("stale");
        assert!(matches!(err, OracleError::StaleNonce { .. }));

        // Pause beats everything, authorization included.
        oracle.pause(id(ADMIN)).expect("pause");
        let err = oracle
            .submit_report(id(0xEE), 99, 100, 150, 0, NOW)
            .expect_err("paused");
        assert_eq!(err, OracleError::Paused);
    }

    #[test]
    fn test_duplicate_signature_rejected() {
        let mut oracle = oracle();
        submit(&mut oracle, R1, 1, 300, 0, 1).expect("first");
        let err = submit(&mut oracle, R1, 1, 300, 0, 1).expect_err("duplicate");
        assert_eq!(err, OracleError::DuplicateSignature);

        let tuple = ReportTuple {
            chain: 1,
            nonce: 1,
            total_supply: 300,
            locked_supply: 0,
        };
        let status = oracle.pending_status(&tuple).expect("pending");
        assert_eq!(status.signatures, 1);
        assert_eq!(status.signers, vec![id(R1)]);
    }

    #[test]
    fn test_disagreeing_values_never_share_quorum() {
        let mut oracle = oracle();
        submit(&mut oracle, R1, 1, 300, 0, 1).expect("R1 value");
        let receipt = submit(&mut oracle, R2, 1, 301, 0, 1).expect("R2 value");
        // Each tuple holds one signature; nothing finalized.
        assert_eq!(
            receipt.status,
            SubmitStatus::Pending {
                signatures: 1,
                required: 2
            }
        );
        assert!(oracle.supply_record(1).is_none());
    }

    #[test]
    fn test_single_reporter_mode_finalizes_immediately() {
        let mut oracle = SupplyOracle::new(OracleGenesis {
            expected_supply: 900,
            required_signatures: 1,
            deviation_threshold_bps: 100,
            admin: id(ADMIN),
        })
        .expect("genesis");
        oracle.add_chain(id(ADMIN), 1).expect("add chain");
        oracle
            .grant_role(id(ADMIN), id(R1), Role::Reporter)
            .expect("grant");

        let receipt = submit(&mut oracle, R1, 1, 300, 0, 1).expect("submit");
        assert!(matches!(receipt.status, SubmitStatus::Finalized(_)));
    }

    #[test]
    fn test_raising_threshold_strands_existing_entries() {
        let mut oracle = oracle();
        submit(&mut oracle, R1, 1, 300, 0, 1).expect("first");
        oracle
            .update_required_signatures(id(ADMIN), 3)
            .expect("raise");

        // The second signature no longer hits the new threshold...
        let receipt = submit(&mut oracle, R2, 1, 300, 0, 1).expect("second");
        assert_eq!(
            receipt.status,
            SubmitStatus::Pending {
                signatures: 2,
                required: 3
            }
        );
        // ...and the third finalizes under it.
        let receipt = submit(&mut oracle, R3, 1, 300, 0, 1).expect("third");
        assert!(matches!(receipt.status, SubmitStatus::Finalized(_)));
    }

    #[test]
    fn test_lowering_threshold_below_count_never_equals() {
        let mut oracle = oracle();
        oracle
            .update_required_signatures(id(ADMIN), 3)
            .expect("raise");
        submit(&mut oracle, R1, 1, 300, 0, 1).expect("first");
        submit(&mut oracle, R2, 1, 300, 0, 1).expect("second");
        oracle
            .update_required_signatures(id(ADMIN), 2)
            .expect("lower");

        // Count jumps from 2 to 3, never equal to 2: stays pending.
        let receipt = submit(&mut oracle, R3, 1, 300, 0, 1).expect("third");
        assert_eq!(
            receipt.status,
            SubmitStatus::Pending {
                signatures: 3,
                required: 2
            }
        );
        assert!(oracle.supply_record(1).is_none());
    }

    #[test]
    fn test_finalize_prunes_superseded_entries() {
        let mut oracle = oracle();
        // A stale proposal under nonce 1 that will never complete.
        submit(&mut oracle, R3, 1, 999, 0, 1).expect("stray");
        // Nonce 2 finalizes.
        submit(&mut oracle, R1, 1, 300, 0, 2).expect("first");
        submit(&mut oracle, R2, 1, 300, 0, 2).expect("second");

        let stray = ReportTuple {
            chain: 1,
            nonce: 1,
            total_supply: 999,
            locked_supply: 0,
        };
        assert!(oracle.pending_status(&stray).is_none());
    }

    #[test]
    fn test_removed_chain_leaves_aggregate_but_stays_queryable() {
        let mut oracle = oracle();
        submit(&mut oracle, R1, 1, 300, 0, 1).expect("first");
        submit(&mut oracle, R2, 1, 300, 0, 1).expect("second");
        submit(&mut oracle, R1, 2, 400, 0, 1).expect("first");
        submit(&mut oracle, R2, 2, 400, 0, 1).expect("second");
        assert_eq!(oracle.global_state().aggregate_actual, 700);

        oracle.remove_chain(id(ADMIN), 2).expect("remove");
        assert_eq!(oracle.global_state().aggregate_actual, 300);
        // Record retained and queryable.
        assert_eq!(oracle.supply_record(2).expect("record").total_supply, 400);
        // Reports for the removed chain are refused.
        let err = submit(&mut oracle, R1, 2, 410, 0, 2).expect_err("untracked");
        assert_eq!(err, OracleError::UnknownChain(2));
    }

    #[test]
    fn test_update_expected_supply() {
        let mut oracle = oracle();
        let signals = oracle
            .update_expected_supply(id(ADMIN), 1000)
            .expect("update");
        assert_eq!(
            signals,
            vec![Signal::ExpectedSupplyChanged { old: 900, new: 1000 }]
        );
        assert_eq!(oracle.global_state().expected_supply, 1000);
        // The flag is not re-evaluated by the setter.
        assert!(!oracle.global_state().deviation_flag);

        let err = oracle
            .update_expected_supply(id(ADMIN), 0)
            .expect_err("zero");
        assert_eq!(err, OracleError::ZeroExpectedSupply);
    }

    #[test]
    fn test_admin_operations_require_admin() {
        let mut oracle = oracle();
        let outsider = id(0xEE);
        assert!(matches!(
            oracle.add_chain(outsider, 9),
            Err(OracleError::Unauthorized(Role::Admin))
        ));
        assert!(matches!(
            oracle.remove_chain(outsider, 1),
            Err(OracleError::Unauthorized(Role::Admin))
        ));
        assert!(matches!(
            oracle.register_bridge(outsider, 1, id(0xB)),
            Err(OracleError::Unauthorized(Role::Admin))
        ));
        assert!(matches!(
            oracle.update_expected_supply(outsider, 100),
            Err(OracleError::Unauthorized(Role::Admin))
        ));
        assert!(matches!(
            oracle.reconcile(outsider),
            Err(OracleError::Unauthorized(Role::Admin))
        ));
        assert!(matches!(
            oracle.pause(outsider),
            Err(OracleError::Unauthorized(Role::Admin))
        ));
        // Reporters are not admins.
        assert!(matches!(
            oracle.add_chain(id(R1), 9),
            Err(OracleError::Unauthorized(Role::Admin))
        ));
    }

    #[test]
    fn test_force_reconcile_requires_active_emergency() {
        let mut oracle = oracle();
        let err = oracle.force_reconcile(id(ADMIN)).expect_err("inactive");
        assert_eq!(err, OracleError::EmergencyNotActive);

        oracle
            .activate_emergency(id(ADMIN), "aggregate runaway".to_string(), NOW)
            .expect("activate");
        let signals = oracle.force_reconcile(id(ADMIN)).expect("forced");
        assert!(matches!(signals[0], Signal::Reconciled { .. }));

        // Emergency capability, not Admin, is what gates it.
        let err = oracle.force_reconcile(id(R1)).expect_err("no capability");
        assert_eq!(err, OracleError::Unauthorized(Role::Emergency));
    }

    #[test]
    fn test_emergency_mode_does_not_block_submission() {
        let mut oracle = oracle();
        oracle
            .activate_emergency(id(ADMIN), "drill".to_string(), NOW)
            .expect("activate");
        submit(&mut oracle, R1, 1, 300, 0, 1).expect("submission stays open");
    }

    #[test]
    fn test_bridge_registration() {
        let mut oracle = oracle();
        oracle
            .register_bridge(id(ADMIN), 1, id(0xB1))
            .expect("register");
        assert!(oracle.is_bridge_registered(1, &id(0xB1)));

        // P6: second registration of the same pair fails, state unchanged.
        let err = oracle
            .register_bridge(id(ADMIN), 1, id(0xB1))
            .expect_err("duplicate");
        assert_eq!(err, OracleError::DuplicateBridge { chain: 1 });
        assert_eq!(oracle.bridges(1).len(), 1);

        // Untracked chains take no registrations.
        let err = oracle
            .register_bridge(id(ADMIN), 99, id(0xB1))
            .expect_err("untracked");
        assert_eq!(err, OracleError::UnknownChain(99));
    }

    #[test]
    fn test_revoked_reporter_cannot_submit() {
        let mut oracle = oracle();
        oracle
            .revoke_role(id(ADMIN), id(R1), Role::Reporter)
            .expect("revoke");
        let err = submit(&mut oracle, R1, 1, 300, 0, 1).expect_err("revoked");
        assert_eq!(err, OracleError::Unauthorized(Role::Reporter));
    }

    #[test]
    fn test_snapshot_restore_roundtrip() {
        let mut oracle = oracle();
        submit(&mut oracle, R1, 1, 300, 50, 1).expect("first");
        submit(&mut oracle, R2, 1, 300, 50, 1).expect("second");
        submit(&mut oracle, R2, 2, 500, 0, 1).expect("pending");
        oracle
            .register_bridge(id(ADMIN), 1, id(0xB1))
            .expect("bridge");
        oracle
            .register_bridge(id(ADMIN), 1, id(0xB2))
            .expect("bridge");
        oracle
            .activate_emergency(id(ADMIN), "test".to_string(), NOW)
            .expect("activate");
        oracle.pause(id(ADMIN)).expect("pause");

        let restored = SupplyOracle::restore(oracle.snapshot()).expect("restore");

        assert_eq!(restored.chains(), oracle.chains());
        assert_eq!(restored.supply_record(1), oracle.supply_record(1));
        assert_eq!(restored.nonce_cursor(1), 1);
        assert_eq!(restored.global_state(), oracle.global_state());
        assert_eq!(restored.bridges(1), &[id(0xB1), id(0xB2)]);
        assert!(restored.emergency().is_paused());
        assert!(restored.emergency().is_active());
        assert_eq!(restored.emergency().reason(), Some("test"));

        let tuple = ReportTuple {
            chain: 2,
            nonce: 1,
            total_supply: 500,
            locked_supply: 0,
        };
        let status = restored.pending_status(&tuple).expect("pending");
        assert_eq!(status.signatures, 1);
        assert_eq!(status.signers, vec![id(R2)]);
    }
}
