//! Atomic snapshot persistence for the oracle state machine.
//!
//! The oracle applies each operation in memory; the daemon then calls
//! [`save`] to rewrite the full state in one transaction. A crash between
//! operations therefore recovers to the last completed operation, never
//! to a half-applied one. [`load`] rebuilds the oracle on boot.

use rusqlite::Connection;

use veris_oracle::{OracleSnapshot, SupplyOracle};

use crate::{queries, DbError, Result};

/// Write the oracle's full state in one transaction.
pub fn save(conn: &mut Connection, oracle: &SupplyOracle) -> Result<()> {
    let snapshot = oracle.snapshot();
    let tx = conn.transaction()?;

    queries::roles::replace_all(&tx, &snapshot.grants)?;
    queries::chains::replace_all(&tx, &snapshot.chains)?;
    queries::bridges::replace_all(&tx, &snapshot.bridges)?;
    queries::supply::replace_records(&tx, &snapshot.records)?;
    queries::supply::replace_cursors(&tx, &snapshot.cursors)?;
    queries::pending::replace_all(&tx, &snapshot.pending)?;
    queries::state::replace(
        &tx,
        &queries::state::PersistedState {
            state: snapshot.state,
            paused: snapshot.paused,
            emergency_mode: snapshot.emergency_mode,
            emergency_reason: snapshot.emergency_reason.clone(),
            emergency_activated_at: snapshot.emergency_activated_at,
        },
    )?;

    tx.commit()?;
    tracing::debug!(
        chains = snapshot.chains.len(),
        pending = snapshot.pending.len(),
        "oracle snapshot persisted"
    );
    Ok(())
}

/// Rebuild the oracle from the persisted snapshot.
///
/// Returns `None` on a fresh database (no singleton state row yet).
pub fn load(conn: &Connection) -> Result<Option<SupplyOracle>> {
    let Some(persisted) = queries::state::get(conn)? else {
        return Ok(None);
    };

    let snapshot = OracleSnapshot {
        grants: queries::roles::load(conn)?,
        chains: queries::chains::load(conn)?,
        bridges: queries::bridges::load(conn)?,
        pending: queries::pending::load(conn)?,
        records: queries::supply::load_records(conn)?,
        cursors: queries::supply::load_cursors(conn)?,
        state: persisted.state,
        paused: persisted.paused,
        emergency_mode: persisted.emergency_mode,
        emergency_reason: persisted.emergency_reason,
        emergency_activated_at: persisted.emergency_activated_at,
    };

    let oracle =
        SupplyOracle::restore(snapshot).map_err(|e| DbError::Corrupt(e.to_string()))?;
    Ok(Some(oracle))
}
