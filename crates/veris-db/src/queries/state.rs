//! Singleton global-state persistence.

use rusqlite::{Connection, OptionalExtension};

use veris_oracle::GlobalSupplyState;

use crate::Result;

/// The singleton row: global supply state plus pause/emergency gates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistedState {
    pub state: GlobalSupplyState,
    pub paused: bool,
    pub emergency_mode: bool,
    pub emergency_reason: Option<String>,
    pub emergency_activated_at: Option<u64>,
}

/// Write the singleton row, replacing any previous one.
pub fn replace(conn: &Connection, persisted: &PersistedState) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO oracle_state
             (id, expected_supply, aggregate_actual, deviation_flag,
              deviation_threshold_bps, required_signatures,
              paused, emergency_mode, emergency_reason, emergency_activated_at)
         VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            persisted.state.expected_supply as i64,
            persisted.state.aggregate_actual as i64,
            persisted.state.deviation_flag as i64,
            persisted.state.deviation_threshold_bps as i64,
            persisted.state.required_signatures as i64,
            persisted.paused as i64,
            persisted.emergency_mode as i64,
            persisted.emergency_reason,
            persisted.emergency_activated_at.map(|t| t as i64),
        ],
    )?;
    Ok(())
}

/// Read the singleton row. `None` on a fresh database.
pub fn get(conn: &Connection) -> Result<Option<PersistedState>> {
    let row = conn
        .query_row(
            "SELECT expected_supply, aggregate_actual, deviation_flag,
                    deviation_threshold_bps, required_signatures,
                    paused, emergency_mode, emergency_reason, emergency_activated_at
             FROM oracle_state WHERE id = 1",
            [],
            |row| {
                Ok(PersistedState {
                    state: GlobalSupplyState {
                        expected_supply: row.get::<_, i64>(0)? as u64,
                        aggregate_actual: row.get::<_, i64>(1)? as u64,
                        deviation_flag: row.get::<_, i64>(2)? != 0,
                        deviation_threshold_bps: row.get::<_, i64>(3)? as u64,
                        required_signatures: row.get::<_, i64>(4)? as u32,
                    },
                    paused: row.get::<_, i64>(5)? != 0,
                    emergency_mode: row.get::<_, i64>(6)? != 0,
                    emergency_reason: row.get(7)?,
                    emergency_activated_at: row.get::<_, Option<i64>>(8)?.map(|t| t as u64),
                })
            },
        )
        .optional()?;
    Ok(row)
}
