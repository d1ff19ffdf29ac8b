//! Supply record and nonce cursor persistence.

use rusqlite::Connection;

use veris_oracle::ChainSupplyRecord;
use veris_types::{ChainId, Nonce};

use crate::Result;

/// Replace all supply records with the given set.
pub fn replace_records(
    conn: &Connection,
    records: &[(ChainId, ChainSupplyRecord)],
) -> Result<()> {
    conn.execute("DELETE FROM supply_records", [])?;
    let mut stmt = conn.prepare(
        "INSERT INTO supply_records
             (chain_id, total_supply, locked_supply, circulating_supply, last_update_time)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for (chain, record) in records {
        stmt.execute(rusqlite::params![
            *chain as i64,
            record.total_supply as i64,
            record.locked_supply as i64,
            record.circulating_supply as i64,
            record.last_update_time as i64,
        ])?;
    }
    Ok(())
}

/// Load all supply records in ascending chain order.
pub fn load_records(conn: &Connection) -> Result<Vec<(ChainId, ChainSupplyRecord)>> {
    let mut stmt = conn.prepare(
        "SELECT chain_id, total_supply, locked_supply, circulating_supply, last_update_time
         FROM supply_records ORDER BY chain_id",
    )?;
    let records = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)? as ChainId,
                ChainSupplyRecord {
                    total_supply: row.get::<_, i64>(1)? as u64,
                    locked_supply: row.get::<_, i64>(2)? as u64,
                    circulating_supply: row.get::<_, i64>(3)? as u64,
                    last_update_time: row.get::<_, i64>(4)? as u64,
                },
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Replace all nonce cursors with the given set.
pub fn replace_cursors(conn: &Connection, cursors: &[(ChainId, Nonce)]) -> Result<()> {
    conn.execute("DELETE FROM nonce_cursors", [])?;
    let mut stmt = conn.prepare("INSERT INTO nonce_cursors (chain_id, cursor) VALUES (?1, ?2)")?;
    for (chain, cursor) in cursors {
        stmt.execute(rusqlite::params![*chain as i64, *cursor as i64])?;
    }
    Ok(())
}

/// Load all nonce cursors in ascending chain order.
pub fn load_cursors(conn: &Connection) -> Result<Vec<(ChainId, Nonce)>> {
    let mut stmt = conn.prepare("SELECT chain_id, cursor FROM nonce_cursors ORDER BY chain_id")?;
    let cursors = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)? as ChainId,
                row.get::<_, i64>(1)? as Nonce,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(cursors)
}
