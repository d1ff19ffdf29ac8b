//! Bridge registration persistence.
//!
//! Registration order is preserved via the `position` column so indexed
//! lookup survives a restart.

use rusqlite::Connection;

use veris_types::{ChainId, IdentityId};

use crate::queries::identity_from_blob;
use crate::Result;

/// Replace all bridge registrations with the given per-chain lists.
pub fn replace_all(conn: &Connection, bridges: &[(ChainId, Vec<IdentityId>)]) -> Result<()> {
    conn.execute("DELETE FROM bridges", [])?;
    let mut stmt =
        conn.prepare("INSERT INTO bridges (chain_id, identity, position) VALUES (?1, ?2, ?3)")?;
    for (chain, identities) in bridges {
        for (position, identity) in identities.iter().enumerate() {
            stmt.execute(rusqlite::params![
                *chain as i64,
                identity.as_slice(),
                position as i64,
            ])?;
        }
    }
    Ok(())
}

/// Load all bridge registrations, grouped per chain in registration order.
pub fn load(conn: &Connection) -> Result<Vec<(ChainId, Vec<IdentityId>)>> {
    let mut stmt =
        conn.prepare("SELECT chain_id, identity FROM bridges ORDER BY chain_id, position")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, i64>(0)? as ChainId, row.get::<_, Vec<u8>>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut bridges: Vec<(ChainId, Vec<IdentityId>)> = Vec::new();
    for (chain, blob) in rows {
        let identity = identity_from_blob(blob)?;
        match bridges.last_mut() {
            Some((last, identities)) if *last == chain => identities.push(identity),
            _ => bridges.push((chain, vec![identity])),
        }
    }
    Ok(bridges)
}
