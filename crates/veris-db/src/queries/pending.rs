//! Pending update persistence.
//!
//! Signing order is preserved via the `position` column on the signer
//! rows; signer rows cascade when their parent tuple row is deleted.

use rusqlite::Connection;

use veris_oracle::ReportTuple;
use veris_types::IdentityId;

use crate::queries::identity_from_blob;
use crate::Result;

/// Replace all pending entries with the given set.
pub fn replace_all(
    conn: &Connection,
    pending: &[(ReportTuple, Vec<IdentityId>)],
) -> Result<()> {
    conn.execute("DELETE FROM pending_updates", [])?;
    let mut insert_update = conn.prepare(
        "INSERT INTO pending_updates (chain_id, nonce, total_supply, locked_supply)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    let mut insert_signer = conn.prepare(
        "INSERT INTO pending_signers (pending_id, identity, position) VALUES (?1, ?2, ?3)",
    )?;

    for (tuple, signers) in pending {
        insert_update.execute(rusqlite::params![
            tuple.chain as i64,
            tuple.nonce as i64,
            tuple.total_supply as i64,
            tuple.locked_supply as i64,
        ])?;
        let pending_id = conn.last_insert_rowid();
        for (position, signer) in signers.iter().enumerate() {
            insert_signer.execute(rusqlite::params![
                pending_id,
                signer.as_slice(),
                position as i64,
            ])?;
        }
    }
    Ok(())
}

/// Load all pending entries with signers in signing order.
pub fn load(conn: &Connection) -> Result<Vec<(ReportTuple, Vec<IdentityId>)>> {
    let mut stmt = conn.prepare(
        "SELECT id, chain_id, nonce, total_supply, locked_supply FROM pending_updates ORDER BY id",
    )?;
    let updates = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                ReportTuple {
                    chain: row.get::<_, i64>(1)? as u64,
                    nonce: row.get::<_, i64>(2)? as u64,
                    total_supply: row.get::<_, i64>(3)? as u64,
                    locked_supply: row.get::<_, i64>(4)? as u64,
                },
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut signer_stmt = conn.prepare(
        "SELECT identity FROM pending_signers WHERE pending_id = ?1 ORDER BY position",
    )?;

    let mut pending = Vec::with_capacity(updates.len());
    for (id, tuple) in updates {
        let blobs = signer_stmt
            .query_map([id], |row| row.get::<_, Vec<u8>>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut signers = Vec::with_capacity(blobs.len());
        for blob in blobs {
            signers.push(identity_from_blob(blob)?);
        }
        pending.push((tuple, signers));
    }
    Ok(pending)
}
