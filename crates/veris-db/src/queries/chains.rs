//! Tracked-chain persistence.

use rusqlite::Connection;

use veris_types::ChainId;

use crate::Result;

/// Replace all tracked chains with the given set.
pub fn replace_all(conn: &Connection, chains: &[ChainId]) -> Result<()> {
    conn.execute("DELETE FROM chains", [])?;
    let mut stmt = conn.prepare("INSERT INTO chains (chain_id) VALUES (?1)")?;
    for chain in chains {
        stmt.execute([*chain as i64])?;
    }
    Ok(())
}

/// Load all tracked chains in ascending id order.
pub fn load(conn: &Connection) -> Result<Vec<ChainId>> {
    let mut stmt = conn.prepare("SELECT chain_id FROM chains ORDER BY chain_id")?;
    let chains = stmt
        .query_map([], |row| Ok(row.get::<_, i64>(0)? as ChainId))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(chains)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_and_load() {
        let conn = crate::open_memory().expect("open");
        replace_all(&conn, &[3, 1, 2]).expect("replace");
        assert_eq!(load(&conn).expect("load"), vec![1, 2, 3]);
    }

    #[test]
    fn test_empty() {
        let conn = crate::open_memory().expect("open");
        assert!(load(&conn).expect("load").is_empty());
    }
}
