//! Capability grant persistence.

use rusqlite::Connection;

use veris_oracle::Role;
use veris_types::IdentityId;

use crate::queries::identity_from_blob;
use crate::{DbError, Result};

/// Replace all persisted grants with the given set.
pub fn replace_all(conn: &Connection, grants: &[(IdentityId, Vec<Role>)]) -> Result<()> {
    conn.execute("DELETE FROM role_grants", [])?;
    let mut stmt = conn.prepare("INSERT INTO role_grants (identity, role) VALUES (?1, ?2)")?;
    for (identity, roles) in grants {
        for role in roles {
            stmt.execute(rusqlite::params![identity.as_slice(), role.as_str()])?;
        }
    }
    Ok(())
}

/// Load all persisted grants, grouped by identity.
pub fn load(conn: &Connection) -> Result<Vec<(IdentityId, Vec<Role>)>> {
    let mut stmt =
        conn.prepare("SELECT identity, role FROM role_grants ORDER BY identity, role")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut grants: Vec<(IdentityId, Vec<Role>)> = Vec::new();
    for (blob, role_name) in rows {
        let identity = identity_from_blob(blob)?;
        let role = Role::parse(&role_name)
            .ok_or_else(|| DbError::Corrupt(format!("unknown role '{role_name}'")))?;
        match grants.last_mut() {
            Some((last, roles)) if *last == identity => roles.push(role),
            _ => grants.push((identity, vec![role])),
        }
    }
    Ok(grants)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_and_load() {
        let conn = crate::open_memory().expect("open");
        let grants = vec![
            ([1u8; 32], vec![Role::Reporter]),
            ([2u8; 32], vec![Role::Reporter, Role::Admin]),
        ];
        replace_all(&conn, &grants).expect("replace");
        let loaded = load(&conn).expect("load");
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0], ([1u8; 32], vec![Role::Reporter]));
        // Role rows come back grouped under their identity.
        assert_eq!(loaded[1].0, [2u8; 32]);
        assert_eq!(loaded[1].1.len(), 2);
    }

    #[test]
    fn test_replace_overwrites() {
        let conn = crate::open_memory().expect("open");
        replace_all(&conn, &[([1u8; 32], vec![Role::Admin])]).expect("replace");
        replace_all(&conn, &[([2u8; 32], vec![Role::Emergency])]).expect("replace");
        let loaded = load(&conn).expect("load");
        assert_eq!(loaded, vec![([2u8; 32], vec![Role::Emergency])]);
    }
}
