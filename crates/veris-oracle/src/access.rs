//! Per-identity capability sets.
//!
//! Every mutating oracle operation is gated by one of three capability
//! classes. Authorization is global, not per-chain. Grants and revocations
//! are themselves admin-gated at the oracle layer; this module only stores
//! membership and answers checks.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use veris_types::IdentityId;

use crate::{OracleError, Result};

/// A capability class an identity may hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    /// May submit supply reports.
    Reporter,
    /// May manage chains, bridges, parameters, and grants.
    Admin,
    /// May operate emergency mode and force reconciliation.
    Emergency,
}

impl Role {
    /// Stable lowercase name, used for persistence and wire payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Reporter => "reporter",
            Role::Admin => "admin",
            Role::Emergency => "emergency",
        }
    }

    /// Parse a role from its stable name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "reporter" => Some(Role::Reporter),
            "admin" => Some(Role::Admin),
            "emergency" => Some(Role::Emergency),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability grants per identity.
#[derive(Clone, Debug, Default)]
pub struct AccessControl {
    grants: HashMap<IdentityId, BTreeSet<Role>>,
}

impl AccessControl {
    /// Create an empty grant table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant a role to an identity.
    ///
    /// Returns `true` if the grant was new, `false` if the identity
    /// already held the role.
    pub fn grant(&mut self, identity: IdentityId, role: Role) -> bool {
        self.grants.entry(identity).or_default().insert(role)
    }

    /// Revoke a role from an identity.
    ///
    /// Returns `true` if the identity held the role.
    pub fn revoke(&mut self, identity: &IdentityId, role: Role) -> bool {
        match self.grants.get_mut(identity) {
            Some(roles) => {
                let removed = roles.remove(&role);
                if roles.is_empty() {
                    self.grants.remove(identity);
                }
                removed
            }
            None => false,
        }
    }

    /// Check whether an identity holds a role.
    pub fn has_role(&self, identity: &IdentityId, role: Role) -> bool {
        self.grants
            .get(identity)
            .map(|roles| roles.contains(&role))
            .unwrap_or(false)
    }

    /// Require that an identity holds a role.
    ///
    /// # Errors
    ///
    /// - [`OracleError::Unauthorized`] naming the missing role
    pub fn require(&self, identity: &IdentityId, role: Role) -> Result<()> {
        if self.has_role(identity, role) {
            Ok(())
        } else {
            Err(OracleError::Unauthorized(role))
        }
    }

    /// All roles held by an identity, in stable order.
    pub fn roles_of(&self, identity: &IdentityId) -> Vec<Role> {
        self.grants
            .get(identity)
            .map(|roles| roles.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Iterate over all grants (order unspecified).
    pub fn iter(&self) -> impl Iterator<Item = (&IdentityId, &BTreeSet<Role>)> {
        self.grants.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(byte: u8) -> IdentityId {
        [byte; 32]
    }

    #[test]
    fn test_grant_and_check() {
        let mut acl = AccessControl::new();
        assert!(acl.grant(id(1), Role::Reporter));
        assert!(acl.has_role(&id(1), Role::Reporter));
        assert!(!acl.has_role(&id(1), Role::Admin));
        assert!(!acl.has_role(&id(2), Role::Reporter));
    }

    #[test]
    fn test_grant_is_idempotent() {
        let mut acl = AccessControl::new();
        assert!(acl.grant(id(1), Role::Admin));
        assert!(!acl.grant(id(1), Role::Admin));
        assert!(acl.has_role(&id(1), Role::Admin));
    }

    #[test]
    fn test_revoke() {
        let mut acl = AccessControl::new();
        acl.grant(id(1), Role::Reporter);
        assert!(acl.revoke(&id(1), Role::Reporter));
        assert!(!acl.has_role(&id(1), Role::Reporter));
        // Second revoke is a no-op.
        assert!(!acl.revoke(&id(1), Role::Reporter));
    }

    #[test]
    fn test_require_unauthorized() {
        let acl = AccessControl::new();
        let err = acl
            .require(&id(1), Role::Emergency)
            .expect_err("should be unauthorized");
        assert_eq!(err, OracleError::Unauthorized(Role::Emergency));
    }

    #[test]
    fn test_roles_of_stable_order() {
        let mut acl = AccessControl::new();
        acl.grant(id(1), Role::Emergency);
        acl.grant(id(1), Role::Reporter);
        acl.grant(id(1), Role::Admin);
        assert_eq!(
            acl.roles_of(&id(1)),
            vec![Role::Reporter, Role::Admin, Role::Emergency]
        );
        assert!(acl.roles_of(&id(9)).is_empty());
    }

    #[test]
    fn test_role_names_roundtrip() {
        for role in [Role::Reporter, Role::Admin, Role::Emergency] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("owner"), None);
    }
}
