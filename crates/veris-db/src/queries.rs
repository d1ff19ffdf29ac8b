//! Database query functions organized by domain.
//!
//! Each module owns one table family and exposes `replace_all`/`load`
//! pairs used by the snapshot layer, which rewrites the full oracle state
//! inside one transaction.

pub mod bridges;
pub mod chains;
pub mod pending;
pub mod roles;
pub mod state;
pub mod supply;

use veris_types::IdentityId;

use crate::{DbError, Result};

/// Convert a stored identity blob back to its fixed-size form.
pub(crate) fn identity_from_blob(blob: Vec<u8>) -> Result<IdentityId> {
    IdentityId::try_from(blob.as_slice())
        .map_err(|_| DbError::Corrupt(format!("identity blob of length {}", blob.len())))
}
