//! SQL schema definitions.

/// Complete schema for the veris v1 database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Capability grants
-- ============================================================

CREATE TABLE IF NOT EXISTS role_grants (
    identity BLOB NOT NULL,
    role TEXT NOT NULL,
    PRIMARY KEY (identity, role)
);

-- ============================================================
-- Chain & bridge registries
-- ============================================================

CREATE TABLE IF NOT EXISTS chains (
    chain_id INTEGER PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS bridges (
    chain_id INTEGER NOT NULL,
    identity BLOB NOT NULL,
    position INTEGER NOT NULL,
    PRIMARY KEY (chain_id, identity)
);

CREATE INDEX IF NOT EXISTS idx_bridges_chain ON bridges(chain_id, position);

-- ============================================================
-- Supply ledger
-- ============================================================

CREATE TABLE IF NOT EXISTS supply_records (
    chain_id INTEGER PRIMARY KEY,
    total_supply INTEGER NOT NULL,
    locked_supply INTEGER NOT NULL,
    circulating_supply INTEGER NOT NULL,
    last_update_time INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS nonce_cursors (
    chain_id INTEGER PRIMARY KEY,
    cursor INTEGER NOT NULL
);

-- ============================================================
-- Pending updates awaiting quorum
-- ============================================================

CREATE TABLE IF NOT EXISTS pending_updates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    chain_id INTEGER NOT NULL,
    nonce INTEGER NOT NULL,
    total_supply INTEGER NOT NULL,
    locked_supply INTEGER NOT NULL,
    UNIQUE (chain_id, nonce, total_supply, locked_supply)
);

CREATE TABLE IF NOT EXISTS pending_signers (
    pending_id INTEGER NOT NULL REFERENCES pending_updates(id) ON DELETE CASCADE,
    identity BLOB NOT NULL,
    position INTEGER NOT NULL,
    PRIMARY KEY (pending_id, identity)
);

-- ============================================================
-- Singleton global state
-- ============================================================

CREATE TABLE IF NOT EXISTS oracle_state (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    expected_supply INTEGER NOT NULL,
    aggregate_actual INTEGER NOT NULL,
    deviation_flag INTEGER NOT NULL,
    deviation_threshold_bps INTEGER NOT NULL,
    required_signatures INTEGER NOT NULL,
    paused INTEGER NOT NULL,
    emergency_mode INTEGER NOT NULL,
    emergency_reason TEXT,
    emergency_activated_at INTEGER
);
"#;
