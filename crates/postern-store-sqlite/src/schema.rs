//! SQL schema for the postern SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS visitors (
    subject_id   TEXT PRIMARY KEY,
    display_name TEXT NOT NULL,
    contact_hint TEXT,
    created_at   TEXT NOT NULL    -- ISO 8601 UTC
);

-- Passcodes are keyed by code, not subject; codes issued for one subject in
-- separate windows coexist until each expires.
CREATE TABLE IF NOT EXISTS passcodes (
    code        TEXT PRIMARY KEY,
    subject_id  TEXT NOT NULL,
    expires_at  INTEGER NOT NULL  -- unix seconds
);

-- One row per rate-limit key; the row's expiry IS the window. Claimed and
-- re-claimed only through the conditional upsert in store.rs.
CREATE TABLE IF NOT EXISTS rate_limits (
    id          TEXT PRIMARY KEY,
    expires_at  INTEGER NOT NULL  -- unix seconds
);

CREATE INDEX IF NOT EXISTS passcodes_expires_idx   ON passcodes(expires_at);
CREATE INDEX IF NOT EXISTS rate_limits_expires_idx ON rate_limits(expires_at);

PRAGMA user_version = 1;
";
