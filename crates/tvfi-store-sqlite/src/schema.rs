//! SQL schema for the SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per observed claim, keyed by its identity hash.
-- cid, scores and visible are only ever written by dedicated updates.
CREATE TABLE IF NOT EXISTS receipts (
    receipt_id    TEXT PRIMARY KEY,
    hash          TEXT NOT NULL UNIQUE,
    source        TEXT NOT NULL,
    title         TEXT NOT NULL,
    url           TEXT NOT NULL,
    published_at  TEXT NOT NULL,   -- ISO 8601 UTC, millisecond precision
    frontier      TEXT NOT NULL,
    summary       TEXT NOT NULL DEFAULT '',
    visible       INTEGER NOT NULL DEFAULT 1,
    cid           TEXT,
    novelty_score REAL,
    impact_score  REAL,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS entities (
    entity_id TEXT PRIMARY KEY,
    slug      TEXT NOT NULL UNIQUE,
    name      TEXT NOT NULL,
    kind      TEXT NOT NULL DEFAULT 'org',
    profile   TEXT
);

-- No foreign keys: links are written after both sides exist and nothing
-- ever deletes a receipt or an entity.
CREATE TABLE IF NOT EXISTS entity_receipt (
    entity_id  TEXT NOT NULL,
    receipt_id TEXT NOT NULL,
    role       TEXT NOT NULL DEFAULT 'mentioned',
    PRIMARY KEY (entity_id, receipt_id)
);

CREATE TABLE IF NOT EXISTS analyses (
    cid          TEXT PRIMARY KEY,
    receipt_hash TEXT NOT NULL,
    version      TEXT NOT NULL,
    storage_path TEXT NOT NULL,
    created_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS receipts_published_idx ON receipts(published_at);
CREATE INDEX IF NOT EXISTS receipts_frontier_idx  ON receipts(frontier);
CREATE INDEX IF NOT EXISTS receipts_cid_idx       ON receipts(cid);
CREATE INDEX IF NOT EXISTS entity_receipt_rcp_idx ON entity_receipt(receipt_id);

PRAGMA user_version = 1;
";
