//! SQL schema for the cartograph SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per entity key. `version` starts at 1 and is bumped by every
-- committed write; updates are conditional on the version read.
CREATE TABLE IF NOT EXISTS entities (
    key     TEXT PRIMARY KEY,
    kind    TEXT NOT NULL,               -- key prefix: 'asset' | 'webpage' | ...
    status  TEXT NOT NULL,               -- wire status code
    labels  TEXT NOT NULL DEFAULT '[]',  -- JSON array of graph labels
    body    TEXT NOT NULL,               -- JSON-encoded entity
    version INTEGER NOT NULL
);

-- The key is derived from (source_key, label, target_key), so the primary
-- key alone forbids duplicate edges.
CREATE TABLE IF NOT EXISTS relationships (
    key        TEXT PRIMARY KEY,
    label      TEXT NOT NULL,
    source_key TEXT NOT NULL,
    target_key TEXT NOT NULL,
    body       TEXT NOT NULL,
    version    INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS entities_kind_idx        ON entities(kind);
CREATE INDEX IF NOT EXISTS relationships_source_idx ON relationships(source_key);
CREATE INDEX IF NOT EXISTS relationships_target_idx ON relationships(target_key);
CREATE INDEX IF NOT EXISTS relationships_label_idx  ON relationships(label);

PRAGMA user_version = 1;
";
