//! SQLite DDL definitions for the ledger store.

use rusqlite::Connection;

/// Complete DDL for the ledger database.
///
/// Uses `IF NOT EXISTS` throughout so `apply_schema` is idempotent.
pub(crate) const SCHEMA_SQL: &str = r#"
-- WAL lets readers proceed while a confirm transaction holds the write lock.
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS schema_meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS members (
    identity TEXT PRIMARY KEY,
    name     TEXT NOT NULL,
    is_home  INTEGER NOT NULL DEFAULT 1,
    balance  INTEGER NOT NULL DEFAULT 0,
    position INTEGER NOT NULL DEFAULT 0
);

-- Claimed and confirmed actions. Rows are deleted only while unconfirmed.
CREATE TABLE IF NOT EXISTS action_records (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    label        TEXT NOT NULL,
    actor        TEXT NOT NULL,
    actor_name   TEXT NOT NULL,
    points       INTEGER NOT NULL,
    claimed_at   INTEGER NOT NULL,
    confirmer    TEXT,
    confirmed_at INTEGER,
    confirmed    INTEGER NOT NULL DEFAULT 0,
    is_penalty   INTEGER NOT NULL DEFAULT 0,
    reporter     TEXT,               -- penalty reporter identity
    detail       TEXT,
    CHECK (confirmer IS NULL OR confirmer <> actor)
);

CREATE INDEX IF NOT EXISTS idx_actions_actor ON action_records(actor);
CREATE INDEX IF NOT EXISTS idx_actions_label ON action_records(label, confirmed);
CREATE INDEX IF NOT EXISTS idx_actions_claimed_at ON action_records(claimed_at);

CREATE TABLE IF NOT EXISTS queue_pointers (
    task      TEXT PRIMARY KEY,
    last_user TEXT NOT NULL,
    last_date INTEGER
);
"#;

/// Apply the full schema to an open connection.
///
/// Safe to call multiple times. Seeds the schema version on a fresh database.
pub(crate) fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    let version_str = super::types::CURRENT_SCHEMA_VERSION.to_string();
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', ?1)",
        rusqlite::params![version_str],
    )?;

    Ok(())
}

/// Read the current schema version from the database.
///
/// Returns `None` if the key is missing.
pub(crate) fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<u32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_meta WHERE key = 'schema_version'")?;
    let mut rows = stmt.query([])?;
    match rows.next()? {
        Some(row) => {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().ok())
        }
        None => Ok(None),
    }
}
