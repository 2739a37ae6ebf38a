//! SQLite-backed ledger store.
//!
//! Owns every persisted row: members, action records and queue pointers.
//! Each logical operation runs inside one `BEGIN IMMEDIATE` transaction so
//! concurrent writers (threads or processes sharing the database file)
//! serialize on the write lock instead of interleaving read-modify-write
//! cycles.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};

use super::schema::{apply_schema, read_schema_version};
use super::types::{
    ActionFilter, ActionKind, ActionRecord, Member, NOBODY, NewAction, PresenceFilter,
    QueuePointer, from_epoch, to_epoch,
};

const ACTION_COLUMNS: &str = "id, label, actor, actor_name, points, claimed_at, confirmer, \
     confirmed_at, confirmed, is_penalty, reporter, detail";

const MEMBER_COLUMNS: &str = "identity, name, is_home, balance, position";

/// SQLite-backed ledger store.
///
/// Thread-safe via an internal `Mutex<Connection>`. Separate `SqliteLedger`
/// instances opened on the same file coordinate through SQLite's own
/// locking, bounded by the configured busy timeout.
pub struct SqliteLedger {
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
}

impl SqliteLedger {
    /// Open (or create) the ledger database at `path`.
    ///
    /// Creates parent directories and applies the schema if the database is new.
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self, LedgerError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| LedgerError::Io(e.to_string()))?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        apply_schema(&conn)?;
        tracing::debug!(path = %path.display(), "ledger opened");
        Ok(Self {
            path: Some(path.to_path_buf()),
            conn: Mutex::new(conn),
        })
    }

    /// Private in-memory ledger, for tests and dry runs.
    pub fn open_in_memory() -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self {
            path: None,
            conn: Mutex::new(conn),
        })
    }

    /// Database file path (None for in-memory ledgers).
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read the current schema version from the database.
    pub fn schema_version(&self) -> Result<Option<u32>, LedgerError> {
        let conn = self.lock()?;
        Ok(read_schema_version(&conn)?)
    }

    /// Run `f` inside one immediate transaction.
    ///
    /// Commits when `f` returns `Ok`; any error rolls back every statement
    /// `f` issued, so a failed operation leaves no partial state.
    pub fn transaction<T, E>(
        &self,
        f: impl FnOnce(&LedgerTx<'_>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<LedgerError>,
    {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(LedgerError::Sqlite)?;
        let value = f(&LedgerTx::new(&tx))?;
        tx.commit().map_err(LedgerError::Sqlite)?;
        Ok(value)
    }

    /// Run several reads inside one deferred transaction so they observe a
    /// single consistent state, even while other handles commit writes.
    pub fn snapshot<T>(
        &self,
        f: impl FnOnce(&LedgerTx<'_>) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        let value = f(&LedgerTx::new(&tx))?;
        tx.commit()?;
        Ok(value)
    }

    /// Run a single read-only statement against the connection without a
    /// transaction.
    pub fn read<T>(
        &self,
        f: impl FnOnce(&LedgerTx<'_>) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let conn = self.lock()?;
        f(&LedgerTx::new(&conn))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, LedgerError> {
        self.conn
            .lock()
            .map_err(|e| LedgerError::Lock(e.to_string()))
    }
}

/// Statement surface over a connection or an open transaction.
pub struct LedgerTx<'a> {
    conn: &'a Connection,
}

impl<'a> LedgerTx<'a> {
    fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    // -----------------------------------------------------------------------
    // Members
    // -----------------------------------------------------------------------

    /// Insert a member or refresh its name and position. Presence and balance
    /// of an existing row are kept, so re-seeding is idempotent.
    pub fn upsert_member(
        &self,
        identity: &str,
        name: &str,
        position: i64,
    ) -> Result<(), LedgerError> {
        self.conn.execute(
            "INSERT INTO members (identity, name, position) VALUES (?1, ?2, ?3) \
             ON CONFLICT(identity) DO UPDATE SET name = excluded.name, \
             position = excluded.position",
            params![identity, name, position],
        )?;
        Ok(())
    }

    pub fn member(&self, identity: &str) -> Result<Option<Member>, LedgerError> {
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM members WHERE identity = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![identity], row_to_member)
            .optional()?)
    }

    /// Members in roster order.
    pub fn list_members(&self, filter: PresenceFilter) -> Result<Vec<Member>, LedgerError> {
        let sql = match filter {
            PresenceFilter::All => format!(
                "SELECT {MEMBER_COLUMNS} FROM members ORDER BY position, identity"
            ),
            PresenceFilter::HomeOnly => format!(
                "SELECT {MEMBER_COLUMNS} FROM members WHERE is_home = 1 \
                 ORDER BY position, identity"
            ),
        };
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_member)?;
        let mut members = Vec::new();
        for r in rows {
            members.push(r?);
        }
        Ok(members)
    }

    /// Returns `false` when no member has this identity.
    pub fn set_presence(&self, identity: &str, home: bool) -> Result<bool, LedgerError> {
        let rows = self.conn.execute(
            "UPDATE members SET is_home = ?1 WHERE identity = ?2",
            params![home, identity],
        )?;
        Ok(rows > 0)
    }

    /// Current balance; 0 for an identity with no member row.
    pub fn balance(&self, identity: &str) -> Result<i64, LedgerError> {
        let balance = self
            .conn
            .query_row(
                "SELECT balance FROM members WHERE identity = ?1",
                params![identity],
                |row| row.get(0),
            )
            .optional()?;
        Ok(balance.unwrap_or(0))
    }

    /// Persist a balance. An unseen identity gets a member row named after
    /// itself, placed last in roster order.
    pub fn write_balance(&self, identity: &str, balance: i64) -> Result<(), LedgerError> {
        self.conn.execute(
            "INSERT INTO members (identity, name, balance, position) \
             VALUES (?1, ?1, ?2, (SELECT COALESCE(MAX(position), -1) + 1 FROM members)) \
             ON CONFLICT(identity) DO UPDATE SET balance = excluded.balance",
            params![identity, balance],
        )?;
        Ok(())
    }

    pub fn reset_balances(&self) -> Result<usize, LedgerError> {
        Ok(self.conn.execute("UPDATE members SET balance = 0", [])?)
    }

    // -----------------------------------------------------------------------
    // Action records
    // -----------------------------------------------------------------------

    /// Insert an unconfirmed record and return its id.
    pub fn insert_action(&self, action: &NewAction) -> Result<i64, LedgerError> {
        let (is_penalty, reporter) = match &action.kind {
            ActionKind::Task => (false, None),
            ActionKind::Penalty { reporter } => (true, Some(reporter.as_str())),
        };
        self.conn.execute(
            "INSERT INTO action_records \
             (label, actor, actor_name, points, claimed_at, is_penalty, reporter, detail) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                action.label,
                action.actor,
                action.actor_name,
                action.points,
                to_epoch(action.claimed_at),
                is_penalty,
                reporter,
                action.detail,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn action(&self, id: i64) -> Result<Option<ActionRecord>, LedgerError> {
        let sql = format!("SELECT {ACTION_COLUMNS} FROM action_records WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id], row_to_action)
            .optional()?)
    }

    /// Compare-and-swap the confirmed flag from 0 to 1.
    ///
    /// Returns `false` when the record is missing or already confirmed; in
    /// that case nothing was written.
    pub fn mark_confirmed(
        &self,
        id: i64,
        confirmer: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, LedgerError> {
        let rows = self.conn.execute(
            "UPDATE action_records SET confirmer = ?1, confirmed_at = ?2, confirmed = 1 \
             WHERE id = ?3 AND confirmed = 0",
            params![confirmer, to_epoch(at), id],
        )?;
        Ok(rows > 0)
    }

    /// Delete a record only while it is unconfirmed.
    ///
    /// Returns `false` when the record is missing or confirmed.
    pub fn delete_unconfirmed(&self, id: i64) -> Result<bool, LedgerError> {
        let rows = self.conn.execute(
            "DELETE FROM action_records WHERE id = ?1 AND confirmed = 0",
            params![id],
        )?;
        Ok(rows > 0)
    }

    /// Records matching `filter`, newest claim first.
    pub fn query_actions(&self, filter: &ActionFilter) -> Result<Vec<ActionRecord>, LedgerError> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(actor) = &filter.actor {
            values.push(Value::Text(actor.clone()));
            clauses.push("actor = ?");
        }
        if let Some(label) = &filter.label {
            values.push(Value::Text(label.clone()));
            clauses.push("label = ?");
        }
        if filter.confirmed_only {
            clauses.push("confirmed = 1");
        }
        if filter.exclude_penalties {
            clauses.push("is_penalty = 0");
        }
        if let Some(since) = filter.claimed_since {
            values.push(Value::Integer(to_epoch(since)));
            clauses.push("claimed_at >= ?");
        }
        if let Some(before) = filter.claimed_before {
            values.push(Value::Integer(to_epoch(before)));
            clauses.push("claimed_at < ?");
        }

        let mut sql = format!("SELECT {ACTION_COLUMNS} FROM action_records");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY claimed_at DESC, id DESC");
        if let Some(limit) = filter.limit {
            values.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
            sql.push_str(" LIMIT ?");
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(values), row_to_action)?;
        let mut records = Vec::new();
        for r in rows {
            records.push(r?);
        }
        Ok(records)
    }

    /// Latest confirmation time of a non-penalty record for `task` by `actor`.
    pub fn last_confirmed_at(
        &self,
        task: &str,
        actor: &str,
    ) -> Result<Option<DateTime<Utc>>, LedgerError> {
        let secs: Option<i64> = self.conn.query_row(
            "SELECT MAX(confirmed_at) FROM action_records \
             WHERE label = ?1 AND actor = ?2 AND confirmed = 1 AND is_penalty = 0",
            params![task, actor],
            |row| row.get(0),
        )?;
        Ok(secs.map(from_epoch))
    }

    /// Most frequently confirmed tasks claimed at or after `since`.
    pub fn frequent_tasks(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<(String, u32)>, LedgerError> {
        let mut stmt = self.conn.prepare(
            "SELECT label, COUNT(*) AS cnt FROM action_records \
             WHERE confirmed = 1 AND is_penalty = 0 AND claimed_at >= ?1 \
             GROUP BY label ORDER BY cnt DESC, label ASC LIMIT ?2",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![to_epoch(since), limit], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?;
        let mut tasks: Vec<(String, u32)> = Vec::new();
        for r in rows {
            tasks.push(r?);
        }
        Ok(tasks)
    }

    pub fn clear_actions(&self) -> Result<usize, LedgerError> {
        Ok(self.conn.execute("DELETE FROM action_records", [])?)
    }

    // -----------------------------------------------------------------------
    // Queue pointers
    // -----------------------------------------------------------------------

    pub fn seed_queue_pointer(&self, task: &str) -> Result<(), LedgerError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO queue_pointers (task, last_user) VALUES (?1, ?2)",
            params![task, NOBODY],
        )?;
        Ok(())
    }

    pub fn queue_pointer(&self, task: &str) -> Result<Option<QueuePointer>, LedgerError> {
        Ok(self
            .conn
            .query_row(
                "SELECT task, last_user, last_date FROM queue_pointers WHERE task = ?1",
                params![task],
                |row| {
                    let last_date: Option<i64> = row.get(2)?;
                    Ok(QueuePointer {
                        task: row.get(0)?,
                        last_user: row.get(1)?,
                        last_date: last_date.map(from_epoch),
                    })
                },
            )
            .optional()?)
    }

    /// Point the task at its latest confirmed doer. Returns `false` for tasks
    /// without a seeded pointer.
    pub fn advance_queue_pointer(
        &self,
        task: &str,
        last_user: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, LedgerError> {
        let rows = self.conn.execute(
            "UPDATE queue_pointers SET last_user = ?1, last_date = ?2 WHERE task = ?3",
            params![last_user, to_epoch(at), task],
        )?;
        Ok(rows > 0)
    }

    pub fn reset_queue_pointers(&self) -> Result<usize, LedgerError> {
        Ok(self.conn.execute(
            "UPDATE queue_pointers SET last_user = ?1, last_date = NULL",
            params![NOBODY],
        )?)
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors from the SQLite ledger backend.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("lock poisoned: {0}")]
    Lock(String),
}

// ---------------------------------------------------------------------------
// Row conversion helpers
// ---------------------------------------------------------------------------

fn row_to_member(row: &rusqlite::Row<'_>) -> rusqlite::Result<Member> {
    Ok(Member {
        identity: row.get(0)?,
        name: row.get(1)?,
        is_home: row.get(2)?,
        balance: row.get(3)?,
        position: row.get(4)?,
    })
}

fn row_to_action(row: &rusqlite::Row<'_>) -> rusqlite::Result<ActionRecord> {
    let claimed_at: i64 = row.get(5)?;
    let confirmed_at: Option<i64> = row.get(7)?;
    let is_penalty: bool = row.get(9)?;
    let reporter: Option<String> = row.get(10)?;
    let kind = if is_penalty {
        ActionKind::Penalty {
            reporter: reporter.unwrap_or_default(),
        }
    } else {
        ActionKind::Task
    };

    Ok(ActionRecord {
        id: row.get(0)?,
        label: row.get(1)?,
        actor: row.get(2)?,
        actor_name: row.get(3)?,
        points: row.get(4)?,
        kind,
        claimed_at: from_epoch(claimed_at),
        confirmer: row.get(6)?,
        confirmed_at: confirmed_at.map(from_epoch),
        confirmed: row.get(8)?,
        detail: row.get(11)?,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
