//! Durable ledger store.
//!
//! Sub-modules:
//! - `types`: entities (`Member`, `ActionRecord`, `QueuePointer`) and query types.
//! - `schema`: SQLite DDL definitions.
//! - `sqlite`: `SqliteLedger`, the only component that touches rows.

pub(crate) mod schema;
pub mod sqlite;
pub mod types;

pub use sqlite::{LedgerError, LedgerTx, SqliteLedger};
pub use types::{
    ActionFilter, ActionKind, ActionRecord, ActionState, Member, NOBODY, NewAction,
    PresenceFilter, QueuePointer,
};
