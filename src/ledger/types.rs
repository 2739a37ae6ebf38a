//! Ledger entities and query types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub(crate) const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Label stored on queue pointers that have never been advanced.
pub const NOBODY: &str = "nobody";

/// A household member as persisted in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub identity: String,
    pub name: String,
    pub is_home: bool,
    pub balance: i64,
    /// Roster order; rotation ties go to the lowest position.
    pub position: i64,
}

/// Whether a record is a chore or a violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    Task,
    /// Violation recorded against the actor by `reporter`.
    Penalty { reporter: String },
}

/// Workflow state derived from a record's confirmed flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionState {
    Claimed,
    Confirmed,
}

/// Append-only unit of work or violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub id: i64,
    /// Task name, or the penalty label for penalties.
    pub label: String,
    pub actor: String,
    pub actor_name: String,
    /// Signed; penalties are negative.
    pub points: i64,
    pub kind: ActionKind,
    pub claimed_at: DateTime<Utc>,
    pub confirmer: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub confirmed: bool,
    /// Advisory annotation (e.g. `after cooking #12`); never dereferenced.
    pub detail: Option<String>,
}

impl ActionRecord {
    #[must_use]
    pub fn is_penalty(&self) -> bool {
        matches!(self.kind, ActionKind::Penalty { .. })
    }

    #[must_use]
    pub fn reporter(&self) -> Option<&str> {
        match &self.kind {
            ActionKind::Penalty { reporter } => Some(reporter),
            ActionKind::Task => None,
        }
    }

    #[must_use]
    pub fn state(&self) -> ActionState {
        if self.confirmed {
            ActionState::Confirmed
        } else {
            ActionState::Claimed
        }
    }
}

/// Fields of a claim about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAction {
    pub label: String,
    pub actor: String,
    pub actor_name: String,
    pub points: i64,
    pub kind: ActionKind,
    pub detail: Option<String>,
    pub claimed_at: DateTime<Utc>,
}

/// Per-task cache of the most recent confirmed doer. Display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuePointer {
    pub task: String,
    /// Display name of the last confirmed doer, or [`NOBODY`].
    pub last_user: String,
    pub last_date: Option<DateTime<Utc>>,
}

/// Presence filter for member listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PresenceFilter {
    #[default]
    All,
    HomeOnly,
}

/// Predicate for `query_actions`. Empty fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionFilter {
    pub actor: Option<String>,
    pub label: Option<String>,
    pub confirmed_only: bool,
    pub exclude_penalties: bool,
    /// Inclusive lower bound on `claimed_at`.
    pub claimed_since: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `claimed_at`.
    pub claimed_before: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl ActionFilter {
    #[must_use]
    pub fn by_actor(actor: impl Into<String>) -> Self {
        Self {
            actor: Some(actor.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn by_label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn confirmed(mut self) -> Self {
        self.confirmed_only = true;
        self
    }

    #[must_use]
    pub fn tasks_only(mut self) -> Self {
        self.exclude_penalties = true;
        self
    }

    #[must_use]
    pub fn since(mut self, at: DateTime<Utc>) -> Self {
        self.claimed_since = Some(at);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Epoch seconds as stored in the database.
pub(crate) fn to_epoch(at: DateTime<Utc>) -> i64 {
    at.timestamp()
}

pub(crate) fn from_epoch(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}
