//! Recency-based rotation: who owes a task next.
//!
//! The member at home who has gone longest without a confirmed completion of
//! the task is next. Members who never did it outrank everyone. Ties go to the
//! member listed first in the roster. Only rostered members are candidates;
//! ledger rows left behind by members removed from the config are ignored.
//! Queue pointers are never consulted here; they only remember the single
//! latest doer.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ledger::{LedgerError, LedgerTx, PresenceFilter};
use crate::roster::Roster;

/// How long ago a member last completed a task.
///
/// Variant order matters: `Never` compares greater than any `DaysAgo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recency {
    /// Whole days elapsed since the latest confirmation.
    DaysAgo(i64),
    Never,
}

impl Recency {
    #[must_use]
    pub fn since(last_done: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        match last_done {
            Some(at) => Self::DaysAgo(now.signed_duration_since(at).num_days()),
            None => Self::Never,
        }
    }
}

/// The member chosen for a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RotationPick {
    pub identity: String,
    pub name: String,
    pub recency: Recency,
    /// This member's latest confirmed completion of the task.
    pub last_done: Option<DateTime<Utc>>,
}

/// Outcome of a rotation query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Selection {
    Next(RotationPick),
    /// Nobody is home; not an error.
    AllAway,
}

impl Selection {
    #[must_use]
    pub fn pick(&self) -> Option<&RotationPick> {
        match self {
            Self::Next(pick) => Some(pick),
            Self::AllAway => None,
        }
    }
}

/// Stateless selector over the ledger.
pub struct RotationSelector;

impl RotationSelector {
    /// Choose among rostered members at home for `task`, as of `now`.
    pub fn next_for(
        tx: &LedgerTx<'_>,
        roster: &Roster,
        task: &str,
        now: DateTime<Utc>,
    ) -> Result<Selection, LedgerError> {
        let home = tx.list_members(PresenceFilter::HomeOnly)?;
        let mut candidates = Vec::with_capacity(home.len());
        for member in home.into_iter().filter(|m| roster.contains(&m.identity)) {
            let last_done = tx.last_confirmed_at(task, &member.identity)?;
            candidates.push(RotationPick {
                identity: member.identity,
                name: member.name,
                recency: Recency::since(last_done, now),
                last_done,
            });
        }
        Ok(Self::select(candidates))
    }

    /// Most overdue candidate; on equal recency the earliest candidate wins.
    pub fn select(candidates: impl IntoIterator<Item = RotationPick>) -> Selection {
        let mut best: Option<RotationPick> = None;
        for candidate in candidates {
            if best.as_ref().is_none_or(|b| candidate.recency > b.recency) {
                best = Some(candidate);
            }
        }
        best.map_or(Selection::AllAway, Selection::Next)
    }
}
