//! Dual-confirmation workflow.
//!
//! ```text
//! claim ──► CLAIMED ──confirm (different member)──► CONFIRMED
//!              │
//!              └──retract──► (row deleted)
//! ```
//!
//! A confirmation flips the confirmed flag, applies the record's points to
//! the actor's balance and, for tasks, advances the task's queue pointer, all
//! in one immediate transaction. The flag flip is a compare-and-swap, so of
//! two racing confirmations exactly one applies points; the other observes
//! `AlreadyConfirmed`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::balance::BalanceEngine;
use crate::config::ConfirmerScope;
use crate::error::{FairflatError, IdentityRule, Missing, Result, StateConflict};
use crate::ledger::{ActionKind, ActionRecord, Member, NewAction, SqliteLedger};
use crate::roster::Roster;

/// A typed claim. Task or penalty, never reconstructed from a joined string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimRequest {
    /// Task name, or penalty label.
    pub label: String,
    /// Member credited (task) or penalized (penalty).
    pub actor: String,
    /// Point value; forced negative for penalties.
    pub points: i64,
    pub kind: ActionKind,
    pub detail: Option<String>,
}

impl ClaimRequest {
    pub fn task(label: impl Into<String>, actor: impl Into<String>, points: i64) -> Self {
        Self {
            label: label.into(),
            actor: actor.into(),
            points,
            kind: ActionKind::Task,
            detail: None,
        }
    }

    pub fn penalty(
        label: impl Into<String>,
        actor: impl Into<String>,
        points: i64,
        reporter: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            actor: actor.into(),
            points,
            kind: ActionKind::Penalty {
                reporter: reporter.into(),
            },
            detail: None,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Result of a successful confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Confirmation {
    pub record_id: i64,
    pub actor: String,
    pub actor_name: String,
    pub task: String,
    pub points: i64,
    pub new_balance: i64,
    pub confirmer: String,
    pub confirmed_at: DateTime<Utc>,
    pub is_penalty: bool,
}

/// Claim/confirm/retract state machine over the ledger.
#[derive(Debug, Clone)]
pub struct ConfirmationWorkflow {
    roster: Roster,
    balance: BalanceEngine,
    confirmer_scope: ConfirmerScope,
}

impl ConfirmationWorkflow {
    #[must_use]
    pub fn new(roster: Roster, balance: BalanceEngine, confirmer_scope: ConfirmerScope) -> Self {
        Self {
            roster,
            balance,
            confirmer_scope,
        }
    }

    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Record an unconfirmed claim and return its id.
    ///
    /// Allowed for any rostered actor regardless of presence. Balances are
    /// not touched.
    pub fn claim(
        &self,
        ledger: &SqliteLedger,
        request: ClaimRequest,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        let actor = self
            .roster
            .get(&request.actor)
            .ok_or_else(|| FairflatError::NotFound(Missing::Member(request.actor.clone())))?;
        if let ActionKind::Penalty { reporter } = &request.kind
            && !self.roster.contains(reporter)
        {
            return Err(FairflatError::NotFound(Missing::Member(reporter.clone())));
        }

        let points = match request.kind {
            ActionKind::Task => request.points,
            ActionKind::Penalty { .. } => -request.points.saturating_abs(),
        };
        let action = NewAction {
            label: request.label,
            actor: request.actor,
            actor_name: actor.name.clone(),
            points,
            kind: request.kind,
            detail: request.detail,
            claimed_at: now,
        };
        let id = ledger.transaction(|tx| tx.insert_action(&action))?;
        tracing::info!(
            record_id = id,
            actor = %action.actor,
            label = %action.label,
            points,
            penalty = matches!(action.kind, ActionKind::Penalty { .. }),
            "claim recorded"
        );
        Ok(id)
    }

    /// Confirm record `record_id` on behalf of `confirmer`.
    ///
    /// Rejections leave the ledger untouched.
    pub fn confirm(
        &self,
        ledger: &SqliteLedger,
        record_id: i64,
        confirmer: &str,
        now: DateTime<Utc>,
    ) -> Result<Confirmation> {
        let result: Result<Confirmation> = ledger.transaction(|tx| {
            let record = tx
                .action(record_id)?
                .ok_or(FairflatError::NotFound(Missing::Record(record_id)))?;
            if record.confirmed {
                return Err(FairflatError::InvalidState(StateConflict::AlreadyConfirmed(
                    record_id,
                )));
            }

            let confirming = self.rostered_member(tx, confirmer)?;
            self.check_confirmer(&record, &confirming)
                .map_err(FairflatError::IdentityViolation)?;

            if !tx.mark_confirmed(record_id, confirmer, now)? {
                return Err(FairflatError::InvalidState(StateConflict::AlreadyConfirmed(
                    record_id,
                )));
            }
            let new_balance = self.balance.apply(tx, &record.actor, record.points)?;
            if !record.is_penalty() {
                tx.advance_queue_pointer(&record.label, &record.actor_name, now)?;
            }

            Ok(Confirmation {
                record_id,
                is_penalty: record.is_penalty(),
                actor: record.actor,
                actor_name: record.actor_name,
                task: record.label,
                points: record.points,
                new_balance,
                confirmer: confirmer.to_owned(),
                confirmed_at: now,
            })
        });

        match &result {
            Ok(done) => tracing::info!(
                record_id,
                actor = %done.actor,
                confirmer,
                points = done.points,
                new_balance = done.new_balance,
                "record confirmed"
            ),
            Err(err) => tracing::warn!(record_id, confirmer, reason = err.code(), "confirm rejected"),
        }
        result
    }

    /// Delete an unconfirmed record. Returns the removed record.
    pub fn retract(&self, ledger: &SqliteLedger, record_id: i64) -> Result<ActionRecord> {
        let result: Result<ActionRecord> = ledger.transaction(|tx| {
            let record = tx
                .action(record_id)?
                .ok_or(FairflatError::NotFound(Missing::Record(record_id)))?;
            if record.confirmed || !tx.delete_unconfirmed(record_id)? {
                return Err(FairflatError::InvalidState(StateConflict::RetractConfirmed(
                    record_id,
                )));
            }
            Ok(record)
        });
        match &result {
            Ok(record) => tracing::info!(record_id, actor = %record.actor, "claim retracted"),
            Err(err) => tracing::warn!(record_id, reason = err.code(), "retract rejected"),
        }
        result
    }

    /// Whether `confirmer` may confirm `record`.
    ///
    /// The actor can never confirm their own record. A penalty's reporter
    /// cannot confirm it, and under `ConfirmerScope::HomeOnly` the confirmer
    /// must be home; members flagged `can_always_confirm` skip those two
    /// checks.
    pub fn check_confirmer(
        &self,
        record: &ActionRecord,
        confirmer: &Member,
    ) -> std::result::Result<(), IdentityRule> {
        if confirmer.identity == record.actor {
            return Err(IdentityRule::SelfConfirmation);
        }
        let privileged = self.roster.can_always_confirm(&confirmer.identity);
        if let Some(reporter) = record.reporter()
            && reporter == confirmer.identity
            && !privileged
        {
            return Err(IdentityRule::ReporterConfirmation);
        }
        if self.confirmer_scope == ConfirmerScope::HomeOnly && !confirmer.is_home && !privileged {
            return Err(IdentityRule::ConfirmerAway);
        }
        Ok(())
    }

    fn rostered_member(
        &self,
        tx: &crate::ledger::LedgerTx<'_>,
        identity: &str,
    ) -> Result<Member> {
        if !self.roster.contains(identity) {
            return Err(FairflatError::NotFound(Missing::Member(identity.to_owned())));
        }
        tx.member(identity)?
            .ok_or_else(|| FairflatError::NotFound(Missing::Member(identity.to_owned())))
    }
}
