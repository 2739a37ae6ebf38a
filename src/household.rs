//! Household facade: every operation the presentation layer calls.
//!
//! Owns the ledger and the injected roster. Time-dependent operations have an
//! `_at` variant taking an explicit `now`, which the plain variant calls with
//! the wall clock.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::balance::BalanceEngine;
use crate::config::{
    COOKING_TASK, DISHES_TASK, FairflatConfig, PenaltyDefinition, ResetScope, TaskDefinition,
};
use crate::error::{FairflatError, IdentityRule, Missing, Result};
use crate::ledger::{
    ActionFilter, ActionRecord, Member, PresenceFilter, QueuePointer, SqliteLedger,
};
use crate::roster::Roster;
use crate::rotation::{RotationPick, RotationSelector, Selection};
use crate::stats::{self, WeeklySummary};
use crate::workflow::{ClaimRequest, Confirmation, ConfirmationWorkflow};

/// Everything shown on a task's detail view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskStatus {
    pub task: TaskDefinition,
    pub selection: Selection,
    pub queue_pointer: Option<QueuePointer>,
}

impl TaskStatus {
    #[must_use]
    pub fn next(&self) -> Option<&RotationPick> {
        self.selection.pick()
    }
}

/// What an admin reset cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResetReport {
    pub scope: ResetScope,
    pub balances_reset: usize,
    pub pointers_reset: usize,
    pub actions_deleted: usize,
}

pub struct Household {
    config: FairflatConfig,
    ledger: SqliteLedger,
    workflow: ConfirmationWorkflow,
}

impl Household {
    /// Open the ledger configured in `config.ledger` and seed it.
    pub fn open(config: FairflatConfig) -> Result<Self> {
        config.validate()?;
        let path = config.ledger.resolved_db_path();
        let ledger = SqliteLedger::open(
            &path,
            Duration::from_millis(config.ledger.busy_timeout_ms),
        )?;
        tracing::info!(path = %path.display(), "household ledger opened");
        Self::with_ledger(config, ledger)
    }

    /// Wrap an already-open ledger. Seeding is idempotent: existing balances
    /// and presence flags survive.
    pub fn with_ledger(config: FairflatConfig, ledger: SqliteLedger) -> Result<Self> {
        config.validate()?;
        ledger.transaction(|tx| {
            for (position, member) in config.members.iter().enumerate() {
                let position = i64::try_from(position).unwrap_or(i64::MAX);
                tx.upsert_member(&member.identity, &member.name, position)?;
            }
            for task in &config.tasks {
                tx.seed_queue_pointer(&task.name)?;
            }
            Ok::<_, FairflatError>(())
        })?;

        let workflow = ConfirmationWorkflow::new(
            Roster::new(config.members.clone()),
            BalanceEngine::new(config.ledger.min_balance),
            config.policy.confirmer_scope,
        );
        Ok(Self {
            config,
            ledger,
            workflow,
        })
    }

    #[must_use]
    pub fn config(&self) -> &FairflatConfig {
        &self.config
    }

    #[must_use]
    pub fn roster(&self) -> &Roster {
        self.workflow.roster()
    }

    #[must_use]
    pub fn ledger(&self) -> &SqliteLedger {
        &self.ledger
    }

    // -----------------------------------------------------------------------
    // Catalogue and rotation
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn list_tasks(&self) -> &[TaskDefinition] {
        &self.config.tasks
    }

    #[must_use]
    pub fn list_penalties(&self) -> &[PenaltyDefinition] {
        &self.config.penalties
    }

    pub fn next_for(&self, task: &str) -> Result<Selection> {
        self.next_for_at(task, Utc::now())
    }

    /// Who owes `task` next, among members currently home.
    pub fn next_for_at(&self, task: &str, now: DateTime<Utc>) -> Result<Selection> {
        self.task_definition(task)?;
        Ok(self
            .ledger
            .snapshot(|tx| RotationSelector::next_for(tx, self.roster(), task, now))?)
    }

    pub fn task_status(&self, task: &str) -> Result<TaskStatus> {
        self.task_status_at(task, Utc::now())
    }

    pub fn task_status_at(&self, task: &str, now: DateTime<Utc>) -> Result<TaskStatus> {
        let definition = self.task_definition(task)?.clone();
        let (selection, queue_pointer) = self.ledger.snapshot(|tx| {
            Ok((
                RotationSelector::next_for(tx, self.roster(), task, now)?,
                tx.queue_pointer(task)?,
            ))
        })?;
        Ok(TaskStatus {
            task: definition,
            selection,
            queue_pointer,
        })
    }

    pub fn queue_pointer(&self, task: &str) -> Result<Option<QueuePointer>> {
        Ok(self.ledger.read(|tx| tx.queue_pointer(task))?)
    }

    // -----------------------------------------------------------------------
    // Claims
    // -----------------------------------------------------------------------

    pub fn claim(&self, request: ClaimRequest) -> Result<i64> {
        self.claim_at(request, Utc::now())
    }

    /// Record an arbitrary task or penalty claim.
    pub fn claim_at(&self, request: ClaimRequest, now: DateTime<Utc>) -> Result<i64> {
        self.workflow.claim(&self.ledger, request, now)
    }

    pub fn claim_task(&self, task: &str, actor: &str) -> Result<i64> {
        self.claim_task_at(task, actor, Utc::now())
    }

    /// Claim a catalogue task at its configured point value.
    pub fn claim_task_at(&self, task: &str, actor: &str, now: DateTime<Utc>) -> Result<i64> {
        let points = self.task_definition(task)?.points;
        self.claim_at(ClaimRequest::task(task, actor, points), now)
    }

    /// "Cooked for everyone".
    pub fn record_cooking(&self, actor: &str) -> Result<i64> {
        let points = self.task_definition(COOKING_TASK)?.points;
        self.claim(ClaimRequest::task(COOKING_TASK, actor, points).with_detail("for everyone"))
    }

    /// Dishes, optionally tied to the cooking record they followed. The
    /// reference is advisory text and is not checked.
    pub fn record_dishes(&self, actor: &str, after_cooking: Option<i64>) -> Result<i64> {
        let points = self.task_definition(DISHES_TASK)?.points;
        let mut request = ClaimRequest::task(DISHES_TASK, actor, points);
        if let Some(cooking_id) = after_cooking {
            request = request.with_detail(format!("after cooking #{cooking_id}"));
        }
        self.claim(request)
    }

    pub fn penalize(&self, reporter: &str, target: &str, key: &str) -> Result<i64> {
        self.penalize_at(reporter, target, key, Utc::now())
    }

    /// `reporter` assigns catalogue penalty `key` to `target`.
    pub fn penalize_at(
        &self,
        reporter: &str,
        target: &str,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        let penalty = self
            .config
            .penalty(key)
            .ok_or_else(|| FairflatError::NotFound(Missing::Penalty(key.to_owned())))?;
        let reporter_name = self.roster().display_name(reporter).to_owned();
        let request = ClaimRequest::penalty(
            format!("penalty: {}", penalty.label),
            target,
            penalty.points,
            reporter,
        )
        .with_detail(format!("reported by {reporter_name}"));
        self.claim_at(request, now)
    }

    // -----------------------------------------------------------------------
    // Confirmation
    // -----------------------------------------------------------------------

    pub fn confirm(&self, record_id: i64, confirmer: &str) -> Result<Confirmation> {
        self.confirm_at(record_id, confirmer, Utc::now())
    }

    pub fn confirm_at(
        &self,
        record_id: i64,
        confirmer: &str,
        now: DateTime<Utc>,
    ) -> Result<Confirmation> {
        self.workflow.confirm(&self.ledger, record_id, confirmer, now)
    }

    pub fn retract(&self, record_id: i64) -> Result<ActionRecord> {
        self.workflow.retract(&self.ledger, record_id)
    }

    /// Members `confirm` would accept for `record_id`, in roster order.
    pub fn eligible_confirmers(&self, record_id: i64) -> Result<Vec<Member>> {
        let (record, members) = self.ledger.snapshot(|tx| {
            Ok((tx.action(record_id)?, tx.list_members(PresenceFilter::All)?))
        })?;
        let record = record.ok_or(FairflatError::NotFound(Missing::Record(record_id)))?;
        if record.confirmed {
            return Ok(Vec::new());
        }
        Ok(members
            .into_iter()
            .filter(|m| self.roster().contains(&m.identity))
            .filter(|m| self.workflow.check_confirmer(&record, m).is_ok())
            .collect())
    }

    pub fn action(&self, record_id: i64) -> Result<ActionRecord> {
        self.ledger
            .read(|tx| tx.action(record_id))?
            .ok_or(FairflatError::NotFound(Missing::Record(record_id)))
    }

    /// Unconfirmed claims, newest first.
    pub fn pending_claims(&self) -> Result<Vec<ActionRecord>> {
        let records = self
            .ledger
            .read(|tx| tx.query_actions(&ActionFilter::default()))?;
        Ok(records.into_iter().filter(|r| !r.confirmed).collect())
    }

    // -----------------------------------------------------------------------
    // Members
    // -----------------------------------------------------------------------

    pub fn set_presence(&self, identity: &str, home: bool) -> Result<()> {
        self.rostered(identity)?;
        let updated = self
            .ledger
            .transaction(|tx| tx.set_presence(identity, home))?;
        if !updated {
            return Err(FairflatError::NotFound(Missing::Member(identity.to_owned())));
        }
        tracing::info!(identity, home, "presence changed");
        Ok(())
    }

    pub fn member(&self, identity: &str) -> Result<Member> {
        self.ledger
            .read(|tx| tx.member(identity))?
            .ok_or_else(|| FairflatError::NotFound(Missing::Member(identity.to_owned())))
    }

    pub fn members(&self) -> Result<Vec<Member>> {
        Ok(self.ledger.read(|tx| tx.list_members(PresenceFilter::All))?)
    }

    /// Current balance; 0 for identities without a ledger row.
    pub fn balance_of(&self, identity: &str) -> Result<i64> {
        Ok(self.ledger.read(|tx| tx.balance(identity))?)
    }

    /// Newest-first records where `identity` is the actor.
    pub fn history_of(&self, identity: &str, limit: usize) -> Result<Vec<ActionRecord>> {
        Ok(self
            .ledger
            .read(|tx| tx.query_actions(&ActionFilter::by_actor(identity).limit(limit)))?)
    }

    pub fn weekly_summary(&self) -> Result<WeeklySummary> {
        self.weekly_summary_at(Utc::now())
    }

    pub fn weekly_summary_at(&self, now: DateTime<Utc>) -> Result<WeeklySummary> {
        let min_balance = self.config.ledger.min_balance;
        Ok(self
            .ledger
            .snapshot(|tx| stats::weekly_summary(tx, now, min_balance))?)
    }

    // -----------------------------------------------------------------------
    // Administration
    // -----------------------------------------------------------------------

    /// Reset balances and queue pointers; with `ResetScope::Full` the action
    /// history goes too. Only members flagged `admin` may do this.
    pub fn reset_all(&self, by: &str) -> Result<ResetReport> {
        self.rostered(by)?;
        if !self.roster().is_admin(by) {
            tracing::warn!(by, "reset refused");
            return Err(FairflatError::IdentityViolation(IdentityRule::NotAdmin));
        }
        let scope = self.config.policy.reset_scope;
        let report = self.ledger.transaction(|tx| {
            let actions_deleted = match scope {
                ResetScope::Full => tx.clear_actions()?,
                ResetScope::BalancesOnly => 0,
            };
            Ok::<_, FairflatError>(ResetReport {
                scope,
                balances_reset: tx.reset_balances()?,
                pointers_reset: tx.reset_queue_pointers()?,
                actions_deleted,
            })
        })?;
        tracing::info!(
            by,
            ?scope,
            balances = report.balances_reset,
            actions = report.actions_deleted,
            "ledger reset"
        );
        Ok(report)
    }

    fn task_definition(&self, task: &str) -> Result<&TaskDefinition> {
        self.config
            .task(task)
            .ok_or_else(|| FairflatError::NotFound(Missing::Task(task.to_owned())))
    }

    fn rostered(&self, identity: &str) -> Result<()> {
        if self.roster().contains(identity) {
            Ok(())
        } else {
            Err(FairflatError::NotFound(Missing::Member(identity.to_owned())))
        }
    }
}
