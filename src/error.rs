//! Error types for the fairflat ledger.
//!
//! Every rejection carries a structured reason. Adapters translate these into
//! user-facing text; the core never returns free-form messages.

use crate::ledger::LedgerError;

/// What a lookup failed to find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Missing {
    /// No action record with this id.
    Record(i64),
    /// Identity is not on the roster (or has no member row).
    Member(String),
    /// Task name is not in the task catalogue.
    Task(String),
    /// Penalty key is not in the penalty catalogue.
    Penalty(String),
}

impl std::fmt::Display for Missing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Record(id) => write!(f, "record #{id}"),
            Self::Member(identity) => write!(f, "member {identity}"),
            Self::Task(name) => write!(f, "task `{name}`"),
            Self::Penalty(key) => write!(f, "penalty `{key}`"),
        }
    }
}

/// A transition refused because of the record's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateConflict {
    /// Confirm attempted on a record that is already confirmed.
    AlreadyConfirmed(i64),
    /// Retract attempted on a record that is already confirmed.
    RetractConfirmed(i64),
}

impl std::fmt::Display for StateConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyConfirmed(id) => write!(f, "record #{id} is already confirmed"),
            Self::RetractConfirmed(id) => {
                write!(f, "record #{id} is confirmed and can no longer be retracted")
            }
        }
    }
}

/// Identity rule a caller broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityRule {
    /// The actor tried to confirm their own record.
    SelfConfirmation,
    /// The reporter of a penalty tried to confirm it.
    ReporterConfirmation,
    /// Confirmer is away while the confirmer scope is home-only.
    ConfirmerAway,
    /// Privileged operation attempted without the admin flag.
    NotAdmin,
}

impl std::fmt::Display for IdentityRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::SelfConfirmation => "a member cannot confirm their own record",
            Self::ReporterConfirmation => "the reporter of a penalty cannot confirm it",
            Self::ConfirmerAway => "confirmer must be home",
            Self::NotAdmin => "operation requires admin rights",
        })
    }
}

/// Top-level error type for ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum FairflatError {
    /// Referenced record, member, task or penalty does not exist.
    #[error("not found: {0}")]
    NotFound(Missing),

    /// Record is in a state that forbids the requested transition.
    #[error("invalid state: {0}")]
    InvalidState(StateConflict),

    /// Caller identity is not allowed to perform the transition.
    #[error("identity violation: {0}")]
    IdentityViolation(IdentityRule),

    /// Underlying store failed; nothing from the operation was committed.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FairflatError {
    /// Stable machine-readable code for adapters.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(Missing::Record(_)) => "record_not_found",
            Self::NotFound(Missing::Member(_)) => "member_not_found",
            Self::NotFound(Missing::Task(_)) => "task_not_found",
            Self::NotFound(Missing::Penalty(_)) => "penalty_not_found",
            Self::InvalidState(StateConflict::AlreadyConfirmed(_)) => "already_confirmed",
            Self::InvalidState(StateConflict::RetractConfirmed(_)) => "retract_confirmed",
            Self::IdentityViolation(IdentityRule::SelfConfirmation) => "self_confirmation",
            Self::IdentityViolation(IdentityRule::ReporterConfirmation) => "reporter_confirmation",
            Self::IdentityViolation(IdentityRule::ConfirmerAway) => "confirmer_away",
            Self::IdentityViolation(IdentityRule::NotAdmin) => "not_admin",
            Self::Ledger(_) => "store_failure",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, FairflatError>;
