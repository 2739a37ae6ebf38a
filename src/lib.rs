//! Fairflat: fair chore rotation and a dual-confirmation point ledger for a
//! shared flat.
//!
//! # Architecture
//!
//! Components, leaf first:
//! - **Ledger**: SQLite store for members, action records and per-task queue
//!   pointers. Every operation is one immediate transaction.
//! - **Balance engine**: floor-clamped point accumulation.
//! - **Rotation selector**: picks who owes a task next by per-task recency
//!   among members who are home.
//! - **Confirmation workflow**: claim → confirm by a different member →
//!   points applied exactly once.
//! - **Household**: facade over the above, plus the HTTP **gateway** and
//!   the `fairflat` CLI.

pub mod balance;
pub mod config;
pub mod error;
pub mod fairflat_dirs;
pub mod gateway;
pub mod household;
pub mod ledger;
pub mod roster;
pub mod rotation;
pub mod stats;
pub mod workflow;

pub use config::FairflatConfig;
pub use error::{FairflatError, Result};
pub use household::Household;
pub use ledger::SqliteLedger;
pub use rotation::Selection;
pub use workflow::{ClaimRequest, Confirmation};
