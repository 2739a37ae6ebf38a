//! Weekly household summary.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::ledger::{ActionFilter, LedgerError, LedgerTx, PresenceFilter};

/// Length of the summary window.
pub const SUMMARY_WINDOW_DAYS: i64 = 7;

/// How many frequent tasks the summary lists.
pub const TOP_TASKS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberSummary {
    pub identity: String,
    pub name: String,
    pub is_home: bool,
    pub balance: i64,
    /// Confirmed points (penalties included) claimed inside the window.
    pub week_points: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskFrequency {
    pub task: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklySummary {
    pub window_start: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    pub min_balance: i64,
    pub members: Vec<MemberSummary>,
    pub frequent_tasks: Vec<TaskFrequency>,
}

/// Build the summary for the seven days ending at `now`.
pub fn weekly_summary(
    tx: &LedgerTx<'_>,
    now: DateTime<Utc>,
    min_balance: i64,
) -> Result<WeeklySummary, LedgerError> {
    let window_start = now - Duration::days(SUMMARY_WINDOW_DAYS);

    let mut members = Vec::new();
    for member in tx.list_members(PresenceFilter::All)? {
        let week_points = tx
            .query_actions(
                &ActionFilter::by_actor(member.identity.as_str())
                    .confirmed()
                    .since(window_start),
            )?
            .iter()
            .map(|r| r.points)
            .sum::<i64>();
        members.push(MemberSummary {
            identity: member.identity,
            name: member.name,
            is_home: member.is_home,
            balance: member.balance,
            week_points,
        });
    }

    let frequent_tasks = tx
        .frequent_tasks(window_start, TOP_TASKS)?
        .into_iter()
        .map(|(task, count)| TaskFrequency { task, count })
        .collect();

    Ok(WeeklySummary {
        window_start,
        generated_at: now,
        min_balance,
        members,
        frequent_tasks,
    })
}
