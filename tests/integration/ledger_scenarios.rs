use chrono::{Duration, Utc};
use fairflat::Selection;
use fairflat::config::ConfirmerScope;
use fairflat::error::{FairflatError, IdentityRule, Missing, StateConflict};
use fairflat::ledger::ActionState;
use fairflat::{ClaimRequest, Household};

use crate::helpers::{flat_config, temp_household};

#[test]
fn claim_confirm_and_self_confirm_end_to_end() {
    let (flat, _dir) = temp_household();
    let now = Utc::now();

    let first = flat.claim_task_at("trash", "@alice", now).expect("claim");
    assert_eq!(
        flat.action(first).expect("record").state(),
        ActionState::Claimed
    );
    assert_eq!(flat.balance_of("@alice").expect("balance"), 0);

    let done = flat.confirm_at(first, "@bob", now).expect("confirm");
    assert_eq!(done.actor_name, "Alice");
    assert_eq!(done.task, "trash");
    assert_eq!(done.points, 1);
    assert_eq!(done.new_balance, 1);
    assert_eq!(flat.balance_of("@alice").expect("balance"), 1);

    let pointer = flat
        .queue_pointer("trash")
        .expect("read pointer")
        .expect("pointer seeded");
    assert_eq!(pointer.last_user, "Alice");
    assert_eq!(
        pointer.last_date.map(|d| d.timestamp()),
        Some(now.timestamp())
    );

    let second = flat.claim_task("trash", "@alice").expect("claim again");
    let err = flat.confirm(second, "@alice").expect_err("self confirmation");
    assert!(matches!(
        err,
        FairflatError::IdentityViolation(IdentityRule::SelfConfirmation)
    ));
    assert_eq!(err.code(), "self_confirmation");
    assert_eq!(flat.balance_of("@alice").expect("balance"), 1);
    assert!(!flat.action(second).expect("record").confirmed);
}

#[test]
fn second_confirmation_changes_nothing() {
    let (flat, _dir) = temp_household();
    let id = flat.claim_task("toilet", "@bob").expect("claim");
    flat.confirm(id, "@carol").expect("confirm");
    let pointer_before = flat.queue_pointer("toilet").expect("pointer");

    let err = flat.confirm(id, "@alice").expect_err("already confirmed");
    assert!(matches!(
        err,
        FairflatError::InvalidState(StateConflict::AlreadyConfirmed(_))
    ));
    assert_eq!(flat.balance_of("@bob").expect("balance"), 4);
    assert_eq!(flat.queue_pointer("toilet").expect("pointer"), pointer_before);
    assert_eq!(
        flat.action(id).expect("record").confirmer.as_deref(),
        Some("@carol")
    );
}

#[test]
fn balance_never_drops_below_floor() {
    let (flat, _dir) = temp_household();
    let mut expected: i64 = 0;
    for _ in 0..7 {
        let id = flat.penalize("@bob", "@alice", "missed_task").expect("penalize");
        let done = flat.confirm(id, "@carol").expect("confirm");
        expected = (expected - 2).max(-10);
        assert_eq!(done.new_balance, expected);
        assert!(done.new_balance >= -10);
    }
    assert_eq!(flat.balance_of("@alice").expect("balance"), -10);

    let id = flat.claim_task("bathroom", "@alice").expect("claim");
    assert_eq!(flat.confirm(id, "@bob").expect("confirm").new_balance, -7);
}

#[test]
fn rotation_prefers_never_done_then_longest_ago() {
    let (flat, _dir) = temp_household();
    let now = Utc::now();

    let ten_days = now - Duration::days(10);
    let id = flat.claim_task_at("kitchen", "@alice", ten_days).expect("claim");
    flat.confirm_at(id, "@carol", ten_days).expect("confirm");
    let yesterday = now - Duration::days(1);
    let id = flat.claim_task_at("kitchen", "@carol", yesterday).expect("claim");
    flat.confirm_at(id, "@alice", yesterday).expect("confirm");
    flat.set_presence("@rita", false).expect("rita away");

    let pick = flat.next_for_at("kitchen", now).expect("next");
    assert_eq!(pick.pick().map(|p| p.name.as_str()), Some("Bob"));

    flat.set_presence("@bob", false).expect("bob away");
    let pick = flat.next_for_at("kitchen", now).expect("next");
    let pick = pick.pick().expect("somebody home");
    assert_eq!(pick.identity, "@alice");
    assert_eq!(pick.last_done.map(|d| d.timestamp()), Some(ten_days.timestamp()));

    flat.set_presence("@alice", false).expect("alice away");
    flat.set_presence("@carol", false).expect("carol away");
    assert_eq!(
        flat.next_for_at("kitchen", now).expect("next"),
        Selection::AllAway
    );
}

#[test]
fn unconfirmed_claims_and_penalties_do_not_affect_rotation() {
    let (flat, _dir) = temp_household();
    let now = Utc::now();
    flat.claim_task_at("vacuum", "@alice", now - Duration::days(3))
        .expect("unconfirmed claim");
    let penalty = flat
        .claim_at(
            ClaimRequest::penalty("vacuum", "@alice", 1, "@bob"),
            now - Duration::days(2),
        )
        .expect("penalty");
    flat.confirm_at(penalty, "@carol", now - Duration::days(2))
        .expect("confirm penalty");

    let pick = flat.next_for_at("vacuum", now).expect("next");
    assert_eq!(pick.pick().map(|p| p.identity.as_str()), Some("@alice"));
}

#[test]
fn retraction_only_before_confirmation() {
    let (flat, _dir) = temp_household();
    let pending = flat.claim_task("hallway", "@carol").expect("claim");
    let removed = flat.retract(pending).expect("retract");
    assert_eq!(removed.label, "hallway");
    assert!(matches!(
        flat.action(pending),
        Err(FairflatError::NotFound(Missing::Record(_)))
    ));

    let confirmed = flat.claim_task("hallway", "@carol").expect("claim");
    flat.confirm(confirmed, "@bob").expect("confirm");
    let err = flat.retract(confirmed).expect_err("confirmed");
    assert!(matches!(
        err,
        FairflatError::InvalidState(StateConflict::RetractConfirmed(_))
    ));
    let kept = flat.action(confirmed).expect("still present");
    assert!(kept.confirmed);
    assert_eq!(flat.balance_of("@carol").expect("balance"), 2);
}

#[test]
fn penalty_needs_a_third_member() {
    let (flat, _dir) = temp_household();
    let id = flat.penalize("@bob", "@alice", "mess").expect("penalize");

    assert!(matches!(
        flat.confirm(id, "@bob"),
        Err(FairflatError::IdentityViolation(
            IdentityRule::ReporterConfirmation
        ))
    ));
    assert!(matches!(
        flat.confirm(id, "@alice"),
        Err(FairflatError::IdentityViolation(
            IdentityRule::SelfConfirmation
        ))
    ));
    assert_eq!(flat.balance_of("@alice").expect("balance"), 0);

    let done = flat.confirm(id, "@carol").expect("third member confirms");
    assert!(done.is_penalty);
    assert_eq!(done.new_balance, -1);
    assert_eq!(flat.balance_of("@alice").expect("balance"), -1);
}

#[test]
fn self_reported_penalty_needs_any_other_member() {
    let (flat, _dir) = temp_household();
    let id = flat.penalize("@alice", "@alice", "litter").expect("penalize");
    assert!(matches!(
        flat.confirm(id, "@alice"),
        Err(FairflatError::IdentityViolation(
            IdentityRule::SelfConfirmation
        ))
    ));
    flat.confirm(id, "@bob").expect("other member confirms");
}

#[test]
fn home_only_policy_with_privileged_override() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = flat_config(dir.path());
    config.policy.confirmer_scope = ConfirmerScope::HomeOnly;
    let flat = Household::open(config).expect("open");

    flat.set_presence("@bob", false).expect("bob away");
    flat.set_presence("@rita", false).expect("rita away");
    let id = flat.claim_task("dishes", "@alice").expect("claim");

    let eligible: Vec<_> = flat
        .eligible_confirmers(id)
        .expect("eligible")
        .into_iter()
        .map(|m| m.identity)
        .collect();
    assert_eq!(eligible, vec!["@carol".to_owned(), "@rita".to_owned()]);

    assert!(matches!(
        flat.confirm(id, "@bob"),
        Err(FairflatError::IdentityViolation(IdentityRule::ConfirmerAway))
    ));
    flat.confirm(id, "@rita").expect("privileged confirm while away");
}

#[test]
fn ledger_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let id = {
        let flat = Household::open(flat_config(dir.path())).expect("open");
        flat.set_presence("@carol", false).expect("away");
        let id = flat.claim_task("kitchen", "@bob").expect("claim");
        flat.confirm(id, "@alice").expect("confirm");
        id
    };

    let reopened = Household::open(flat_config(dir.path())).expect("reopen");
    assert_eq!(reopened.balance_of("@bob").expect("balance"), 3);
    assert!(reopened.action(id).expect("record").confirmed);
    assert!(!reopened.member("@carol").expect("member").is_home);
    assert_eq!(
        reopened.ledger().schema_version().expect("version"),
        Some(1)
    );
}

#[test]
fn weekly_summary_counts_recent_confirmed_points() {
    let (flat, _dir) = temp_household();
    let now = Utc::now();
    for (task, actor, confirmer, days) in [
        ("trash", "@alice", "@bob", 1),
        ("trash", "@bob", "@alice", 2),
        ("toilet", "@alice", "@carol", 3),
        ("kitchen", "@carol", "@alice", 12),
    ] {
        let at = now - Duration::days(days);
        let id = flat.claim_task_at(task, actor, at).expect("claim");
        flat.confirm_at(id, confirmer, at).expect("confirm");
    }
    let penalty = flat
        .penalize_at("@bob", "@alice", "mess", now - Duration::hours(2))
        .expect("penalize");
    flat.confirm(penalty, "@carol").expect("confirm penalty");
    flat.claim_task("vacuum", "@bob").expect("unconfirmed");

    let summary = flat.weekly_summary_at(now).expect("summary");
    let points: Vec<_> = summary
        .members
        .iter()
        .map(|m| (m.identity.as_str(), m.week_points, m.balance))
        .collect();
    assert_eq!(
        points,
        vec![
            ("@alice", 4, 4),
            ("@bob", 1, 1),
            ("@carol", 0, 3),
            ("@rita", 0, 0),
        ]
    );
    assert_eq!(summary.frequent_tasks[0].task, "trash");
    assert_eq!(summary.frequent_tasks[0].count, 2);
    assert_eq!(summary.frequent_tasks.len(), 2);
}

#[test]
fn member_removed_from_config_leaves_rotation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let now = Utc::now();
    {
        let flat = Household::open(flat_config(dir.path())).expect("open");
        for (actor, confirmer, days) in [
            ("@alice", "@bob", 3),
            ("@bob", "@alice", 2),
            ("@rita", "@alice", 1),
        ] {
            let at = now - Duration::days(days);
            let id = flat.claim_task_at("toilet", actor, at).expect("claim");
            flat.confirm_at(id, confirmer, at).expect("confirm");
        }
        let pick = flat.next_for_at("toilet", now).expect("next");
        assert_eq!(pick.pick().map(|p| p.identity.as_str()), Some("@carol"));
    }

    let mut config = flat_config(dir.path());
    config.members.retain(|m| m.identity != "@carol");
    let flat = Household::open(config).expect("reopen without carol");

    let pick = flat.next_for_at("toilet", now).expect("next");
    assert_eq!(pick.pick().map(|p| p.identity.as_str()), Some("@alice"));
    let status = flat.task_status_at("toilet", now).expect("status");
    assert_eq!(status.next().map(|p| p.identity.as_str()), Some("@alice"));
    assert!(matches!(
        flat.claim_task("toilet", "@carol"),
        Err(FairflatError::NotFound(Missing::Member(_)))
    ));
}
