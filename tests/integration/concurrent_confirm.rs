use std::sync::{Arc, Barrier};
use std::thread;

use fairflat::Household;
use fairflat::error::{FairflatError, StateConflict};

use crate::helpers::flat_config;

#[test]
fn racing_confirmations_from_separate_handles_apply_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = flat_config(dir.path());
    let first = Arc::new(Household::open(config.clone()).expect("open first handle"));
    let second = Arc::new(Household::open(config).expect("open second handle"));

    for round in 0..10 {
        let id = first.claim_task("toilet", "@alice").expect("claim");
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = [(Arc::clone(&first), "@bob"), (Arc::clone(&second), "@carol")]
            .into_iter()
            .map(|(household, confirmer)| {
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    household.confirm(id, confirmer)
                })
            })
            .collect();
        let results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("confirm thread"))
            .collect();

        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "round {round}: exactly one confirmation wins");
        for result in &results {
            if let Err(err) = result {
                assert!(matches!(
                    err,
                    FairflatError::InvalidState(StateConflict::AlreadyConfirmed(_))
                ));
            }
        }
        assert_eq!(
            second.balance_of("@alice").expect("balance"),
            4 * (round + 1)
        );
    }
}

#[test]
fn concurrent_claims_get_distinct_ids() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = flat_config(dir.path());
    let households: Vec<_> = (0..4)
        .map(|_| Arc::new(Household::open(config.clone()).expect("open handle")))
        .collect();
    let barrier = Arc::new(Barrier::new(households.len()));

    let handles: Vec<_> = households
        .iter()
        .zip(["@alice", "@bob", "@carol", "@rita"])
        .map(|(household, actor)| {
            let household = Arc::clone(household);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..5)
                    .map(|_| household.claim_task("trash", actor).expect("claim"))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids: Vec<i64> = handles
        .into_iter()
        .flat_map(|h| h.join().expect("claim thread"))
        .collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 20);
    assert_eq!(households[0].pending_claims().expect("pending").len(), 20);
}
