//! Shared helpers for integration tests.

use std::path::Path;

use fairflat::config::MemberConfig;
use fairflat::{FairflatConfig, Household};

/// Four-member flat: Alice (admin), Bob, Carol and Rita, who may always
/// confirm. The ledger lives in `dir`.
pub(crate) fn flat_config(dir: &Path) -> FairflatConfig {
    let mut alice = MemberConfig::new("@alice", "Alice");
    alice.admin = true;
    let mut rita = MemberConfig::new("@rita", "Rita");
    rita.can_always_confirm = true;

    let mut config = FairflatConfig::with_members(vec![
        alice,
        MemberConfig::new("@bob", "Bob"),
        MemberConfig::new("@carol", "Carol"),
        rita,
    ]);
    config.ledger.db_path = Some(dir.join("fairflat.db"));
    config
}

/// Open a household on a fresh ledger file. Returns `(household, tempdir)`;
/// keep the tempdir alive for the duration of the test.
pub(crate) fn temp_household() -> (Household, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let household = Household::open(flat_config(dir.path())).expect("open household");
    (household, dir)
}
