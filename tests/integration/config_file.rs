use fairflat::config::{ConfirmerScope, ResetScope};
use fairflat::error::FairflatError;
use fairflat::{FairflatConfig, Household};

#[test]
fn household_from_toml_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("data").join("flat.db");
    let toml = format!(
        r#"
[[members]]
identity = "@ann"
name = "Ann"
admin = true

[[members]]
identity = "@ben"
name = "Ben"

[ledger]
db_path = "{}"
min_balance = -5

[policy]
reset_scope = "balances_only"
confirmer_scope = "home_only"
"#,
        db_path.display()
    );
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, toml).expect("write config");

    let config = FairflatConfig::from_file(&config_path).expect("load");
    assert_eq!(config.policy.reset_scope, ResetScope::BalancesOnly);
    assert_eq!(config.policy.confirmer_scope, ConfirmerScope::HomeOnly);
    assert_eq!(config.tasks.len(), 8);

    let flat = Household::open(config).expect("open");
    assert!(db_path.exists());

    let id = flat.penalize("@ann", "@ben", "missed_task").expect("penalize");
    let penalty = flat.action(id).expect("record");
    assert_eq!(penalty.detail.as_deref(), Some("reported by Ann"));
    for _ in 0..3 {
        let id = flat.penalize("@ann", "@ben", "missed_task").expect("penalize");
        assert!(flat.confirm(id, "@ben").is_err());
    }
    let cooking = flat.record_cooking("@ben").expect("cook");
    let done = flat.confirm(cooking, "@ann").expect("confirm");
    assert_eq!(done.new_balance, 3);

    let pending = flat.pending_claims().expect("pending");
    assert_eq!(pending.len(), 4);
    for record in pending {
        flat.retract(record.id).expect("retract");
    }

    let report = flat.reset_all("@ann").expect("reset");
    assert_eq!(report.actions_deleted, 0);
    assert_eq!(flat.history_of("@ben", 10).expect("history").len(), 1);
}

#[test]
fn invalid_config_is_rejected_before_opening() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = crate::helpers::flat_config(dir.path());
    config.members.push(config.members[0].clone());
    assert!(matches!(
        Household::open(config),
        Err(FairflatError::Config(_))
    ));
    assert!(!dir.path().join("fairflat.db").exists());
}
