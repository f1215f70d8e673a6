//! End-to-end runs of the `ledger` binary against a temporary data directory

use serde_json::Value;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn ledger(data_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ledger"))
        .arg("--data-dir")
        .arg(data_dir)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run ledger binary")
}

fn json(data_dir: &Path, args: &[&str]) -> Value {
    let mut all = vec!["--json"];
    all.extend_from_slice(args);
    let output = ledger(data_dir, &all);
    assert!(
        output.status.success(),
        "ledger {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

// 1 token in minor units
const UNIT: u64 = 100_000_000;

#[test]
fn test_award_persists_between_runs() {
    let dir = TempDir::new().unwrap();

    let record = json(dir.path(), &["award", "alice", "0.05", "--reason", "signup"]);
    assert_eq!(record["token_class"], "Basic");
    assert_eq!(record["token_amount"], 50 * UNIT);

    let balances = json(dir.path(), &["balance", "alice"]);
    assert_eq!(balances["basic"], 50 * UNIT);
    assert_eq!(balances["premium"], 0);
}

#[test]
fn test_upgrade_selects_premium() {
    let dir = TempDir::new().unwrap();

    assert_eq!(json(dir.path(), &["select-class", "bob", "1"]), "Basic");
    assert!(ledger(dir.path(), &["upgrade", "bob"]).status.success());
    assert_eq!(json(dir.path(), &["select-class", "bob", "1"]), "Premium");
    assert_eq!(json(dir.path(), &["select-class", "bob", "0.05"]), "Basic");

    let record = json(dir.path(), &["award", "bob", "1"]);
    assert_eq!(record["token_class"], "Premium");
}

#[test]
fn test_external_ref_is_not_awarded_twice() {
    let dir = TempDir::new().unwrap();

    let first = json(dir.path(), &["award", "carol", "0.1", "--ref", "invoice-7"]);
    let second = json(dir.path(), &["award", "carol", "0.1", "--ref", "invoice-7"]);
    assert_eq!(first["id"], second["id"]);

    let balances = json(dir.path(), &["balance", "carol"]);
    assert_eq!(balances["basic"], 100 * UNIT);
}

#[test]
fn test_stake_and_early_unstake() {
    let dir = TempDir::new().unwrap();
    json(dir.path(), &["award", "dave", "0.2"]);

    let position = json(dir.path(), &["stake", "dave", "basic", "100", "--days", "30"]);
    let position_id = position["id"].as_str().unwrap().to_string();
    assert_eq!(position["status"], "Active");

    let early = ledger(dir.path(), &["unstake", &position_id]);
    assert!(!early.status.success());

    let outcome = json(dir.path(), &["unstake", &position_id, "--emergency"]);
    assert_eq!(outcome["returned_amount"], 50 * UNIT);

    let positions = json(dir.path(), &["positions", "dave"]);
    assert_eq!(positions[0]["status"], "Closed");

    let audit = json(dir.path(), &["audit"]);
    assert!(audit.as_array().unwrap().iter().all(|a| a["burned"].is_u64()));
}

#[test]
fn test_governance_round() {
    let dir = TempDir::new().unwrap();
    json(dir.path(), &["award", "erin", "1", "--class", "premium"]);

    let proposal = json(dir.path(), &["propose", "erin", "Lower fees"]);
    let proposal_id = proposal["id"].as_str().unwrap().to_string();

    let vote = json(dir.path(), &["vote", "erin", &proposal_id, "Yes"]);
    assert_eq!(vote["option"], "Yes");

    let again = ledger(dir.path(), &["vote", "erin", &proposal_id, "No"]);
    assert!(!again.status.success());

    let tally = json(dir.path(), &["tally", &proposal_id]);
    assert_eq!(tally["total_votes"], 1);

    let proposals = json(dir.path(), &["proposals"]);
    assert_eq!(proposals.as_array().unwrap().len(), 1);
}

#[test]
fn test_flush_confirms_pending_events() {
    let dir = TempDir::new().unwrap();
    json(dir.path(), &["award", "frank", "0.05"]);

    let report = json(dir.path(), &["flush", "--force"]);
    assert_eq!(report["confirmed"], 1);
    assert_eq!(report["pending"], 0);

    let stats = json(dir.path(), &["stats"]);
    assert_eq!(stats["settlement"]["total_confirmed"], 1);
}
