use governance::*;
use ledger_core::{Amount, BalanceStore, GovernancePolicy, ManualClock, TierTable, TokenClass};
use std::sync::{Arc, Barrier};
use std::thread;

fn setup() -> (Arc<BalanceStore>, Arc<GovernanceEngine>) {
    let balances = Arc::new(BalanceStore::new());
    let engine = Arc::new(GovernanceEngine::new(
        balances.clone(),
        TierTable::default(),
        GovernancePolicy::default(),
        Arc::new(ManualClock::default()),
    ));
    (balances, engine)
}

#[test]
fn test_concurrent_double_vote() {
    let (balances, engine) = setup();
    balances
        .credit("alice", TokenClass::Premium, Amount::from_tokens(50))
        .unwrap();
    let proposal = engine.create_proposal("alice", "Fee cut", "", vec![]).unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = ["Yes", "No"]
        .into_iter()
        .map(|option| {
            let engine = engine.clone();
            let barrier = barrier.clone();
            let id = proposal.id.clone();
            thread::spawn(move || {
                barrier.wait();
                engine.vote("alice", &id, option)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(GovernanceError::AlreadyVoted { .. }))));

    let tally = engine.tally(&proposal.id).unwrap();
    assert_eq!(tally.total_votes, 1);
    assert_eq!(tally.total_weighted, Amount::from_tokens(500));
    assert_eq!(engine.votes_for(&proposal.id).len(), 1);
}

#[test]
fn test_many_voters_one_vote_each() {
    let (balances, engine) = setup();
    balances
        .credit("chair", TokenClass::Premium, Amount::from_tokens(10))
        .unwrap();
    let proposal = engine.create_proposal("chair", "Budget", "", vec![]).unwrap();

    let voters: Vec<String> = (0..16).map(|i| format!("voter-{}", i)).collect();
    for voter in &voters {
        balances
            .credit(voter, TokenClass::Premium, Amount::from_tokens(1))
            .unwrap();
    }

    let handles: Vec<_> = voters
        .iter()
        .flat_map(|voter| [voter.clone(), voter.clone()])
        .map(|voter| {
            let engine = engine.clone();
            let id = proposal.id.clone();
            thread::spawn(move || engine.vote(&voter, &id, "Yes").is_ok())
        })
        .collect();

    let accepted = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();
    assert_eq!(accepted, voters.len());

    let stats = engine.stats();
    assert_eq!(stats.total_votes, 16);
    assert_eq!(stats.total_weighted_votes, Amount::from_tokens(160));
}

#[test]
fn test_error_kinds() {
    use ledger_core::ErrorKind;

    assert_eq!(
        GovernanceError::ProposalNotFound("p".to_string()).kind(),
        ErrorKind::State
    );
    assert_eq!(
        GovernanceError::InvalidProposal("empty".to_string()).kind(),
        ErrorKind::Validation
    );
    assert_eq!(
        GovernanceError::NoVotingPower("u".to_string()).kind(),
        ErrorKind::Resource
    );
    assert_eq!(
        GovernanceError::VotingClosed("p".to_string()).kind(),
        ErrorKind::Policy
    );
}

#[test]
fn test_snapshot_round_trip_json() {
    let (balances, engine) = setup();
    balances
        .credit("alice", TokenClass::Premium, Amount::from_tokens(12))
        .unwrap();
    let proposal = engine.create_proposal("alice", "t", "d", vec![]).unwrap();
    engine.vote("alice", &proposal.id, "No").unwrap();

    let json = serde_json::to_string(&engine.snapshot()).unwrap();
    let snapshot: GovernanceSnapshot = serde_json::from_str(&json).unwrap();

    let (_balances, restored) = setup();
    restored.restore(snapshot);
    let tally = restored.tally(&proposal.id).unwrap();
    assert_eq!(tally.options[1].votes, 1);
    assert!(restored.proposal(&proposal.id).unwrap().has_voted("alice"));
}
