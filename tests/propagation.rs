// tests/propagation.rs

use std::error::Error;

use tupledag::dag::StateManager;
use tupledag::errors::ErrorKind;
use tupledag::tuple::AnyTuple;
use tupledag::types::{PlanStatus, Status};
use tupledag_test_utils::builders::{TesttupleBuilder, TraintupleBuilder, model_output};
use tupledag_test_utils::fixtures::{AGGREGATE_ALGO, ALGO, Harness, NODES, OBJECTIVE};
use tupledag_test_utils::init_tracing;

const N1: &str = NODES[0];
const N2: &str = NODES[1];
const N3: &str = NODES[2];

type TestResult = Result<(), Box<dyn Error>>;

fn train(
    h: &mut Harness,
    key: &str,
    worker: &str,
    parents: &[&str],
) -> Result<String, Box<dyn Error>> {
    Ok(h.traintuple(N1, TraintupleBuilder::new(key, ALGO, worker).parents(parents).build())?)
}

fn events_for(h: &Harness, key: &str) -> Vec<String> {
    h.ledger
        .events()
        .iter()
        .filter(|e| e.key == key)
        .map(|e| e.status.clone())
        .collect()
}

#[test]
fn failure_reaches_every_waiting_descendant() -> TestResult {
    init_tracing();
    let mut h = Harness::new();
    let a = train(&mut h, "a", N1, &[])?;
    let b = train(&mut h, "b", N2, &[&a])?;
    let c = train(&mut h, "c", N3, &[&b])?;
    let t = h
        .testtuple(N1, TesttupleBuilder::new("t", &c, OBJECTIVE).build())?;

    h.start(N1, &a)?;
    h.fail(N1, &a)?;

    for key in [&b, &c, &t] {
        assert_eq!(h.status(key), Status::Failed, "{key}");
    }
    Ok(())
}

#[test]
fn diamond_commits_each_child_once() -> TestResult {
    let mut h = Harness::new();
    let a = train(&mut h, "a", N1, &[])?;
    let b = train(&mut h, "b", N1, &[&a])?;
    let c = train(&mut h, "c", N2, &[&a])?;
    let d = h
        .aggregatetuple(
            N1,
            TraintupleBuilder::new("d", AGGREGATE_ALGO, N3).parents(&[&b, &c]).build(),
        )?;

    h.start(N1, &a)?;
    h.fail(N1, &a)?;

    assert_eq!(h.status(&d), Status::Failed);
    assert_eq!(events_for(&h, &d), vec!["waiting", "failed"]);
    Ok(())
}

#[test]
fn failure_step_lists_changes_in_commit_order() -> TestResult {
    let mut h = Harness::new();
    let a = train(&mut h, "a", N1, &[])?;
    let b = train(&mut h, "b", N1, &[&a])?;
    let c = train(&mut h, "c", N2, &[&a])?;
    h.aggregatetuple(
        N1,
        TraintupleBuilder::new("d", AGGREGATE_ALGO, N3).parents(&[&b, &c]).build(),
    )?;

    let step = h.run(|_, db| {
        let mut root = AnyTuple::load(db, "a")?;
        let mut manager = StateManager::new(db);
        manager.commit(&mut root, Status::Failed)?;
        manager.propagate("a", Status::Failed);
        manager.run()
    })?;

    // The root first, then its children in key order; d is reached through
    // c and skipped when b's turn comes.
    let keys: Vec<&str> = step.changes.iter().map(|c| c.key.as_str()).collect();
    assert_eq!(keys, vec!["a", "b", "c", "d"]);
    assert!(step.changes[1..].iter().all(|c| c.from == Status::Waiting));
    assert_eq!(step.changes[0].from, Status::Todo);
    assert_eq!(step.moved_to(Status::Failed), vec!["a", "b", "c", "d"]);
    assert!(step.moved_to(Status::Todo).is_empty());
    assert_eq!(step.status_of("d"), Some(Status::Failed));
    assert_eq!(step.status_of("ghost"), None);
    assert!(!step.is_empty());

    // Failing it again commits nothing.
    let again = h.run(|_, db| {
        let mut root = AnyTuple::load(db, "a")?;
        let mut manager = StateManager::new(db);
        assert!(!manager.commit(&mut root, Status::Failed)?);
        manager.propagate("a", Status::Failed);
        manager.run()
    })?;
    assert!(again.is_empty());
    assert_eq!(again.status_of("a"), None);
    Ok(())
}

#[test]
fn child_waits_for_every_parent() -> TestResult {
    let mut h = Harness::new();
    let a = train(&mut h, "a", N1, &[])?;
    let b = train(&mut h, "b", N2, &[])?;
    let c = h
        .aggregatetuple(
            N1,
            TraintupleBuilder::new("c", AGGREGATE_ALGO, N3).parents(&[&a, &b, &a]).build(),
        )?;
    assert_eq!(h.get(&c)?.base.in_model_keys, vec!["a", "b", "a"]);

    h.complete(&a, model_output("m-a"))?;
    assert_eq!(h.status(&c), Status::Waiting);
    h.complete(&b, model_output("m-b"))?;
    assert_eq!(h.status(&c), Status::Todo);
    assert_eq!(events_for(&h, &c), vec!["waiting", "todo"]);
    Ok(())
}

#[test]
fn initial_status_follows_parents() -> TestResult {
    let mut h = Harness::new();
    let done = train(&mut h, "done", N1, &[])?;
    h.complete(&done, model_output("m"))?;
    let failed = train(&mut h, "failed", N1, &[])?;
    h.fail(N1, &failed)?;

    let x = train(&mut h, "x", N2, &[&done])?;
    assert_eq!(h.status(&x), Status::Todo);
    let y = train(&mut h, "y", N2, &[&done, &failed])?;
    assert_eq!(h.status(&y), Status::Failed);

    // A parent that is not a tuple at all.
    let err = h
        .traintuple(N1, TraintupleBuilder::new("z", ALGO, N2).parent("ghost").build())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    Ok(())
}

#[test]
fn failure_does_not_travel_through_a_plan() -> TestResult {
    let mut h = Harness::new();
    let outside = train(&mut h, "outside", N1, &[])?;
    h.traintuple(
        N1,
        TraintupleBuilder::new("p-0", ALGO, N2).parent(&outside).plan("cp", 0).build(),
    )?;
    h.traintuple(
        N1,
        TraintupleBuilder::new("p-1", ALGO, N3).parent("p-0").plan("cp", 1).build(),
    )?;
    let after = train(&mut h, "after", N1, &["p-1"])?;

    h.start(N1, &outside)?;
    h.fail(N1, &outside)?;

    // The plan member fails with its parent, the plan aborts the rest, and
    // nothing downstream of the plan is touched.
    assert_eq!(h.status("p-0"), Status::Failed);
    assert_eq!(h.status("p-1"), Status::Aborted);
    assert_eq!(h.status(&after), Status::Waiting);
    assert_eq!(h.plan("cp")?.status, PlanStatus::Failed);
    Ok(())
}

#[test]
fn model_key_is_produced_once() -> TestResult {
    let mut h = Harness::new();
    let a = train(&mut h, "a", N1, &[])?;
    let b = train(&mut h, "b", N2, &[])?;

    h.complete(&a, model_output("shared"))?;
    h.start(N2, &b)?;
    let err = h.succeed(N2, &b, model_output("shared")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(h.status(&b), Status::Doing);

    let producer = h.run(|e, db| e.get_model_tuple(db, "shared"))?;
    assert_eq!(producer.base.key, a);
    let missing = h.run(|e, db| e.get_model_tuple(db, "nope")).unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::NotFound);
    Ok(())
}

#[test]
fn rejected_request_leaves_ledger_untouched() -> TestResult {
    let mut h = Harness::new();
    let a = train(&mut h, "a", N1, &[])?;
    let writes = h.ledger.write_count();
    let records = h.ledger.len();
    let events = h.ledger.events().len();

    let err = h
        .traintuple(N1, TraintupleBuilder::new(&a, ALGO, N2).build())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    match err {
        tupledag::errors::TupledagError::Conflict { key, .. } => {
            assert_eq!(key.as_deref(), Some("a"))
        }
        other => panic!("Expected Conflict, got: {other:?}"),
    }

    assert_eq!(h.ledger.write_count(), writes);
    assert_eq!(h.ledger.len(), records);
    assert_eq!(h.ledger.events().len(), events);
    Ok(())
}
