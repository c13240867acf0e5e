// tests/lifecycle.rs

use std::error::Error;

use tupledag::errors::ErrorKind;
use tupledag::tuple::TupleOutput;
use tupledag::types::{AssetType, Status};
use tupledag_test_utils::builders::{
    CompositeBuilder, TesttupleBuilder, TraintupleBuilder, composite_output, model_output,
};
use tupledag_test_utils::fixtures::{
    AGGREGATE_ALGO, ALGO, COMPOSITE_ALGO, Harness, NODES, OBJECTIVE, PRIVATE_OBJECTIVE,
};
use tupledag_test_utils::init_tracing;

const N1: &str = NODES[0];
const N2: &str = NODES[1];

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn train_chain_runs_to_completion() -> TestResult {
    init_tracing();
    let mut h = Harness::new();

    let a = h.traintuple(N1, TraintupleBuilder::new("tt-a", ALGO, N1).build())?;
    let b = h
        .traintuple(N1, TraintupleBuilder::new("tt-b", ALGO, N2).parent(&a).build())?;
    assert_eq!(h.status(&a), Status::Todo);
    assert_eq!(h.status(&b), Status::Waiting);

    let view = h.start(N1, &a)?;
    assert_eq!(view.base.status, Status::Doing);

    let view = h.succeed(N1, &a, model_output("model-a"))?;
    assert_eq!(view.base.status, Status::Done);
    assert_eq!(view.out_model.ok_or("no out model")?.key, "model-a");
    assert_eq!(h.status(&b), Status::Todo);

    h.complete(&b, model_output("model-b"))?;
    assert_eq!(h.status(&b), Status::Done);

    let producer = h.run(|e, db| e.get_model_tuple(db, "model-b"))?;
    assert_eq!(producer.base.key, "tt-b");
    Ok(())
}

#[test]
fn derived_key_when_none_is_supplied() -> TestResult {
    let mut h = Harness::new();
    let key = h.traintuple(N1, TraintupleBuilder::new("", ALGO, N1).build())?;
    assert_eq!(key.len(), 64);
    assert!(key.chars().all(|c| c.is_ascii_hexdigit()));

    // Same content derives the same key.
    let err = h
        .traintuple(N1, TraintupleBuilder::new("", ALGO, N1).build())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    Ok(())
}

#[test]
fn creation_rejects_bad_references() -> TestResult {
    let mut h = Harness::new();

    let err = h
        .traintuple(N1, TraintupleBuilder::new("tt", "no-such-algo", N1).build())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    // An aggregate algo is not a plain algo.
    let err = h
        .traintuple(N1, TraintupleBuilder::new("tt", AGGREGATE_ALGO, N1).build())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    let err = h
        .traintuple(N1, TraintupleBuilder::new("tt", ALGO, "node-42").build())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    let err = h
        .traintuple(N1, TraintupleBuilder::new("bad key!", ALGO, N1).build())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    let err = h
        .traintuple(N1, TraintupleBuilder::new("tt", ALGO, N1).tag(&"x".repeat(65)).build())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    // Nothing above reached the ledger.
    assert!(h.get("tt").is_err());
    Ok(())
}

#[test]
fn only_the_worker_reports_progress() -> TestResult {
    let mut h = Harness::new();
    let key = h.traintuple(N1, TraintupleBuilder::new("tt", ALGO, N2).build())?;

    let err = h.start(N1, &key).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_eq!(h.status(&key), Status::Todo);

    h.start(N2, &key)?;
    let err = h.fail(N1, &key).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_eq!(h.status(&key), Status::Doing);
    Ok(())
}

#[test]
fn illegal_transitions_are_internal() -> TestResult {
    let mut h = Harness::new();
    let key = h.traintuple(N1, TraintupleBuilder::new("tt", ALGO, N1).build())?;

    // todo -> done skips doing.
    let err = h.succeed(N1, &key, model_output("m")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    let view = h.get(&key)?;
    assert_eq!(view.base.status, Status::Todo);
    assert!(view.out_model.is_none());

    h.start(N1, &key)?;
    h.succeed(N1, &key, model_output("m"))?;
    let err = h.fail(N1, &key).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(h.status(&key), Status::Done);
    Ok(())
}

#[test]
fn repeating_the_current_status_is_a_no_op() -> TestResult {
    let mut h = Harness::new();
    let key = h.traintuple(N1, TraintupleBuilder::new("tt", ALGO, N1).build())?;
    h.start(N1, &key)?;

    let writes = h.ledger.write_count();
    let events = h.ledger.events().len();
    let view = h.start(N1, &key)?;
    assert_eq!(view.base.status, Status::Doing);
    assert_eq!(h.ledger.write_count(), writes);
    assert_eq!(h.ledger.events().len(), events);
    Ok(())
}

#[test]
fn output_must_match_kind() -> TestResult {
    let mut h = Harness::new();
    let key = h.traintuple(N1, TraintupleBuilder::new("tt", ALGO, N1).build())?;
    h.start(N1, &key)?;

    let err = h.succeed(N1, &key, composite_output("h", "t")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    let mut bad = model_output("m");
    if let TupleOutput::Model(ref mut model) = bad {
        model.checksum = "not-hex".to_string();
    }
    let err = h.succeed(N1, &key, bad).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
    assert_eq!(h.status(&key), Status::Doing);
    Ok(())
}

#[test]
fn composite_head_and_trunk() -> TestResult {
    let mut h = Harness::new();

    let err = h
        .composite(N1, CompositeBuilder::new("c", COMPOSITE_ALGO, N1).head("x").build())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    let c0 = h
        .composite(N1, CompositeBuilder::new("c0", COMPOSITE_ALGO, N1).build())?;
    let agg = h
        .aggregatetuple(N1, TraintupleBuilder::new("agg", AGGREGATE_ALGO, N2).build())?;

    // Head must come from a composite tuple.
    let err = h
        .composite(
            N1,
            CompositeBuilder::new("c1", COMPOSITE_ALGO, N1).head(&agg).trunk(&c0).build(),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    // Head must have been trained on the same worker.
    let err = h
        .composite(
            N1,
            CompositeBuilder::new("c1", COMPOSITE_ALGO, N2).head(&c0).trunk(&agg).build(),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    let c1 = h
        .composite(
            N1,
            CompositeBuilder::new("c1", COMPOSITE_ALGO, N1).head(&c0).trunk(&agg).build(),
        )?;
    let view = h.get(&c1)?;
    assert_eq!(view.base.status, Status::Waiting);
    assert_eq!(view.base.in_model_keys, vec![c0.clone(), agg.clone()]);
    let head_permissions = view.out_head_permissions.ok_or("no head permissions")?;
    assert!(!head_permissions.is_public());
    assert_eq!(head_permissions.process.authorized_ids, vec![N1.to_string()]);
    assert!(view.permissions.ok_or("no permissions")?.is_public());

    h.complete(&c0, composite_output("c0-head", "c0-trunk"))?;
    assert_eq!(h.status(&c1), Status::Waiting);
    h.complete(&agg, model_output("agg-model"))?;
    assert_eq!(h.status(&c1), Status::Todo);

    let view = h.complete(&c1, composite_output("c1-head", "c1-trunk"))?;
    assert_eq!(view.out_head_model.ok_or("no head model")?.key, "c1-head");
    assert_eq!(view.out_model.ok_or("no trunk model")?.key, "c1-trunk");
    Ok(())
}

#[test]
fn testtuple_evaluates_a_model() -> TestResult {
    let mut h = Harness::new();
    let train = h.traintuple(N1, TraintupleBuilder::new("tt", ALGO, N2).build())?;

    let test = h
        .testtuple(N1, TesttupleBuilder::new("test", &train, OBJECTIVE).build())?;
    let view = h.get(&test)?;
    assert_eq!(view.base.asset_type, AssetType::Testtuple);
    assert_eq!(view.base.worker, N2, "worker defaults to the tested tuple's");
    assert_eq!(view.base.algo_key, ALGO);
    assert_eq!(view.base.status, Status::Waiting);
    assert_eq!(view.objective_key.as_deref(), Some(OBJECTIVE));

    h.complete(&train, model_output("m"))?;
    assert_eq!(h.status(&test), Status::Todo);

    h.start(N2, &test)?;
    let err = h
        .succeed(N2, &test, TupleOutput::Perf(f32::NAN))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
    let view = h
        .succeed(N2, &test, TupleOutput::Perf(0.87))?;
    assert_eq!(view.perf, Some(0.87));
    assert_eq!(view.base.status, Status::Done);
    Ok(())
}

#[test]
fn testtuple_checks_objective_and_parent() -> TestResult {
    let mut h = Harness::new();
    let train = h.traintuple(N1, TraintupleBuilder::new("tt", ALGO, N1).build())?;

    let err = h
        .testtuple(N2, TesttupleBuilder::new("t1", &train, PRIVATE_OBJECTIVE).build())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    h.testtuple(N1, TesttupleBuilder::new("t1", &train, PRIVATE_OBJECTIVE).build())?;

    let err = h
        .testtuple(N1, TesttupleBuilder::new("t2", "missing", OBJECTIVE).build())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    // A test tuple produces no model to evaluate.
    let err = h
        .testtuple(N1, TesttupleBuilder::new("t3", "t1", OBJECTIVE).build())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
    Ok(())
}

#[test]
fn listing_paginates() -> TestResult {
    let mut h = Harness::with_settings(tupledag::engine::EngineSettings {
        page_size: 2,
        ..Default::default()
    });
    for i in 0..5 {
        h.traintuple(N1, TraintupleBuilder::new(&format!("tt-{i}"), ALGO, N1).build())?;
    }

    let mut seen = Vec::new();
    let mut bookmark = String::new();
    let mut pages = 0;
    loop {
        let (page, next) = h
            .run(|e, db| e.list(db, AssetType::Traintuple, &bookmark))?;
        pages += 1;
        assert!(page.len() <= 2);
        seen.extend(page.into_iter().map(|v| v.base.key));
        if next.is_empty() {
            break;
        }
        bookmark = next;
    }
    assert_eq!(pages, 3);
    assert_eq!(seen, vec!["tt-0", "tt-1", "tt-2", "tt-3", "tt-4"]);

    let err = h
        .run(|e, db| e.list(db, AssetType::Traintuple, "garbage"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
    let err = h.run(|e, db| e.list(db, AssetType::Algo, "")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    let todo = h
        .run(|e, db| e.list_by_worker_status(db, AssetType::Traintuple, N1, Status::Todo))?;
    assert_eq!(todo.len(), 5);
    Ok(())
}
