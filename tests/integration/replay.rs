// tests/integration/replay.rs

use std::error::Error;
use std::io::Write;

use serde_json::Value;
use tempfile::NamedTempFile;
use tupledag::config::load_and_validate;
use tupledag::context::RequestContext;
use tupledag::engine::Engine;
use tupledag::errors::ErrorKind;
use tupledag::types::{AssetType, Status};
use tupledag::{apply_step, seed_ledger};
use tupledag_test_utils::builders::checksum;
use tupledag_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn replay_config() -> String {
    format!(
        r#"
[engine]
page_size = 10

[[node]]
id = "node-1"

[[node]]
id = "node-2"

[algo.sgd]
name = "SGD"
owner = "node-1"

[objective.auc]
owner = "node-1"

[[step]]
action = "create_traintuple"
caller = "node-1"
request = {{ key = "tt-1", algo_key = "sgd", worker = "node-1" }}

[[step]]
action = "create_traintuple"
caller = "node-1"
request = {{ key = "tt-2", algo_key = "sgd", worker = "node-2", in_models = ["tt-1"] }}

[[step]]
action = "start"
caller = "node-2"
key = "tt-1"

[[step]]
action = "start"
caller = "node-1"
key = "tt-1"

[[step]]
action = "succeed"
caller = "node-1"
key = "tt-1"
log = "epoch 1"
output = {{ model = {{ key = "m-1", checksum = "{sum}", storage_address = "s3://m-1" }} }}
"#,
        sum = checksum("m-1")
    )
}

#[test]
fn steps_replay_against_seeded_ledger() -> TestResult {
    init_tracing();

    let mut file = NamedTempFile::new()?;
    write!(file, "{}", replay_config())?;
    let cfg = load_and_validate(file.path())?;
    assert_eq!(cfg.engine.page_size, 10);
    assert_eq!(cfg.step.len(), 5);

    let mut ledger = seed_ledger(&cfg)?;
    let engine = Engine::new(cfg.engine);

    let mut rejected = Vec::new();
    for (index, step) in cfg.step.iter().enumerate() {
        let ctx = RequestContext::new(step.caller.as_str());
        if let Err(err) = ledger.transact(|db| apply_step(&engine, db, &ctx, &step.action)) {
            rejected.push((index, err.kind()));
        }
    }
    // node-2 is not the worker of tt-1.
    assert_eq!(rejected, vec![(2, ErrorKind::Forbidden)]);

    ledger
        .transact(|db| {
            let parent = engine.get(db, "tt-1")?;
            assert_eq!(parent.base.status, Status::Done);
            assert_eq!(parent.base.log, "epoch 1");
            let child = engine.get(db, "tt-2")?;
            assert_eq!(child.base.status, Status::Todo);
            let (page, bookmark) = engine.list(db, AssetType::Traintuple, "")?;
            assert_eq!(page.len(), 2);
            assert!(bookmark.is_empty());
            Ok(())
        })?;
    Ok(())
}

#[test]
fn step_output_is_json_view() -> TestResult {
    let mut file = NamedTempFile::new()?;
    write!(file, "{}", replay_config())?;
    let cfg = load_and_validate(file.path())?;
    let mut ledger = seed_ledger(&cfg)?;
    let engine = Engine::new(cfg.engine);

    let first = &cfg.step[0];
    let ctx = RequestContext::new(first.caller.as_str());
    let value = ledger
        .transact(|db| apply_step(&engine, db, &ctx, &first.action))?;
    assert_eq!(value, serde_json::json!({ "key": "tt-1" }));

    let value = ledger
        .transact(|db| {
            let view = engine.get(db, "tt-1")?;
            Ok(serde_json::to_value(view)?)
        })?;
    assert_eq!(value["status"], Value::from("todo"));
    assert_eq!(value["worker"], Value::from("node-1"));
    assert!(value.get("objective_key").is_none());
    Ok(())
}

#[test]
fn bundled_config_replays_to_a_done_plan() -> TestResult {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("Tupledag.toml");
    let cfg = load_and_validate(&path)?;
    let mut ledger = seed_ledger(&cfg)?;
    let engine = Engine::new(cfg.engine);

    let mut rejected = 0;
    for step in &cfg.step {
        let ctx = RequestContext::new(step.caller.as_str());
        if ledger
            .transact(|db| apply_step(&engine, db, &ctx, &step.action))
            .is_err()
        {
            rejected += 1;
        }
    }
    assert_eq!(rejected, 1);

    let plan = ledger
        .transact(|db| engine.get_compute_plan(db, "cp-1"))?;
    assert_eq!(plan.status, tupledag::types::PlanStatus::Done);
    assert_eq!(plan.intermediary_models.len(), 2);
    Ok(())
}
