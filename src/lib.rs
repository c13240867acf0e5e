// src/lib.rs

pub mod cli;
pub mod config;
pub mod context;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod ledger;
pub mod logging;
pub mod permissions;
pub mod plan;
pub mod registry;
pub mod tuple;
pub mod types;

use anyhow::{Context, Result, bail};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::{ConfigFile, StepAction};
use crate::context::RequestContext;
use crate::engine::Engine;
use crate::ledger::{LedgerDb, MemoryLedger};
use crate::types::AssetType;

/// High-level entry point used by `main.rs`.
///
/// Seeds an in-memory ledger with the configured nodes, algos and
/// objectives, then replays every `[[step]]` as its own transaction and
/// prints each result as JSON. A rejected step is logged with its error kind
/// and leaves the ledger untouched; the replay carries on unless
/// `--stop-on-error` is set.
pub fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let mut ledger = seed_ledger(&cfg)?;
    let engine = Engine::new(cfg.engine);

    let mut rejected = 0usize;
    for (index, step) in cfg.step.iter().enumerate() {
        let ctx = RequestContext::new(step.caller.as_str());
        match ledger.transact(|db| apply_step(&engine, db, &ctx, &step.action)) {
            Ok(output) => {
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            Err(err) => {
                rejected += 1;
                warn!(
                    step = index + 1,
                    action = step.action.name(),
                    caller = %step.caller,
                    kind = %err.kind(),
                    error = %err,
                    "step rejected"
                );
                if args.stop_on_error {
                    bail!("step {} ({}) rejected: {err}", index + 1, step.action.name());
                }
            }
        }
    }

    let summary = ledger.transact(|db| summarize(&engine, db))?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    info!(
        steps = cfg.step.len(),
        rejected,
        events = ledger.events().len(),
        "replay finished"
    );
    Ok(())
}

/// Register the configured assets in a fresh ledger.
pub fn seed_ledger(cfg: &ConfigFile) -> Result<MemoryLedger> {
    let mut ledger = MemoryLedger::new();
    ledger.transact(|db| {
        for node in &cfg.node {
            registry::register_node(db, &node.id)?;
        }
        for (key, algo) in &cfg.algo {
            registry::register_algo(
                db,
                key,
                algo.kind,
                &algo.name,
                &algo.owner,
                &algo.permissions,
            )?;
        }
        for (key, objective) in &cfg.objective {
            registry::register_objective(
                db,
                key,
                &objective.name,
                &objective.owner,
                &objective.permissions,
            )?;
        }
        Ok(())
    })?;
    debug!(records = ledger.len(), "ledger seeded");
    Ok(ledger)
}

/// Run one configured request and return what it produced.
pub fn apply_step(
    engine: &Engine,
    db: &mut LedgerDb<'_>,
    ctx: &RequestContext,
    action: &StepAction,
) -> errors::Result<Value> {
    let value = match action {
        StepAction::CreateTraintuple { request } => {
            json!({ "key": engine.create_traintuple(db, ctx, request)? })
        }
        StepAction::CreateAggregatetuple { request } => {
            json!({ "key": engine.create_aggregatetuple(db, ctx, request)? })
        }
        StepAction::CreateCompositeTraintuple { request } => {
            json!({ "key": engine.create_composite_traintuple(db, ctx, request)? })
        }
        StepAction::CreateTesttuple { request } => {
            json!({ "key": engine.create_testtuple(db, ctx, request)? })
        }
        StepAction::CreateComputePlan { request } => {
            serde_json::to_value(engine.create_compute_plan(db, ctx, request)?)?
        }
        StepAction::CancelComputePlan { key } => {
            serde_json::to_value(engine.cancel_compute_plan(db, ctx, key)?)?
        }
        StepAction::Start { key } => serde_json::to_value(engine.start(db, ctx, key)?)?,
        StepAction::Fail { key, log } => serde_json::to_value(engine.fail(db, ctx, key, log)?)?,
        StepAction::Succeed { key, output, log } => {
            serde_json::to_value(engine.succeed(db, ctx, key, output.clone(), log)?)?
        }
    };
    Ok(value)
}

/// Final state of every tuple, grouped by kind.
fn summarize(engine: &Engine, db: &mut LedgerDb<'_>) -> errors::Result<Value> {
    let mut summary = serde_json::Map::new();
    for kind in AssetType::TUPLES {
        let mut views = Vec::new();
        let mut bookmark = String::new();
        loop {
            let (page, next) = engine.list(db, kind, &bookmark)?;
            views.extend(page);
            if next.is_empty() {
                break;
            }
            bookmark = next;
        }
        summary.insert(kind.to_string(), serde_json::to_value(views)?);
    }
    Ok(Value::Object(summary))
}

/// Simple dry-run output: print seeded assets and the steps to replay.
fn print_dry_run(cfg: &ConfigFile) {
    println!("tupledag dry-run");
    println!("  engine.page_size = {}", cfg.engine.page_size);
    println!(
        "  engine.check_compute_plan_availability = {}",
        cfg.engine.check_compute_plan_availability
    );
    println!();

    println!("nodes ({}):", cfg.node.len());
    for node in &cfg.node {
        println!("  - {}", node.id);
    }
    println!("algos ({}):", cfg.algo.len());
    for (key, algo) in &cfg.algo {
        println!("  - {key} ({}, owner {})", algo.kind, algo.owner);
    }
    println!("objectives ({}):", cfg.objective.len());
    for (key, objective) in &cfg.objective {
        println!("  - {key} (owner {})", objective.owner);
    }
    println!();

    println!("steps ({}):", cfg.step.len());
    for (index, step) in cfg.step.iter().enumerate() {
        println!("  {}. {} by {}", index + 1, step.action.name(), step.caller);
    }

    debug!("dry-run complete (nothing replayed)");
}
