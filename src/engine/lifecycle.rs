// src/engine/lifecycle.rs

use tracing::debug;

use crate::context::RequestContext;
use crate::dag::StateManager;
use crate::engine::{Engine, ensure_worker};
use crate::errors::{Result, TupledagError};
use crate::ledger::LedgerDb;
use crate::ledger::index::MODEL_INDEX;
use crate::plan;
use crate::tuple::{AnyTuple, TupleOutput, TupleView};
use crate::types::Status;

impl Engine {
    /// `todo -> doing`, reported by the tuple's worker.
    pub fn start(
        &self,
        db: &mut LedgerDb<'_>,
        ctx: &RequestContext,
        key: &str,
    ) -> Result<TupleView> {
        let mut tuple = AnyTuple::load(db, key)?;
        ensure_worker(ctx, &tuple)?;

        let mut manager = StateManager::new(db);
        manager.commit(&mut tuple, Status::Doing)?;
        let step = manager.run()?;
        debug!(tuple = key, started = !step.is_empty(), "start applied");
        Ok(tuple.view())
    }

    /// Mark a tuple failed.
    ///
    /// Outside a compute plan the failure reaches every waiting descendant.
    /// Inside one it does not propagate: the plan fails and aborts its
    /// waiting members instead.
    pub fn fail(
        &self,
        db: &mut LedgerDb<'_>,
        ctx: &RequestContext,
        key: &str,
        log: &str,
    ) -> Result<TupleView> {
        let mut tuple = AnyTuple::load(db, key)?;
        ensure_worker(ctx, &tuple)?;
        tuple.base_mut().append_log(log);

        let mut manager = StateManager::new(db);
        manager.commit(&mut tuple, Status::Failed)?;
        if tuple.compute_plan_key().is_none() {
            manager.propagate(key, Status::Failed);
        }
        let step = manager.run()?;
        debug!(tuple = key, changes = step.changes.len(), "failure applied");
        Ok(tuple.view())
    }

    /// Record the worker's output and mark the tuple done; children whose
    /// parents are now all done become `todo`.
    pub fn succeed(
        &self,
        db: &mut LedgerDb<'_>,
        ctx: &RequestContext,
        key: &str,
        output: TupleOutput,
        log: &str,
    ) -> Result<TupleView> {
        let mut tuple = AnyTuple::load(db, key)?;
        ensure_worker(ctx, &tuple)?;

        let models = tuple.record_output(output)?;
        tuple.base_mut().append_log(log);
        for model in &models {
            if !db.get_index_keys(MODEL_INDEX, &[model.as_str()])?.is_empty() {
                return Err(TupledagError::conflict_with_key(
                    "model already produced by another tuple",
                    model.as_str(),
                ));
            }
            db.create_index(MODEL_INDEX, &[model.as_str(), key])?;
            plan::try_add_intermediary_model(
                db,
                tuple.compute_plan_key(),
                tuple.worker(),
                key,
                model,
            )?;
        }

        let mut manager = StateManager::new(db);
        manager.commit(&mut tuple, Status::Done)?;
        manager.propagate(key, Status::Done);
        let step = manager.run()?;
        debug!(
            tuple = key,
            models = models.len(),
            ready = step.moved_to(Status::Todo).len(),
            "success applied"
        );
        Ok(tuple.view())
    }
}
