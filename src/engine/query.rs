// src/engine/query.rs

use crate::engine::Engine;
use crate::errors::{Result, TupledagError};
use crate::ledger::LedgerDb;
use crate::ledger::index::{MODEL_INDEX, PLAN_TUPLE_INDEX, algo_index, worker_status_index};
use crate::plan::{ComputePlan, ComputePlanView};
use crate::tuple::{AnyTuple, TupleView};
use crate::types::{AssetType, Status};

impl Engine {
    pub fn get(&self, db: &LedgerDb<'_>, key: &str) -> Result<TupleView> {
        Ok(AnyTuple::load(db, key)?.view())
    }

    /// One page of tuples of `kind`. Pass the returned bookmark to get the
    /// next page; it is empty once every tuple has been listed.
    pub fn list(
        &self,
        db: &LedgerDb<'_>,
        kind: AssetType,
        bookmark: &str,
    ) -> Result<(Vec<TupleView>, String)> {
        ensure_tuple_kind(kind)?;
        let (keys, next) = db.get_index_keys_with_pagination(
            &algo_index(kind),
            &[],
            self.settings.page_size,
            bookmark,
        )?;
        Ok((load_views(db, &keys)?, next))
    }

    pub fn list_by_worker_status(
        &self,
        db: &LedgerDb<'_>,
        kind: AssetType,
        worker: &str,
        status: Status,
    ) -> Result<Vec<TupleView>> {
        ensure_tuple_kind(kind)?;
        let keys = db.get_index_keys(&worker_status_index(kind), &[worker, status.as_str()])?;
        load_views(db, &keys)
    }

    /// Every member of a compute plan, tests included.
    pub fn list_by_compute_plan(
        &self,
        db: &LedgerDb<'_>,
        compute_plan_key: &str,
    ) -> Result<Vec<TupleView>> {
        ComputePlan::load(db, compute_plan_key)?;
        let keys = db.get_index_keys(PLAN_TUPLE_INDEX, &[compute_plan_key])?;
        load_views(db, &keys)
    }

    pub fn get_compute_plan(&self, db: &LedgerDb<'_>, key: &str) -> Result<ComputePlanView> {
        Ok(ComputePlan::load(db, key)?.view())
    }

    /// The tuple that produced `model_key`.
    pub fn get_model_tuple(&self, db: &LedgerDb<'_>, model_key: &str) -> Result<TupleView> {
        let keys = db.get_index_keys(MODEL_INDEX, &[model_key])?;
        let tuple_key = keys
            .first()
            .ok_or_else(|| TupledagError::not_found(format!("no tuple produced model {model_key}")))?;
        let tuple = AnyTuple::load(db, tuple_key)
            .map_err(|e| e.into_internal(format!("producer of model {model_key}")))?;
        Ok(tuple.view())
    }
}

fn ensure_tuple_kind(kind: AssetType) -> Result<()> {
    if kind.is_tuple() {
        Ok(())
    } else {
        Err(TupledagError::bad_request(format!("{kind} is not a tuple type")))
    }
}

/// Keys come from indexes, so a missing record is a ledger inconsistency.
fn load_views(db: &LedgerDb<'_>, keys: &[String]) -> Result<Vec<TupleView>> {
    keys.iter()
        .map(|key| {
            AnyTuple::load(db, key)
                .map(|t| t.view())
                .map_err(|e| e.into_internal(format!("indexed tuple {key}")))
        })
        .collect()
}
