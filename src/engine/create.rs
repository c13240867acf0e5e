// src/engine/create.rs

use tracing::{debug, info};

use crate::context::RequestContext;
use crate::dag::StateManager;
use crate::engine::Engine;
use crate::errors::{Result, TupledagError};
use crate::ledger::{LedgerDb, LedgerEvent};
use crate::plan::bulk::PlanEntry;
use crate::plan::{self, ComputePlan, ComputePlanRequest, ComputePlanView, PlanMembership};
use crate::tuple::{
    Aggregatetuple, AggregatetupleRequest, AnyTuple, CompositeTraintuple,
    CompositeTraintupleRequest, Testtuple, TesttupleRequest, Traintuple, TraintupleRequest,
};
use crate::types::AssetType;

impl Engine {
    pub fn create_traintuple(
        &self,
        db: &mut LedgerDb<'_>,
        ctx: &RequestContext,
        req: &TraintupleRequest,
    ) -> Result<String> {
        self.create_traintuple_with(db, ctx, req, self.settings.check_compute_plan_availability)
    }

    pub fn create_aggregatetuple(
        &self,
        db: &mut LedgerDb<'_>,
        ctx: &RequestContext,
        req: &AggregatetupleRequest,
    ) -> Result<String> {
        self.create_aggregatetuple_with(
            db,
            ctx,
            req,
            self.settings.check_compute_plan_availability,
        )
    }

    pub fn create_composite_traintuple(
        &self,
        db: &mut LedgerDb<'_>,
        ctx: &RequestContext,
        req: &CompositeTraintupleRequest,
    ) -> Result<String> {
        self.create_composite_traintuple_with(
            db,
            ctx,
            req,
            self.settings.check_compute_plan_availability,
        )
    }

    /// Create a test tuple. Its compute plan membership, if any, comes from
    /// the tested tuple; it never holds a rank slot.
    pub fn create_testtuple(
        &self,
        db: &mut LedgerDb<'_>,
        ctx: &RequestContext,
        req: &TesttupleRequest,
    ) -> Result<String> {
        let tuple = Testtuple::from_request(db, ctx, req)?;
        let membership = tuple
            .base
            .compute_plan_key
            .clone()
            .zip(tuple.base.rank)
            .map(|(key, rank)| PlanMembership::new(key, rank));
        finish_creation(db, AnyTuple::Test(tuple), membership.as_ref(), false)
    }

    /// Validate a whole plan, then create it and every entry parent-first.
    pub fn create_compute_plan(
        &self,
        db: &mut LedgerDb<'_>,
        ctx: &RequestContext,
        req: &ComputePlanRequest,
    ) -> Result<ComputePlanView> {
        let validated = req.validate(db)?;

        let mut compute_plan = ComputePlan::new(validated.key.as_str(), ctx.creator());
        compute_plan.tag = validated.tag;
        compute_plan.metadata = validated.metadata;
        compute_plan.clean_models = validated.clean_models;
        db.add(&compute_plan.key, &compute_plan)?;
        db.emit_event(LedgerEvent::new(
            AssetType::ComputePlan,
            compute_plan.key.as_str(),
            compute_plan.status,
        ))?;
        info!(
            compute_plan = %compute_plan.key,
            creator = ctx.creator(),
            entries = validated.entries.len(),
            "compute plan submitted"
        );

        for entry in &validated.entries {
            let key = match entry {
                PlanEntry::Train(r) => self.create_traintuple_with(db, ctx, r, false)?,
                PlanEntry::Aggregate(r) => self.create_aggregatetuple_with(db, ctx, r, false)?,
                PlanEntry::Composite(r) => {
                    self.create_composite_traintuple_with(db, ctx, r, false)?
                }
                PlanEntry::Test(r) => self.create_testtuple(db, ctx, r)?,
            };
            debug!(compute_plan = %compute_plan.key, tuple = %key, "plan entry created");
        }

        Ok(ComputePlan::load(db, &compute_plan.key)?.view())
    }

    /// Cancel a plan on behalf of its creator; waiting members are aborted.
    pub fn cancel_compute_plan(
        &self,
        db: &mut LedgerDb<'_>,
        ctx: &RequestContext,
        key: &str,
    ) -> Result<ComputePlanView> {
        let (_, aborts) = plan::cancel_compute_plan(db, ctx, key)?;
        let mut manager = StateManager::new(db);
        manager.abort_all(aborts);
        let step = manager.run()?;
        debug!(compute_plan = key, aborted = step.changes.len(), "cancellation applied");
        Ok(ComputePlan::load(db, key)?.view())
    }

    fn create_traintuple_with(
        &self,
        db: &mut LedgerDb<'_>,
        ctx: &RequestContext,
        req: &TraintupleRequest,
        enforce_availability: bool,
    ) -> Result<String> {
        let membership = PlanMembership::parse(req.plan_slot())?;
        let tuple = Traintuple::from_request(db, ctx, req)?;
        finish_creation(
            db,
            AnyTuple::Train(tuple),
            membership.as_ref(),
            enforce_availability,
        )
    }

    fn create_aggregatetuple_with(
        &self,
        db: &mut LedgerDb<'_>,
        ctx: &RequestContext,
        req: &AggregatetupleRequest,
        enforce_availability: bool,
    ) -> Result<String> {
        let membership = PlanMembership::parse(req.plan_slot())?;
        let tuple = Aggregatetuple::from_request(db, ctx, req)?;
        finish_creation(
            db,
            AnyTuple::Aggregate(tuple),
            membership.as_ref(),
            enforce_availability,
        )
    }

    fn create_composite_traintuple_with(
        &self,
        db: &mut LedgerDb<'_>,
        ctx: &RequestContext,
        req: &CompositeTraintupleRequest,
        enforce_availability: bool,
    ) -> Result<String> {
        let membership = PlanMembership::parse(req.plan_slot())?;
        let tuple = CompositeTraintuple::from_request(db, ctx, req)?;
        finish_creation(
            db,
            AnyTuple::Composite(tuple),
            membership.as_ref(),
            enforce_availability,
        )
    }
}

/// Persist a built tuple: existence check, plan registration, record and
/// indexes, creation event, then any abort sweep the registration caused.
fn finish_creation(
    db: &mut LedgerDb<'_>,
    mut tuple: AnyTuple,
    membership: Option<&PlanMembership>,
    enforce_availability: bool,
) -> Result<String> {
    let key = tuple.key().to_string();
    if db.key_exists(&key)? {
        return Err(TupledagError::conflict_with_key("tuple already exists", key));
    }

    let aborts = plan::attach_to_plan(db, membership, tuple.base_mut(), enforce_availability)?;
    tuple.save(db)?;
    db.emit_event(LedgerEvent::new(
        tuple.asset_type(),
        key.as_str(),
        tuple.status(),
    ))?;
    info!(
        tuple = %key,
        kind = %tuple.asset_type(),
        worker = tuple.worker(),
        status = %tuple.status(),
        compute_plan = tuple.compute_plan_key().unwrap_or_default(),
        "tuple created"
    );

    if !aborts.is_empty() {
        let mut manager = StateManager::new(db);
        manager.abort_all(aborts);
        manager.run()?;
    }
    Ok(key)
}
