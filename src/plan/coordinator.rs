// src/plan/coordinator.rs

use tracing::{debug, info};

use crate::context::RequestContext;
use crate::errors::{Result, TupledagError};
use crate::ledger::index::PLAN_RANK_INDEX;
use crate::ledger::{LedgerDb, LedgerEvent};
use crate::plan::{ComputePlan, IntermediaryModel, PlanMember, PlanMembership};
use crate::tuple::TupleBase;
use crate::tuple::base::validate_key;
use crate::types::{AssetType, PlanStatus, Status};

/// Register a freshly built tuple as a member of its compute plan.
///
/// Sets the plan fields on `base`, creating the plan implicitly when the
/// tuple has rank 0 and the plan does not exist yet. A member joining a plan
/// that already failed or was canceled starts `Aborted`.
///
/// Returns the members to abort if this registration made the plan fail.
pub fn attach_to_plan(
    db: &mut LedgerDb<'_>,
    membership: Option<&PlanMembership>,
    base: &mut TupleBase,
    enforce_availability: bool,
) -> Result<Vec<String>> {
    let Some(membership) = membership else {
        return Ok(Vec::new());
    };
    let plan_key = membership.compute_plan_key.as_str();
    let rank = membership.rank;
    if plan_key == base.key {
        return Err(TupledagError::conflict_with_key(
            "tuple key is the compute plan key",
            plan_key,
        ));
    }

    if enforce_availability && base.holds_rank_slot() {
        let rank_attr = rank.to_string();
        let taken = db.get_index_keys(
            PLAN_RANK_INDEX,
            &[plan_key, base.worker.as_str(), rank_attr.as_str()],
        )?;
        if !taken.is_empty() {
            return Err(TupledagError::conflict(format!(
                "compute plan {plan_key} already has a tuple on worker {} with rank {rank}",
                base.worker
            )));
        }
    }

    let mut plan = load_or_create(db, plan_key, rank, &base.creator)?;
    if plan.is_closed() {
        debug!(
            tuple = %base.key,
            compute_plan = plan_key,
            plan_status = %plan.status,
            "new member of a closed compute plan starts aborted"
        );
        base.status = Status::Aborted;
    }

    base.compute_plan_key = Some(plan_key.to_string());
    base.rank = Some(rank);
    plan.members.push(PlanMember {
        key: base.key.clone(),
        asset_type: base.asset_type,
        worker: base.worker.clone(),
        rank,
        status: base.status,
    });

    let previous = plan.refresh_status();
    plan.save(db)?;
    finish_plan_update(db, &plan, previous)
}

/// Record a member's committed transition and recompute the plan status.
///
/// Returns the waiting members to abort when the plan has just failed.
pub fn update_plan_state(
    db: &mut LedgerDb<'_>,
    plan_key: &str,
    tuple_key: &str,
    status: Status,
) -> Result<Vec<String>> {
    let mut plan = ComputePlan::load(db, plan_key)
        .map_err(|e| e.into_internal(format!("compute plan {plan_key} of {tuple_key}")))?;
    let member = plan.member_mut(tuple_key).ok_or_else(|| {
        TupledagError::internal(format!(
            "tuple {tuple_key} is not a member of compute plan {plan_key}"
        ))
    })?;
    member.status = status;

    let previous = plan.refresh_status();
    plan.save(db)?;
    finish_plan_update(db, &plan, previous)
}

/// Keep track of a produced model when its plan cleans intermediary models.
pub fn try_add_intermediary_model(
    db: &mut LedgerDb<'_>,
    plan_key: Option<&str>,
    worker: &str,
    tuple_key: &str,
    model_key: &str,
) -> Result<()> {
    let Some(plan_key) = plan_key else {
        return Ok(());
    };
    let mut plan = ComputePlan::load(db, plan_key)
        .map_err(|e| e.into_internal(format!("compute plan {plan_key} of {tuple_key}")))?;
    if !plan.clean_models {
        return Ok(());
    }
    plan.intermediary_models.push(IntermediaryModel {
        worker: worker.to_string(),
        tuple_key: tuple_key.to_string(),
        model_key: model_key.to_string(),
    });
    debug!(
        compute_plan = plan_key,
        tuple = tuple_key,
        model = model_key,
        "intermediary model recorded"
    );
    plan.save(db)
}

/// Mark a plan canceled. Returns the plan and the waiting members the caller
/// must abort.
pub fn cancel_compute_plan(
    db: &mut LedgerDb<'_>,
    ctx: &RequestContext,
    key: &str,
) -> Result<(ComputePlan, Vec<String>)> {
    let mut plan = ComputePlan::load(db, key)?;
    if plan.creator != ctx.creator() {
        return Err(TupledagError::forbidden(format!(
            "only {} can cancel compute plan {key}",
            plan.creator
        )));
    }
    if matches!(
        plan.status,
        PlanStatus::Done | PlanStatus::Failed | PlanStatus::Canceled
    ) {
        return Err(TupledagError::bad_request(format!(
            "compute plan {key} is already {}",
            plan.status
        )));
    }

    plan.status = PlanStatus::Canceled;
    plan.save(db)?;
    db.emit_event(LedgerEvent::new(AssetType::ComputePlan, key, plan.status))?;
    info!(compute_plan = key, "compute plan canceled");

    let aborts = plan.waiting_members();
    Ok((plan, aborts))
}

fn load_or_create(
    db: &mut LedgerDb<'_>,
    plan_key: &str,
    rank: u32,
    creator: &str,
) -> Result<ComputePlan> {
    if db.key_exists(plan_key)? {
        return ComputePlan::load(db, plan_key)
            .map_err(|e| e.into_bad_request(format!("invalid compute plan {plan_key}")));
    }
    if rank != 0 {
        return Err(TupledagError::bad_request(format!(
            "compute plan {plan_key} does not exist; only a rank 0 tuple can create it"
        )));
    }
    validate_key(plan_key, "compute plan key")?;

    let plan = ComputePlan::new(plan_key, creator);
    db.emit_event(LedgerEvent::new(AssetType::ComputePlan, plan_key, plan.status))?;
    info!(compute_plan = plan_key, creator, "compute plan created implicitly");
    Ok(plan)
}

fn finish_plan_update(
    db: &mut LedgerDb<'_>,
    plan: &ComputePlan,
    previous: Option<PlanStatus>,
) -> Result<Vec<String>> {
    let Some(previous) = previous else {
        return Ok(Vec::new());
    };
    info!(
        compute_plan = %plan.key,
        from = %previous,
        to = %plan.status,
        "compute plan status updated"
    );
    db.emit_event(LedgerEvent::new(AssetType::ComputePlan, &plan.key, plan.status))?;

    if plan.status == PlanStatus::Failed {
        let aborts = plan.waiting_members();
        debug!(compute_plan = %plan.key, count = aborts.len(), "aborting waiting members");
        return Ok(aborts);
    }
    Ok(Vec::new())
}
