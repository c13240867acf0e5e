// src/plan/mod.rs

//! Compute plans: ordered multi-worker pipelines of tuples.
//!
//! - [`coordinator`] attaches tuples to plans and keeps the aggregate status
//!   in step with member transitions.
//! - [`bulk`] validates whole-plan submissions before anything is written.

pub mod bulk;
pub mod coordinator;

pub use bulk::{ComputePlanRequest, ValidatedPlan};
pub use coordinator::{
    attach_to_plan, cancel_compute_plan, try_add_intermediary_model, update_plan_state,
};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, TupledagError};
use crate::ledger::LedgerDb;
use crate::tuple::PlanSlot;
use crate::types::{AssetType, PlanStatus, Status};

/// Parsed (plan, rank) membership of a tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanMembership {
    pub compute_plan_key: String,
    pub rank: u32,
}

impl PlanMembership {
    pub fn new(compute_plan_key: impl Into<String>, rank: u32) -> Self {
        Self {
            compute_plan_key: compute_plan_key.into(),
            rank,
        }
    }

    /// Parse the raw plan fields of a request. Both or neither must be set.
    pub fn parse(slot: PlanSlot<'_>) -> Result<Option<Self>> {
        if slot.is_empty() {
            return Ok(None);
        }
        if slot.compute_plan_key.is_empty() {
            return Err(TupledagError::bad_request(
                "rank is set but compute plan key is empty",
            ));
        }
        if slot.rank.is_empty() {
            return Err(TupledagError::bad_request(
                "compute plan key is set but rank is empty",
            ));
        }
        let rank = slot.rank.trim().parse::<u32>().map_err(|e| {
            TupledagError::bad_request(format!("invalid rank {:?}: {e}", slot.rank))
        })?;
        Ok(Some(Self::new(slot.compute_plan_key, rank)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanMember {
    pub key: String,
    pub asset_type: AssetType,
    pub worker: String,
    pub rank: u32,
    pub status: Status,
}

/// Model kept on a worker as a checkpoint of a plan that cleans its models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntermediaryModel {
    pub worker: String,
    pub tuple_key: String,
    pub model_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputePlan {
    pub key: String,
    pub asset_type: AssetType,
    pub creator: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub clean_models: bool,
    pub status: PlanStatus,
    #[serde(default)]
    pub members: Vec<PlanMember>,
    #[serde(default)]
    pub intermediary_models: Vec<IntermediaryModel>,
}

impl ComputePlan {
    pub fn new(key: impl Into<String>, creator: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            asset_type: AssetType::ComputePlan,
            creator: creator.into(),
            tag: String::new(),
            metadata: BTreeMap::new(),
            clean_models: false,
            status: PlanStatus::Waiting,
            members: Vec::new(),
            intermediary_models: Vec::new(),
        }
    }

    pub fn load(db: &LedgerDb<'_>, key: &str) -> Result<Self> {
        db.get_asset(key, AssetType::ComputePlan)
    }

    pub fn save(&self, db: &mut LedgerDb<'_>) -> Result<()> {
        db.put(&self.key, self)
    }

    pub fn member_mut(&mut self, key: &str) -> Option<&mut PlanMember> {
        self.members.iter_mut().find(|m| m.key == key)
    }

    /// Status derived from the members. `Canceled` is sticky.
    pub fn aggregate_status(&self) -> PlanStatus {
        if self.status == PlanStatus::Canceled {
            return PlanStatus::Canceled;
        }
        aggregate_status(self.members.iter().map(|m| m.status))
    }

    /// Recompute the aggregate status; returns the previous one when it
    /// changed.
    pub fn refresh_status(&mut self) -> Option<PlanStatus> {
        let next = self.aggregate_status();
        if next == self.status {
            return None;
        }
        Some(std::mem::replace(&mut self.status, next))
    }

    /// Keys of members still waiting on their parents.
    pub fn waiting_members(&self) -> Vec<String> {
        self.members
            .iter()
            .filter(|m| m.status == Status::Waiting)
            .map(|m| m.key.clone())
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.status, PlanStatus::Failed | PlanStatus::Canceled)
    }

    pub fn view(&self) -> ComputePlanView {
        let count = |status: Status| self.members.iter().filter(|m| m.status == status).count();
        ComputePlanView {
            key: self.key.clone(),
            creator: self.creator.clone(),
            tag: self.tag.clone(),
            metadata: self.metadata.clone(),
            clean_models: self.clean_models,
            status: self.status,
            tuple_count: self.members.len(),
            done_count: count(Status::Done),
            member_keys: self.members.iter().map(|m| m.key.clone()).collect(),
            intermediary_models: self.intermediary_models.clone(),
        }
    }
}

/// Aggregate of member statuses, without the sticky `Canceled` rule.
pub fn aggregate_status(statuses: impl IntoIterator<Item = Status>) -> PlanStatus {
    let statuses: Vec<Status> = statuses.into_iter().collect();
    let any = |s: Status| statuses.contains(&s);

    if any(Status::Failed) {
        PlanStatus::Failed
    } else if !statuses.is_empty() && statuses.iter().all(|s| *s == Status::Done) {
        PlanStatus::Done
    } else if any(Status::Doing) || any(Status::Done) {
        PlanStatus::Doing
    } else if any(Status::Todo) {
        PlanStatus::Todo
    } else {
        PlanStatus::Waiting
    }
}

/// Read projection of a compute plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComputePlanView {
    pub key: String,
    pub creator: String,
    pub tag: String,
    pub metadata: BTreeMap<String, String>,
    pub clean_models: bool,
    pub status: PlanStatus,
    pub tuple_count: usize,
    pub done_count: usize,
    pub member_keys: Vec<String>,
    pub intermediary_models: Vec<IntermediaryModel>,
}
