// src/plan/bulk.rs

//! Whole-plan submissions.
//!
//! A submission is checked as a unit before anything is written: keys,
//! ranks, worker slots, parent references and acyclicity. Entries are then
//! created parent-first by the engine.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dag::graph::PlanGraph;
use crate::errors::{Result, TupledagError};
use crate::ledger::LedgerDb;
use crate::plan::PlanMembership;
use crate::tuple::base::{key_or_derived, validate_key};
use crate::tuple::{
    AggregatetupleRequest, CompositeTraintupleRequest, PlanSlot, TesttupleRequest,
    TraintupleRequest,
};
use crate::types::AssetType;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputePlanRequest {
    pub key: String,
    pub tag: String,
    pub metadata: BTreeMap<String, String>,
    pub clean_models: bool,
    pub traintuples: Vec<TraintupleRequest>,
    pub aggregatetuples: Vec<AggregatetupleRequest>,
    pub composite_traintuples: Vec<CompositeTraintupleRequest>,
    pub testtuples: Vec<TesttupleRequest>,
}

/// One entry of a submission, with its plan fields filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanEntry {
    Train(TraintupleRequest),
    Aggregate(AggregatetupleRequest),
    Composite(CompositeTraintupleRequest),
    Test(TesttupleRequest),
}

impl PlanEntry {
    pub fn key(&self) -> &str {
        match self {
            PlanEntry::Train(r) | PlanEntry::Aggregate(r) => &r.key,
            PlanEntry::Composite(r) => &r.key,
            PlanEntry::Test(r) => &r.key,
        }
    }

    pub fn asset_type(&self) -> AssetType {
        match self {
            PlanEntry::Train(_) => AssetType::Traintuple,
            PlanEntry::Aggregate(_) => AssetType::Aggregatetuple,
            PlanEntry::Composite(_) => AssetType::CompositeTraintuple,
            PlanEntry::Test(_) => AssetType::Testtuple,
        }
    }

    fn parents(&self) -> Vec<String> {
        match self {
            PlanEntry::Train(r) | PlanEntry::Aggregate(r) => r.in_models.clone(),
            PlanEntry::Composite(r) => r.in_models(),
            PlanEntry::Test(r) => vec![r.traintuple_key.clone()],
        }
    }

    /// Worker and raw plan fields of entries that hold a rank slot.
    fn slot(&self) -> Option<(&str, &str, &str)> {
        match self {
            PlanEntry::Train(r) | PlanEntry::Aggregate(r) => Some((
                r.worker.as_str(),
                r.compute_plan_key.as_str(),
                r.rank.as_str(),
            )),
            PlanEntry::Composite(r) => Some((
                r.worker.as_str(),
                r.compute_plan_key.as_str(),
                r.rank.as_str(),
            )),
            PlanEntry::Test(_) => None,
        }
    }

    fn set_compute_plan_key(&mut self, plan_key: &str) {
        match self {
            PlanEntry::Train(r) | PlanEntry::Aggregate(r) => {
                r.compute_plan_key = plan_key.to_string()
            }
            PlanEntry::Composite(r) => r.compute_plan_key = plan_key.to_string(),
            PlanEntry::Test(_) => {}
        }
    }
}

/// A submission that passed validation, entries in creation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPlan {
    pub key: String,
    pub tag: String,
    pub metadata: BTreeMap<String, String>,
    pub clean_models: bool,
    pub entries: Vec<PlanEntry>,
}

impl ComputePlanRequest {
    fn entries(&self) -> Vec<PlanEntry> {
        let mut entries = Vec::new();
        entries.extend(self.traintuples.iter().cloned().map(PlanEntry::Train));
        entries.extend(self.aggregatetuples.iter().cloned().map(PlanEntry::Aggregate));
        entries.extend(
            self.composite_traintuples
                .iter()
                .cloned()
                .map(PlanEntry::Composite),
        );
        entries.extend(self.testtuples.iter().cloned().map(PlanEntry::Test));
        entries
    }

    /// Check the submission against itself and the ledger.
    pub fn validate(&self, db: &LedgerDb<'_>) -> Result<ValidatedPlan> {
        let entries = self.entries();
        let entry_keys: Vec<&str> = entries.iter().map(PlanEntry::key).collect();
        let key = key_or_derived(&self.key, AssetType::ComputePlan, &entry_keys)?;
        if db.key_exists(&key)? {
            return Err(TupledagError::conflict_with_key(
                "compute plan already exists",
                key,
            ));
        }
        if entries.is_empty() {
            return Err(TupledagError::bad_request(format!(
                "compute plan {key} has no tuples"
            )));
        }

        check_entry_keys(db, &key, &entries)?;
        check_rank_slots(&key, &entries)?;

        let by_key: HashMap<&str, &PlanEntry> = entries.iter().map(|e| (e.key(), e)).collect();
        let parents: Vec<(String, AssetType, Vec<String>)> = entries
            .iter()
            .map(|e| (e.key().to_string(), e.asset_type(), e.parents()))
            .collect();

        let mut graph = PlanGraph::new();
        for (entry, _, _) in &parents {
            graph.add_entry(entry.as_str());
        }
        for (entry, kind, entry_parents) in &parents {
            for parent in entry_parents {
                if by_key.contains_key(parent.as_str()) {
                    graph.add_dependency(parent.as_str(), entry.as_str());
                } else if *kind == AssetType::Testtuple {
                    // Plan membership of a test tuple comes from what it evaluates.
                    return Err(TupledagError::bad_request(format!(
                        "testtuple {entry} evaluates {parent}, which is not part of compute plan {key}"
                    )));
                } else {
                    check_existing_parent(db, entry, parent)?;
                }
            }
        }
        let order = graph.creation_order()?;

        let mut ordered = Vec::with_capacity(order.len());
        for entry_key in order {
            if let Some(entry) = by_key.get(entry_key) {
                let mut entry = (*entry).clone();
                entry.set_compute_plan_key(&key);
                ordered.push(entry);
            }
        }
        debug!(compute_plan = %key, entries = ordered.len(), "compute plan submission validated");

        Ok(ValidatedPlan {
            key,
            tag: self.tag.clone(),
            metadata: self.metadata.clone(),
            clean_models: self.clean_models,
            entries: ordered,
        })
    }
}

fn check_entry_keys(db: &LedgerDb<'_>, plan_key: &str, entries: &[PlanEntry]) -> Result<()> {
    let mut seen = HashSet::new();
    for entry in entries {
        let key = entry.key();
        if key.is_empty() {
            return Err(TupledagError::bad_request(format!(
                "every {} of a compute plan needs a key",
                entry.asset_type()
            )));
        }
        validate_key(key, "tuple key")?;
        if key == plan_key {
            return Err(TupledagError::conflict_with_key(
                "tuple key is the compute plan key",
                key,
            ));
        }
        if !seen.insert(key) {
            return Err(TupledagError::bad_request(format!(
                "tuple key {key} appears twice in the compute plan"
            )));
        }
        if db.key_exists(key)? {
            return Err(TupledagError::conflict_with_key("asset already exists", key));
        }
    }
    Ok(())
}

fn check_rank_slots(plan_key: &str, entries: &[PlanEntry]) -> Result<()> {
    let mut slots: HashMap<(String, u32), &str> = HashMap::new();
    for entry in entries {
        let Some((worker, entry_plan, rank)) = entry.slot() else {
            continue;
        };
        if !entry_plan.is_empty() && entry_plan != plan_key {
            return Err(TupledagError::bad_request(format!(
                "tuple {} names compute plan {entry_plan}, expected {plan_key}",
                entry.key()
            )));
        }
        if rank.is_empty() {
            return Err(TupledagError::bad_request(format!(
                "tuple {} of compute plan {plan_key} has no rank",
                entry.key()
            )));
        }
        let rank = PlanMembership::parse(PlanSlot {
            compute_plan_key: plan_key,
            rank,
        })?
        .map_or(0, |m| m.rank);
        if let Some(other) = slots.insert((worker.to_string(), rank), entry.key()) {
            return Err(TupledagError::conflict(format!(
                "tuples {other} and {} share worker {worker} and rank {rank} in compute plan {plan_key}",
                entry.key()
            )));
        }
    }
    Ok(())
}

fn check_existing_parent(db: &LedgerDb<'_>, entry: &str, parent: &str) -> Result<()> {
    let known = db.key_exists(parent)? && db.get_asset_type(parent)?.is_tuple();
    if known {
        Ok(())
    } else {
        Err(TupledagError::bad_request(format!(
            "tuple {entry} references unknown parent {parent}"
        )))
    }
}
