// src/tuple/input.rs

//! Creation requests, as decoded from the caller's payload.
//!
//! Optional string fields use the empty string for "not supplied", which is
//! how they arrive on the wire.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tuple::base::{KeyChecksum, KeyChecksumAddress};

/// Raw compute-plan membership fields of a request. `rank` is still unparsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanSlot<'a> {
    pub compute_plan_key: &'a str,
    pub rank: &'a str,
}

impl PlanSlot<'_> {
    pub fn is_empty(&self) -> bool {
        self.compute_plan_key.is_empty() && self.rank.is_empty()
    }
}

/// Request for a train tuple. Aggregate tuples take the same fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraintupleRequest {
    pub key: String,
    pub algo_key: String,
    pub worker: String,
    pub in_models: Vec<String>,
    pub tag: String,
    pub metadata: BTreeMap<String, String>,
    pub compute_plan_key: String,
    pub rank: String,
}

pub type AggregatetupleRequest = TraintupleRequest;

impl TraintupleRequest {
    pub fn plan_slot(&self) -> PlanSlot<'_> {
        PlanSlot {
            compute_plan_key: &self.compute_plan_key,
            rank: &self.rank,
        }
    }

    /// Fields a derived key is computed from.
    pub fn content(&self) -> Vec<&str> {
        let mut parts = vec![self.algo_key.as_str(), self.worker.as_str()];
        parts.extend(self.in_models.iter().map(String::as_str));
        parts.extend([
            self.compute_plan_key.as_str(),
            self.rank.as_str(),
            self.tag.as_str(),
        ]);
        parts
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeTraintupleRequest {
    pub key: String,
    pub algo_key: String,
    pub worker: String,
    /// Must be a composite tuple run by the same worker.
    pub in_head_model_key: String,
    pub in_trunk_model_key: String,
    pub tag: String,
    pub metadata: BTreeMap<String, String>,
    pub compute_plan_key: String,
    pub rank: String,
}

impl CompositeTraintupleRequest {
    pub fn plan_slot(&self) -> PlanSlot<'_> {
        PlanSlot {
            compute_plan_key: &self.compute_plan_key,
            rank: &self.rank,
        }
    }

    pub fn in_models(&self) -> Vec<String> {
        [&self.in_head_model_key, &self.in_trunk_model_key]
            .into_iter()
            .filter(|k| !k.is_empty())
            .cloned()
            .collect()
    }

    pub fn content(&self) -> Vec<&str> {
        vec![
            self.algo_key.as_str(),
            self.worker.as_str(),
            self.in_head_model_key.as_str(),
            self.in_trunk_model_key.as_str(),
            self.compute_plan_key.as_str(),
            self.rank.as_str(),
            self.tag.as_str(),
        ]
    }
}

/// Request for an evaluation of the model produced by `traintuple_key`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesttupleRequest {
    pub key: String,
    pub traintuple_key: String,
    pub objective_key: String,
    pub worker: String,
    pub tag: String,
    pub metadata: BTreeMap<String, String>,
}

impl TesttupleRequest {
    pub fn content(&self) -> Vec<&str> {
        vec![
            self.traintuple_key.as_str(),
            self.objective_key.as_str(),
            self.worker.as_str(),
            self.tag.as_str(),
        ]
    }
}

/// What a worker reports when a tuple succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TupleOutput {
    /// Train and aggregate tuples.
    Model(KeyChecksumAddress),
    /// Composite train tuples.
    Composite {
        head: KeyChecksum,
        trunk: KeyChecksumAddress,
    },
    /// Test tuples.
    Perf(f32),
}
