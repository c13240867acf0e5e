// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::engine::EngineSettings;
use crate::permissions::InputPermissions;
use crate::plan::ComputePlanRequest;
use crate::tuple::{
    AggregatetupleRequest, CompositeTraintupleRequest, TesttupleRequest, TraintupleRequest,
    TupleOutput,
};
use crate::types::AssetType;

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [engine]
/// page_size = 100
///
/// [[node]]
/// id = "node-1"
///
/// [algo.sgd]
/// kind = "algo"
/// name = "SGD"
/// owner = "node-1"
///
/// [[step]]
/// action = "create_traintuple"
/// caller = "node-1"
/// request = { key = "tt-1", algo_key = "sgd", worker = "node-1" }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub engine: EngineSettings,

    /// Workers registered before the steps run.
    #[serde(default)]
    pub node: Vec<NodeConfig>,

    /// Algorithms from `[algo.<key>]`.
    #[serde(default)]
    pub algo: BTreeMap<String, AlgoConfig>,

    /// Objectives from `[objective.<key>]`.
    #[serde(default)]
    pub objective: BTreeMap<String, ObjectiveConfig>,

    /// Requests replayed in order, each in its own transaction.
    #[serde(default)]
    pub step: Vec<StepConfig>,
}

/// Validated configuration. Only built through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub engine: EngineSettings,
    pub node: Vec<NodeConfig>,
    pub algo: BTreeMap<String, AlgoConfig>,
    pub objective: BTreeMap<String, ObjectiveConfig>,
    pub step: Vec<StepConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            engine: raw.engine,
            node: raw.node,
            algo: raw.algo,
            objective: raw.objective,
            step: raw.step,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub id: String,
}

/// `[algo.<key>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct AlgoConfig {
    /// `algo`, `compositealgo` or `aggregatealgo`.
    #[serde(default = "default_algo_kind")]
    pub kind: AssetType,
    #[serde(default)]
    pub name: String,
    pub owner: String,
    #[serde(default = "InputPermissions::open")]
    pub permissions: InputPermissions,
}

fn default_algo_kind() -> AssetType {
    AssetType::Algo
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectiveConfig {
    #[serde(default)]
    pub name: String,
    pub owner: String,
    #[serde(default = "InputPermissions::open")]
    pub permissions: InputPermissions,
}

/// `[[step]]` entry: one request, made on behalf of `caller`.
#[derive(Debug, Clone, Deserialize)]
pub struct StepConfig {
    pub caller: String,
    #[serde(flatten)]
    pub action: StepAction,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StepAction {
    CreateTraintuple {
        request: TraintupleRequest,
    },
    CreateAggregatetuple {
        request: AggregatetupleRequest,
    },
    CreateCompositeTraintuple {
        request: CompositeTraintupleRequest,
    },
    CreateTesttuple {
        request: TesttupleRequest,
    },
    CreateComputePlan {
        request: ComputePlanRequest,
    },
    CancelComputePlan {
        key: String,
    },
    Start {
        key: String,
    },
    Fail {
        key: String,
        #[serde(default)]
        log: String,
    },
    Succeed {
        key: String,
        output: TupleOutput,
        #[serde(default)]
        log: String,
    },
}

impl StepAction {
    pub fn name(&self) -> &'static str {
        match self {
            StepAction::CreateTraintuple { .. } => "create_traintuple",
            StepAction::CreateAggregatetuple { .. } => "create_aggregatetuple",
            StepAction::CreateCompositeTraintuple { .. } => "create_composite_traintuple",
            StepAction::CreateTesttuple { .. } => "create_testtuple",
            StepAction::CreateComputePlan { .. } => "create_compute_plan",
            StepAction::CancelComputePlan { .. } => "cancel_compute_plan",
            StepAction::Start { .. } => "start",
            StepAction::Fail { .. } => "fail",
            StepAction::Succeed { .. } => "succeed",
        }
    }
}
