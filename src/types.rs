use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a tuple.
///
/// - `Waiting`: at least one parent has not reached `Done` yet.
/// - `Todo`: every parent is `Done`; the worker may start it.
/// - `Doing`: the worker started it.
/// - `Done`: finished with its output recorded.
/// - `Failed`: the worker reported a failure, or a parent failed.
/// - `Aborted`: swept while still waiting because its compute plan failed or
///   was canceled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Waiting,
    Todo,
    Doing,
    Done,
    Failed,
    Aborted,
}

impl Status {
    pub const ALL: [Status; 6] = [
        Status::Waiting,
        Status::Todo,
        Status::Doing,
        Status::Done,
        Status::Failed,
        Status::Aborted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Waiting => "waiting",
            Status::Todo => "todo",
            Status::Doing => "doing",
            Status::Done => "done",
            Status::Failed => "failed",
            Status::Aborted => "aborted",
        }
    }

    /// No outgoing edge exists from a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Done | Status::Failed | Status::Aborted)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "waiting" => Ok(Status::Waiting),
            "todo" => Ok(Status::Todo),
            "doing" => Ok(Status::Doing),
            "done" => Ok(Status::Done),
            "failed" => Ok(Status::Failed),
            "aborted" => Ok(Status::Aborted),
            other => Err(format!("invalid status: {other}")),
        }
    }
}

/// Aggregated status of a compute plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Waiting,
    Todo,
    Doing,
    Done,
    Failed,
    Canceled,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Waiting => "waiting",
            PlanStatus::Todo => "todo",
            PlanStatus::Doing => "doing",
            PlanStatus::Done => "done",
            PlanStatus::Failed => "failed",
            PlanStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discriminant stored in every ledger record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Traintuple,
    CompositeTraintuple,
    Aggregatetuple,
    Testtuple,
    ComputePlan,
    Node,
    Algo,
    CompositeAlgo,
    AggregateAlgo,
    Objective,
}

impl AssetType {
    pub const TUPLES: [AssetType; 4] = [
        AssetType::Traintuple,
        AssetType::CompositeTraintuple,
        AssetType::Aggregatetuple,
        AssetType::Testtuple,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Traintuple => "traintuple",
            AssetType::CompositeTraintuple => "compositetraintuple",
            AssetType::Aggregatetuple => "aggregatetuple",
            AssetType::Testtuple => "testtuple",
            AssetType::ComputePlan => "computeplan",
            AssetType::Node => "node",
            AssetType::Algo => "algo",
            AssetType::CompositeAlgo => "compositealgo",
            AssetType::AggregateAlgo => "aggregatealgo",
            AssetType::Objective => "objective",
        }
    }

    pub fn is_tuple(&self) -> bool {
        Self::TUPLES.contains(self)
    }

    /// Algorithm kind a tuple of this type must reference.
    pub fn algo_type(&self) -> Option<AssetType> {
        match self {
            AssetType::Traintuple => Some(AssetType::Algo),
            AssetType::CompositeTraintuple => Some(AssetType::CompositeAlgo),
            AssetType::Aggregatetuple => Some(AssetType::AggregateAlgo),
            _ => None,
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "traintuple" => Ok(AssetType::Traintuple),
            "compositetraintuple" => Ok(AssetType::CompositeTraintuple),
            "aggregatetuple" => Ok(AssetType::Aggregatetuple),
            "testtuple" => Ok(AssetType::Testtuple),
            "computeplan" => Ok(AssetType::ComputePlan),
            "node" => Ok(AssetType::Node),
            "algo" => Ok(AssetType::Algo),
            "compositealgo" => Ok(AssetType::CompositeAlgo),
            "aggregatealgo" => Ok(AssetType::AggregateAlgo),
            "objective" => Ok(AssetType::Objective),
            other => Err(format!("invalid asset type: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_what_it_prints() {
        for status in Status::ALL {
            assert_eq!(status.as_str().parse::<Status>(), Ok(status));
        }
        assert!("running".parse::<Status>().is_err());
    }

    #[test]
    fn serde_names_match_display() {
        let json = serde_json::to_string(&AssetType::CompositeTraintuple).unwrap();
        assert_eq!(json, "\"compositetraintuple\"");
        let json = serde_json::to_string(&PlanStatus::Canceled).unwrap();
        assert_eq!(json, "\"canceled\"");
    }
}
