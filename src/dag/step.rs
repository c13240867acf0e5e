// src/dag/step.rs

//! Result types for status propagation.

use serde::Serialize;

use crate::types::{AssetType, Status};

/// One committed status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub key: String,
    pub asset_type: AssetType,
    pub from: Status,
    pub to: Status,
}

/// Every status change committed while serving one request, as returned by
/// [`crate::dag::StateManager::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PropagationStep {
    /// Every committed change, the triggering tuple first.
    pub changes: Vec<StatusChange>,
}

impl PropagationStep {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Final status of `key` within this step, if it moved.
    pub fn status_of(&self, key: &str) -> Option<Status> {
        self.changes.iter().rev().find(|c| c.key == key).map(|c| c.to)
    }

    /// Keys that reached `status` in this step, in commit order.
    pub fn moved_to(&self, status: Status) -> Vec<&str> {
        self.changes
            .iter()
            .filter(|c| c.to == status)
            .map(|c| c.key.as_str())
            .collect()
    }
}
