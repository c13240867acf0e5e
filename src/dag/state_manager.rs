// src/dag/state_manager.rs

//! Status transitions of tuples and their propagation to dependents.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::dag::resolver::is_ready;
use crate::dag::step::{PropagationStep, StatusChange};
use crate::errors::{Result, TupledagError};
use crate::ledger::index::{IN_MODEL_INDEX, worker_status_index};
use crate::ledger::{LedgerDb, LedgerEvent};
use crate::plan;
use crate::registry;
use crate::tuple::AnyTuple;
use crate::types::Status;

/// Whether `from -> to` is an edge of the lifecycle.
pub fn validate_transition(from: Status, to: Status) -> Result<()> {
    use Status::*;
    let legal = matches!(
        (from, to),
        (Waiting, Todo | Failed | Aborted) | (Todo, Doing | Failed) | (Doing, Done | Failed)
    );
    if legal {
        Ok(())
    } else {
        Err(TupledagError::internal(format!(
            "cannot change status from {from} to {to}"
        )))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Work {
    /// Re-evaluate the waiting children of `parent` after it reached `status`.
    Propagate { parent: String, status: Status },
    /// Abort a plan member, if it is still waiting.
    Abort { key: String },
}

/// Commits status changes for one request and drives propagation through an
/// explicit worklist.
pub struct StateManager<'a, 'l> {
    db: &'a mut LedgerDb<'l>,
    worklist: Vec<Work>,
    visited: HashSet<String>,
    step: PropagationStep,
}

impl<'a, 'l> StateManager<'a, 'l> {
    pub fn new(db: &'a mut LedgerDb<'l>) -> Self {
        Self {
            db,
            worklist: Vec::new(),
            visited: HashSet::new(),
            step: PropagationStep::default(),
        }
    }

    /// Validate and persist a status change of `tuple`.
    ///
    /// Setting the current status again is a no-op, and so is aborting a
    /// tuple that is no longer waiting. Returns whether anything was written.
    pub fn commit(&mut self, tuple: &mut AnyTuple, status: Status) -> Result<bool> {
        let from = tuple.status();
        if from == status {
            debug!(tuple = tuple.key(), %status, "status unchanged");
            return Ok(false);
        }
        if status == Status::Aborted && from != Status::Waiting {
            debug!(tuple = tuple.key(), %from, "not aborting a tuple that left waiting");
            return Ok(false);
        }
        validate_transition(from, status)?;

        let key = tuple.key().to_string();
        let kind = tuple.asset_type();
        let worker = tuple.worker().to_string();
        registry::resolve_node(self.db, &worker)
            .map_err(|e| e.into_internal(format!("worker {worker} of tuple {key}")))?;

        tuple.base_mut().status = status;
        tuple.put(self.db)?;
        self.db.update_index(
            &worker_status_index(kind),
            &[worker.as_str(), from.as_str(), key.as_str()],
            &[worker.as_str(), status.as_str(), key.as_str()],
        )?;

        if let Some(plan_key) = tuple.compute_plan_key() {
            let aborts = plan::update_plan_state(self.db, plan_key, &key, status)?;
            self.abort_all(aborts);
        }

        self.db.emit_event(LedgerEvent::new(kind, key.as_str(), status))?;
        info!(tuple = %key, %kind, %from, to = %status, "tuple status updated");
        self.step.changes.push(StatusChange {
            key,
            asset_type: kind,
            from,
            to: status,
        });
        Ok(true)
    }

    /// Queue the children of `parent` for re-evaluation.
    pub fn propagate(&mut self, parent: &str, status: Status) {
        self.worklist.push(Work::Propagate {
            parent: parent.to_string(),
            status,
        });
    }

    /// Queue plan members for abortion.
    pub fn abort_all(&mut self, keys: impl IntoIterator<Item = String>) {
        self.worklist
            .extend(keys.into_iter().map(|key| Work::Abort { key }));
    }

    /// Drain the worklist and return every change committed by this manager.
    pub fn run(mut self) -> Result<PropagationStep> {
        while let Some(work) = self.worklist.pop() {
            match work {
                Work::Propagate { parent, status } => {
                    if !self.visited.insert(parent.clone()) {
                        continue;
                    }
                    self.update_children(&parent, status)?;
                }
                Work::Abort { key } => {
                    let mut tuple = AnyTuple::load(self.db, &key)
                        .map_err(|e| e.into_internal(format!("plan member {key}")))?;
                    self.commit(&mut tuple, Status::Aborted)?;
                }
            }
        }
        Ok(self.step)
    }

    fn update_children(&mut self, parent: &str, parent_status: Status) -> Result<()> {
        let children = self.db.get_index_keys(IN_MODEL_INDEX, &[parent])?;
        debug!(parent, %parent_status, children = children.len(), "updating children");

        for child_key in children {
            let mut child = AnyTuple::load(self.db, &child_key)
                .map_err(|e| e.into_internal(format!("child {child_key} of {parent}")))?;
            if child.status() != Status::Waiting {
                continue;
            }

            let target = match parent_status {
                Status::Failed => Status::Failed,
                Status::Done if is_ready(&*self.db, &child.base().in_model_keys)? => Status::Todo,
                _ => continue,
            };

            self.commit(&mut child, target)?;
            if target == Status::Failed && child.compute_plan_key().is_none() {
                self.propagate(&child_key, Status::Failed);
            }
        }
        Ok(())
    }
}
