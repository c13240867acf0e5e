// src/dag/resolver.rs

//! Dependency resolution: what a tuple's status and permissions are, given
//! its parents.
//!
//! This module never names a concrete tuple kind. Parents are reached through
//! a [`ParentLookup`] that hands back [`ParentTuple`] capabilities.

use tracing::debug;

use crate::errors::Result;
use crate::permissions::Permissions;
use crate::tuple::base::TupleBase;
use crate::types::Status;

/// What the resolver needs to know about a parent tuple.
pub trait ParentTuple {
    fn status(&self) -> Status;
    /// Permissions of the model a child consumes from this parent.
    fn output_permissions(&self) -> &Permissions;
}

/// Resolves a parent key to its capability handle, whatever its kind.
pub trait ParentLookup {
    fn parent(&self, key: &str) -> Result<Box<dyn ParentTuple>>;
}

/// Outcome of resolving a tuple's parents.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub in_model_keys: Vec<String>,
    pub permissions: Permissions,
    pub status: Status,
}

impl Resolution {
    /// Store parents and status on `base`; return the merged permissions.
    pub fn apply(self, base: &mut TupleBase) -> Permissions {
        base.in_model_keys = self.in_model_keys;
        base.status = self.status;
        self.permissions
    }
}

/// Resolve `parents` and derive the initial status and permissions.
///
/// `preset` holds in-model keys already on the tuple; parents are appended
/// after them, order preserved. A parent that cannot be resolved is an
/// internal error: callers only reference tuples that already exist.
pub fn resolve_from_parents(
    lookup: &dyn ParentLookup,
    preset: &[String],
    parents: &[String],
) -> Result<Resolution> {
    let mut in_model_keys = preset.to_vec();
    let mut statuses = Vec::with_capacity(parents.len());
    let mut permissions = Permissions::open();

    for key in parents {
        let parent = lookup
            .parent(key)
            .map_err(|e| e.into_internal(format!("could not retrieve parent tuple {key}")))?;
        statuses.push(parent.status());
        permissions = permissions.merge(parent.output_permissions());
        in_model_keys.push(key.clone());
    }

    let status = status_from_parents(&statuses);
    debug!(parents = parents.len(), %status, "resolved tuple parents");

    Ok(Resolution {
        in_model_keys,
        permissions,
        status,
    })
}

/// Status precedence: any failed parent fails the child; all done (or no
/// parents at all) makes it runnable; otherwise it waits.
pub fn status_from_parents(statuses: &[Status]) -> Status {
    if statuses.contains(&Status::Failed) {
        Status::Failed
    } else if statuses.iter().all(|s| *s == Status::Done) {
        Status::Todo
    } else {
        Status::Waiting
    }
}

/// Whether every parent in `in_model_keys` has reached `Done`.
pub fn is_ready(lookup: &dyn ParentLookup, in_model_keys: &[String]) -> Result<bool> {
    for key in in_model_keys {
        let parent = lookup
            .parent(key)
            .map_err(|e| e.into_internal(format!("parent tuple {key} vanished")))?;
        if parent.status() != Status::Done {
            return Ok(false);
        }
    }
    Ok(true)
}
