// src/engine/mod.rs

//! Request handlers of the tuple lifecycle engine.
//!
//! Every handler is one synchronous request against a [`LedgerDb`] scoped to
//! a single transaction; an error means the caller must discard all of the
//! request's writes (see [`crate::ledger::MemoryLedger::transact`]).
//!
//! - [`create`]: tuple and compute plan creation, plan cancellation.
//! - [`lifecycle`]: `start`, `fail` and `succeed`.
//! - [`query`]: read-only lookups and listings.
//!
//! [`LedgerDb`]: crate::ledger::LedgerDb

pub mod create;
pub mod lifecycle;
pub mod query;

use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::errors::{Result, TupledagError};
use crate::tuple::AnyTuple;

/// Default number of entries per page of a listing.
pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Tunables of the engine, as read from the `[engine]` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub page_size: usize,
    /// Reject a tuple whose (plan, worker, rank) slot is already taken.
    /// Bulk submissions check their slots upfront and skip this check.
    pub check_compute_plan_availability: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            check_compute_plan_availability: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Engine {
    settings: EngineSettings,
}

impl Engine {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }
}

/// Only the worker a tuple is assigned to may report on it.
fn ensure_worker(ctx: &RequestContext, tuple: &AnyTuple) -> Result<()> {
    if ctx.creator() == tuple.worker() {
        Ok(())
    } else {
        Err(TupledagError::forbidden(format!(
            "{} is not allowed to update tuple {} assigned to {}",
            ctx.creator(),
            tuple.key(),
            tuple.worker()
        )))
    }
}
