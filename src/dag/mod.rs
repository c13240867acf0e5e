// src/dag/mod.rs

//! Tuple dependency graph logic.
//!
//! - [`resolver`] derives a tuple's initial status and permissions from its
//!   parents, and decides when a waiting tuple is ready.
//! - [`state_manager`] commits status transitions and propagates them to
//!   children through an explicit worklist.
//! - [`step`] defines the result type of a propagation run.
//! - [`graph`] orders and checks the entries of a bulk plan submission.

pub mod graph;
pub mod resolver;
pub mod state_manager;
pub mod step;

pub use graph::PlanGraph;
pub use resolver::{ParentLookup, ParentTuple, Resolution, is_ready, resolve_from_parents};
pub use state_manager::{StateManager, validate_transition};
pub use step::{PropagationStep, StatusChange};
