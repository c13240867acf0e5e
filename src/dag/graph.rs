// src/dag/graph.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{Result, TupledagError};

/// Dependency graph of the entries of one bulk submission, keyed by tuple key.
///
/// Edge direction: parent -> child. Parents outside the submission are not
/// part of the graph; they already exist on the ledger.
#[derive(Debug, Default)]
pub struct PlanGraph<'a> {
    graph: DiGraphMap<&'a str, ()>,
}

impl<'a> PlanGraph<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entry(&mut self, key: &'a str) {
        self.graph.add_node(key);
    }

    pub fn add_dependency(&mut self, parent: &'a str, child: &'a str) {
        self.graph.add_edge(parent, child, ());
    }

    /// Entries ordered so that every parent comes before its children.
    pub fn creation_order(&self) -> Result<Vec<&'a str>> {
        toposort(&self.graph, None).map_err(|cycle| {
            TupledagError::bad_request(format!(
                "compute plan has a cycle involving tuple '{}'",
                cycle.node_id()
            ))
        })
    }
}
