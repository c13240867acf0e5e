// src/registry.rs

//! Registered workers, algorithms and objectives.
//!
//! Registration flows live outside this crate; the records here are what the
//! engine resolves against. The `register_*` helpers only write a record so
//! that a ledger can be seeded.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{Result, TupledagError};
use crate::ledger::LedgerDb;
use crate::permissions::{InputPermissions, Permissions};
use crate::types::AssetType;

/// A worker able to run tuples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub asset_type: AssetType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Algo {
    pub key: String,
    /// `Algo`, `CompositeAlgo` or `AggregateAlgo`.
    pub asset_type: AssetType,
    pub name: String,
    pub owner: String,
    pub permissions: Permissions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    pub key: String,
    pub asset_type: AssetType,
    pub name: String,
    pub owner: String,
    pub permissions: Permissions,
}

pub fn resolve_node(db: &LedgerDb<'_>, id: &str) -> Result<Node> {
    db.get_asset(id, AssetType::Node)
}

/// Resolve an algorithm of the given kind.
pub fn resolve_algo(db: &LedgerDb<'_>, key: &str, kind: AssetType) -> Result<Algo> {
    db.get_asset(key, kind)
}

pub fn resolve_objective(db: &LedgerDb<'_>, key: &str) -> Result<Objective> {
    db.get_asset(key, AssetType::Objective)
}

pub fn register_node(db: &mut LedgerDb<'_>, id: &str) -> Result<Node> {
    let node = Node {
        id: id.to_string(),
        asset_type: AssetType::Node,
    };
    db.add(id, &node)?;
    debug!(node = id, "node registered");
    Ok(node)
}

pub fn register_algo(
    db: &mut LedgerDb<'_>,
    key: &str,
    kind: AssetType,
    name: &str,
    owner: &str,
    permissions: &InputPermissions,
) -> Result<Algo> {
    if !matches!(
        kind,
        AssetType::Algo | AssetType::CompositeAlgo | AssetType::AggregateAlgo
    ) {
        return Err(TupledagError::bad_request(format!(
            "{kind} is not an algorithm type"
        )));
    }
    resolve_node(db, owner).map_err(|e| e.into_bad_request(format!("algo owner {owner}")))?;
    let algo = Algo {
        key: key.to_string(),
        asset_type: kind,
        name: name.to_string(),
        owner: owner.to_string(),
        permissions: Permissions::from_input(owner, permissions),
    };
    db.add(key, &algo)?;
    debug!(algo = key, %kind, owner, "algo registered");
    Ok(algo)
}

pub fn register_objective(
    db: &mut LedgerDb<'_>,
    key: &str,
    name: &str,
    owner: &str,
    permissions: &InputPermissions,
) -> Result<Objective> {
    resolve_node(db, owner)
        .map_err(|e| e.into_bad_request(format!("objective owner {owner}")))?;
    let objective = Objective {
        key: key.to_string(),
        asset_type: AssetType::Objective,
        name: name.to_string(),
        owner: owner.to_string(),
        permissions: Permissions::from_input(owner, permissions),
    };
    db.add(key, &objective)?;
    debug!(objective = key, owner, "objective registered");
    Ok(objective)
}
