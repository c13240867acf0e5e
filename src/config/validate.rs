// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, TupledagError};
use crate::types::AssetType;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::TupledagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_engine_section(cfg)?;
    let nodes = validate_nodes(cfg)?;
    validate_owners(cfg, &nodes)?;
    validate_steps(cfg)?;
    Ok(())
}

fn validate_engine_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.engine.page_size == 0 {
        return Err(TupledagError::ConfigError(
            "[engine].page_size must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_nodes(cfg: &RawConfigFile) -> Result<HashSet<&str>> {
    let mut nodes = HashSet::new();
    for node in &cfg.node {
        if node.id.trim().is_empty() {
            return Err(TupledagError::ConfigError(
                "[[node]] entries need a non-empty id".to_string(),
            ));
        }
        if !nodes.insert(node.id.as_str()) {
            return Err(TupledagError::ConfigError(format!(
                "node '{}' is declared more than once",
                node.id
            )));
        }
    }
    Ok(nodes)
}

fn validate_owners(cfg: &RawConfigFile, nodes: &HashSet<&str>) -> Result<()> {
    for (key, algo) in &cfg.algo {
        if !is_algo_kind(algo.kind) {
            return Err(TupledagError::ConfigError(format!(
                "algo '{key}' has kind '{}', expected algo, compositealgo or aggregatealgo",
                algo.kind
            )));
        }
        if !nodes.contains(algo.owner.as_str()) {
            return Err(TupledagError::ConfigError(format!(
                "algo '{key}' is owned by unknown node '{}'",
                algo.owner
            )));
        }
    }
    for (key, objective) in &cfg.objective {
        if !nodes.contains(objective.owner.as_str()) {
            return Err(TupledagError::ConfigError(format!(
                "objective '{key}' is owned by unknown node '{}'",
                objective.owner
            )));
        }
    }
    Ok(())
}

fn is_algo_kind(kind: AssetType) -> bool {
    matches!(
        kind,
        AssetType::Algo | AssetType::CompositeAlgo | AssetType::AggregateAlgo
    )
}

fn validate_steps(cfg: &RawConfigFile) -> Result<()> {
    for (index, step) in cfg.step.iter().enumerate() {
        if step.caller.trim().is_empty() {
            return Err(TupledagError::ConfigError(format!(
                "step {} ({}) has no caller",
                index + 1,
                step.action.name()
            )));
        }
    }
    Ok(())
}
