// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Parse a config file without any semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let raw: RawConfigFile = toml::from_str(&fs::read_to_string(path)?)?;
    debug!(
        path = %path.display(),
        nodes = raw.node.len(),
        algos = raw.algo.len(),
        steps = raw.step.len(),
        "config parsed"
    );
    Ok(raw)
}

/// Parse and validate a config file (see `validate.rs` for the rules).
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    load_from_path(path)?.try_into()
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("Tupledag.toml")
}
