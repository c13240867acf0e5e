// src/tuple/base.rs

//! Fields and helpers shared by every tuple kind.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use blake3::Hasher;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::errors::{Result, TupledagError};
use crate::ledger::LedgerDb;
use crate::ledger::index::{
    IN_MODEL_INDEX, PLAN_ALGO_INDEX, PLAN_RANK_INDEX, PLAN_TUPLE_INDEX, algo_index, tag_index,
    worker_status_index,
};
use crate::registry::{self, Algo};
use crate::types::{AssetType, Status};

static KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9A-Za-z][0-9A-Za-z_.:-]{0,127}$").expect("key pattern is valid")
});

static CHECKSUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{64}$").expect("checksum pattern is valid"));

const MAX_TAG_LEN: usize = 64;

/// Produced model descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyChecksumAddress {
    pub key: String,
    pub checksum: String,
    pub storage_address: String,
}

/// Model descriptor without a storage address (composite heads stay on the worker).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyChecksum {
    pub key: String,
    pub checksum: String,
}

impl KeyChecksumAddress {
    pub fn validate(&self) -> Result<()> {
        validate_key(&self.key, "model key")?;
        validate_checksum(&self.checksum)
    }
}

impl KeyChecksum {
    pub fn validate(&self) -> Result<()> {
        validate_key(&self.key, "model key")?;
        validate_checksum(&self.checksum)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TupleBase {
    pub key: String,
    pub asset_type: AssetType,
    pub creator: String,
    pub worker: String,
    pub algo_key: String,
    /// Parent tuple keys, in request order. Not assumed distinct.
    pub in_model_keys: Vec<String>,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_plan_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    #[serde(default)]
    pub log: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl TupleBase {
    /// Empty tuple of the given kind; status starts as `Waiting` until the
    /// parents are resolved.
    pub fn new(key: String, asset_type: AssetType, creator: &str) -> Self {
        Self {
            key,
            asset_type,
            creator: creator.to_string(),
            worker: String::new(),
            algo_key: String::new(),
            in_model_keys: Vec::new(),
            status: Status::Waiting,
            compute_plan_key: None,
            rank: None,
            log: String::new(),
            tag: String::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Resolve the algorithm and worker referenced by a creation request and
    /// copy the verbatim request fields.
    pub fn set_from_input(
        &mut self,
        db: &LedgerDb<'_>,
        ctx: &RequestContext,
        algo_key: &str,
        worker: &str,
        tag: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<Algo> {
        validate_tag(tag)?;
        let algo_type = self.asset_type.algo_type().ok_or_else(|| {
            TupledagError::internal(format!("{} does not reference an algo", self.asset_type))
        })?;
        let algo = registry::resolve_algo(db, algo_key, algo_type)
            .map_err(|e| e.into_bad_request(format!("could not retrieve algo {algo_key}")))?;
        if !algo.permissions.can_process(&algo.owner, ctx.creator()) {
            return Err(TupledagError::forbidden(format!(
                "not authorized to process algo {algo_key}"
            )));
        }
        registry::resolve_node(db, worker)
            .map_err(|e| e.into_bad_request(format!("could not retrieve worker {worker}")))?;

        self.algo_key = algo_key.to_string();
        self.worker = worker.to_string();
        self.tag = tag.to_string();
        self.metadata = metadata.clone();
        Ok(algo)
    }

    /// Whether this tuple occupies a (plan, worker, rank) slot.
    pub fn holds_rank_slot(&self) -> bool {
        self.asset_type != AssetType::Testtuple
    }

    pub fn append_log(&mut self, log: &str) {
        self.log.push_str(log);
    }

    /// Write every secondary index of a freshly saved tuple.
    pub fn create_indexes(&self, db: &mut LedgerDb<'_>) -> Result<()> {
        let kind = self.asset_type;
        let key = self.key.as_str();

        db.create_index(&algo_index(kind), &[self.algo_key.as_str(), key])?;
        db.create_index(
            &worker_status_index(kind),
            &[self.worker.as_str(), self.status.as_str(), key],
        )?;
        for parent in &self.in_model_keys {
            db.create_index(IN_MODEL_INDEX, &[parent.as_str(), key])?;
        }
        if let Some(plan) = self.compute_plan_key.as_deref() {
            if self.holds_rank_slot() {
                let rank = self.rank.unwrap_or_default().to_string();
                db.create_index(
                    PLAN_RANK_INDEX,
                    &[plan, self.worker.as_str(), rank.as_str(), key],
                )?;
            }
            db.create_index(PLAN_ALGO_INDEX, &[plan, self.algo_key.as_str()])?;
            db.create_index(PLAN_TUPLE_INDEX, &[plan, key])?;
        }
        if !self.tag.is_empty() {
            db.create_index(&tag_index(kind), &[self.tag.as_str(), key])?;
        }
        Ok(())
    }
}

/// Use the supplied key, or derive one from the request content.
pub fn key_or_derived(key: &str, kind: AssetType, content: &[&str]) -> Result<String> {
    if key.is_empty() {
        return Ok(derive_key(kind, content));
    }
    validate_key(key, "key")?;
    Ok(key.to_string())
}

/// Content-derived key: blake3 over the kind and length-prefixed fields.
pub fn derive_key(kind: AssetType, content: &[&str]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(kind.as_str().as_bytes());
    for part in content {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

pub fn validate_key(key: &str, what: &str) -> Result<()> {
    if KEY_RE.is_match(key) {
        Ok(())
    } else {
        Err(TupledagError::bad_request(format!("invalid {what} {key:?}")))
    }
}

pub fn validate_checksum(checksum: &str) -> Result<()> {
    if CHECKSUM_RE.is_match(checksum) {
        Ok(())
    } else {
        Err(TupledagError::bad_request(format!(
            "invalid checksum {checksum:?}, expected 64 hexadecimal characters"
        )))
    }
}

pub(crate) fn validate_tag(tag: &str) -> Result<()> {
    if tag.chars().count() > MAX_TAG_LEN {
        return Err(TupledagError::bad_request(format!(
            "tag must be at most {MAX_TAG_LEN} characters"
        )));
    }
    if tag.contains('\u{0}') {
        return Err(TupledagError::bad_request("tag contains a NUL character"));
    }
    Ok(())
}
