// src/tuple/aggregate.rs

use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::errors::Result;
use crate::ledger::LedgerDb;
use crate::permissions::Permissions;
use crate::tuple::base::{KeyChecksumAddress, TupleBase};
use crate::tuple::input::AggregatetupleRequest;
use crate::tuple::train::build_model_tuple;
use crate::types::AssetType;

/// Combines the models of its parents, typically one per worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregatetuple {
    #[serde(flatten)]
    pub base: TupleBase,
    pub permissions: Permissions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_model: Option<KeyChecksumAddress>,
}

impl Aggregatetuple {
    pub fn from_request(
        db: &LedgerDb<'_>,
        ctx: &RequestContext,
        req: &AggregatetupleRequest,
    ) -> Result<Self> {
        let (base, permissions) = build_model_tuple(db, ctx, req, AssetType::Aggregatetuple)?;
        Ok(Self {
            base,
            permissions,
            out_model: None,
        })
    }
}
