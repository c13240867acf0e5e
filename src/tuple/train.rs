// src/tuple/train.rs

use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::dag::resolver::resolve_from_parents;
use crate::errors::Result;
use crate::ledger::LedgerDb;
use crate::permissions::Permissions;
use crate::tuple::base::{KeyChecksumAddress, TupleBase, key_or_derived};
use crate::tuple::input::TraintupleRequest;
use crate::types::AssetType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Traintuple {
    #[serde(flatten)]
    pub base: TupleBase,
    /// Merged permissions of the parent models.
    pub permissions: Permissions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_model: Option<KeyChecksumAddress>,
}

impl Traintuple {
    pub fn from_request(
        db: &LedgerDb<'_>,
        ctx: &RequestContext,
        req: &TraintupleRequest,
    ) -> Result<Self> {
        let (base, permissions) = build_model_tuple(db, ctx, req, AssetType::Traintuple)?;
        Ok(Self {
            base,
            permissions,
            out_model: None,
        })
    }
}

/// Shared construction of tuples that produce a single model from a flat
/// list of parents (train and aggregate).
pub(crate) fn build_model_tuple(
    db: &LedgerDb<'_>,
    ctx: &RequestContext,
    req: &TraintupleRequest,
    kind: AssetType,
) -> Result<(TupleBase, Permissions)> {
    let key = key_or_derived(&req.key, kind, &req.content())?;
    let mut base = TupleBase::new(key, kind, ctx.creator());
    base.set_from_input(db, ctx, &req.algo_key, &req.worker, &req.tag, &req.metadata)?;

    let permissions = resolve_from_parents(db, &[], &req.in_models)?.apply(&mut base);
    Ok((base, permissions))
}
