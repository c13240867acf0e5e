// src/tuple/composite.rs

//! Composite train tuples: a private head model that never leaves the worker
//! and a shareable trunk model.

use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::dag::resolver::resolve_from_parents;
use crate::errors::{Result, TupledagError};
use crate::ledger::LedgerDb;
use crate::permissions::Permissions;
use crate::tuple::AnyTuple;
use crate::tuple::base::{KeyChecksum, KeyChecksumAddress, TupleBase, key_or_derived};
use crate::tuple::input::CompositeTraintupleRequest;
use crate::types::AssetType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadModel {
    pub permissions: Permissions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_model: Option<KeyChecksum>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrunkModel {
    pub permissions: Permissions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_model: Option<KeyChecksumAddress>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeTraintuple {
    #[serde(flatten)]
    pub base: TupleBase,
    #[serde(default)]
    pub in_head_model_key: String,
    #[serde(default)]
    pub in_trunk_model_key: String,
    pub out_head_model: HeadModel,
    pub out_trunk_model: TrunkModel,
}

impl CompositeTraintuple {
    pub fn from_request(
        db: &LedgerDb<'_>,
        ctx: &RequestContext,
        req: &CompositeTraintupleRequest,
    ) -> Result<Self> {
        if req.in_head_model_key.is_empty() != req.in_trunk_model_key.is_empty() {
            return Err(TupledagError::bad_request(
                "head and trunk models must be provided together",
            ));
        }

        let key = key_or_derived(&req.key, AssetType::CompositeTraintuple, &req.content())?;
        let mut base = TupleBase::new(key, AssetType::CompositeTraintuple, ctx.creator());
        base.set_from_input(db, ctx, &req.algo_key, &req.worker, &req.tag, &req.metadata)?;

        if !req.in_head_model_key.is_empty() {
            check_head_parent(db, &req.in_head_model_key, &base.worker)?;
        }

        let trunk_permissions = resolve_from_parents(db, &[], &req.in_models())?.apply(&mut base);
        let head_permissions = Permissions::restricted_to([base.worker.as_str()]);

        Ok(Self {
            base,
            in_head_model_key: req.in_head_model_key.clone(),
            in_trunk_model_key: req.in_trunk_model_key.clone(),
            out_head_model: HeadModel {
                permissions: head_permissions,
                out_model: None,
            },
            out_trunk_model: TrunkModel {
                permissions: trunk_permissions,
                out_model: None,
            },
        })
    }
}

/// The head model only exists on the worker that produced it.
fn check_head_parent(db: &LedgerDb<'_>, head_key: &str, worker: &str) -> Result<()> {
    let head = AnyTuple::load(db, head_key)
        .map_err(|e| e.into_bad_request(format!("could not retrieve head model {head_key}")))?;
    let head = match head {
        AnyTuple::Composite(head) => head,
        other => {
            return Err(TupledagError::bad_request(format!(
                "head model {head_key} must come from a compositetraintuple, got {}",
                other.asset_type()
            )));
        }
    };
    if head.base.worker != worker {
        return Err(TupledagError::bad_request(format!(
            "head model {head_key} was trained on {}, not on worker {worker}",
            head.base.worker
        )));
    }
    Ok(())
}
