// src/tuple/mod.rs

//! Tuple records and the operations shared by every kind.
//!
//! - [`base`] holds the fields common to all kinds, key derivation and the
//!   secondary indexes.
//! - [`input`] defines creation requests and worker outputs.
//! - [`train`], [`composite`], [`aggregate`] and [`test`] build each kind
//!   from its request.
//! - [`view`] is the read projection returned by queries.

pub mod aggregate;
pub mod base;
pub mod composite;
pub mod input;
pub mod train;
pub mod view;

pub use aggregate::Aggregatetuple;
pub use base::{KeyChecksum, KeyChecksumAddress, TupleBase};
pub use composite::CompositeTraintuple;
pub use input::{
    AggregatetupleRequest, CompositeTraintupleRequest, PlanSlot, TesttupleRequest,
    TraintupleRequest, TupleOutput,
};
pub use test::Testtuple;
pub use train::Traintuple;
pub use view::TupleView;

use crate::dag::resolver::{ParentLookup, ParentTuple};
use crate::errors::{Result, TupledagError};
use crate::ledger::LedgerDb;
use crate::permissions::Permissions;
use crate::types::{AssetType, Status};

/// A tuple of any kind, as loaded from the ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyTuple {
    Train(Traintuple),
    Composite(CompositeTraintuple),
    Aggregate(Aggregatetuple),
    Test(Testtuple),
}

impl AnyTuple {
    /// Load a tuple, dispatching on the stored asset type. Keys that are
    /// absent or hold a non-tuple asset are `NotFound`.
    pub fn load(db: &LedgerDb<'_>, key: &str) -> Result<Self> {
        let tuple = match db.get_asset_type(key)? {
            AssetType::Traintuple => AnyTuple::Train(db.get(key)?),
            AssetType::CompositeTraintuple => AnyTuple::Composite(db.get(key)?),
            AssetType::Aggregatetuple => AnyTuple::Aggregate(db.get(key)?),
            AssetType::Testtuple => AnyTuple::Test(db.get(key)?),
            other => {
                return Err(TupledagError::not_found(format!(
                    "{key} is a {other}, not a tuple"
                )));
            }
        };
        Ok(tuple)
    }

    pub fn base(&self) -> &TupleBase {
        match self {
            AnyTuple::Train(t) => &t.base,
            AnyTuple::Composite(t) => &t.base,
            AnyTuple::Aggregate(t) => &t.base,
            AnyTuple::Test(t) => &t.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut TupleBase {
        match self {
            AnyTuple::Train(t) => &mut t.base,
            AnyTuple::Composite(t) => &mut t.base,
            AnyTuple::Aggregate(t) => &mut t.base,
            AnyTuple::Test(t) => &mut t.base,
        }
    }

    pub fn key(&self) -> &str {
        &self.base().key
    }

    pub fn status(&self) -> Status {
        self.base().status
    }

    pub fn worker(&self) -> &str {
        &self.base().worker
    }

    pub fn asset_type(&self) -> AssetType {
        self.base().asset_type
    }

    pub fn compute_plan_key(&self) -> Option<&str> {
        self.base().compute_plan_key.as_deref()
    }

    /// Capability handle used when this tuple is someone's parent.
    pub fn into_parent(self) -> Result<Box<dyn ParentTuple>> {
        match self {
            AnyTuple::Train(t) => Ok(Box::new(t)),
            AnyTuple::Composite(t) => Ok(Box::new(t)),
            AnyTuple::Aggregate(t) => Ok(Box::new(t)),
            AnyTuple::Test(t) => Err(TupledagError::internal(format!(
                "unsupported parent type testtuple for {}",
                t.base.key
            ))),
        }
    }

    /// Write the record without touching indexes.
    pub fn put(&self, db: &mut LedgerDb<'_>) -> Result<()> {
        match self {
            AnyTuple::Train(t) => db.put(&t.base.key, t),
            AnyTuple::Composite(t) => db.put(&t.base.key, t),
            AnyTuple::Aggregate(t) => db.put(&t.base.key, t),
            AnyTuple::Test(t) => db.put(&t.base.key, t),
        }
    }

    /// Write a new record and all of its secondary indexes. The key must
    /// still be free (Conflict otherwise).
    pub fn save(&self, db: &mut LedgerDb<'_>) -> Result<()> {
        match self {
            AnyTuple::Train(t) => db.add(&t.base.key, t),
            AnyTuple::Composite(t) => db.add(&t.base.key, t),
            AnyTuple::Aggregate(t) => db.add(&t.base.key, t),
            AnyTuple::Test(t) => db.add(&t.base.key, t),
        }?;
        self.base().create_indexes(db)
    }

    /// Attach what a worker produced. Returns the keys of the produced models.
    pub fn record_output(&mut self, output: TupleOutput) -> Result<Vec<String>> {
        let key = self.key().to_string();
        match (self, output) {
            (AnyTuple::Train(t), TupleOutput::Model(model)) => {
                set_once(&mut t.out_model, model, &key)
            }
            (AnyTuple::Aggregate(t), TupleOutput::Model(model)) => {
                set_once(&mut t.out_model, model, &key)
            }
            (AnyTuple::Composite(t), TupleOutput::Composite { head, trunk }) => {
                head.validate()?;
                trunk.validate()?;
                if t.out_head_model.out_model.is_some() || t.out_trunk_model.out_model.is_some() {
                    return Err(already_recorded(&key));
                }
                let keys = vec![head.key.clone(), trunk.key.clone()];
                t.out_head_model.out_model = Some(head);
                t.out_trunk_model.out_model = Some(trunk);
                Ok(keys)
            }
            (AnyTuple::Test(t), TupleOutput::Perf(perf)) => {
                if !perf.is_finite() {
                    return Err(TupledagError::bad_request(format!(
                        "perf of {key} must be a finite number"
                    )));
                }
                if t.perf.is_some() {
                    return Err(already_recorded(&key));
                }
                t.perf = Some(perf);
                Ok(Vec::new())
            }
            (tuple, output) => Err(TupledagError::bad_request(format!(
                "{} {key} cannot record a {} output",
                tuple.asset_type(),
                output.kind_name()
            ))),
        }
    }

    pub fn view(&self) -> TupleView {
        TupleView::from(self)
    }
}

fn set_once(
    slot: &mut Option<KeyChecksumAddress>,
    model: KeyChecksumAddress,
    key: &str,
) -> Result<Vec<String>> {
    model.validate()?;
    if slot.is_some() {
        return Err(already_recorded(key));
    }
    let model_key = model.key.clone();
    *slot = Some(model);
    Ok(vec![model_key])
}

fn already_recorded(key: &str) -> TupledagError {
    TupledagError::internal(format!("output of tuple {key} is already recorded"))
}

impl TupleOutput {
    fn kind_name(&self) -> &'static str {
        match self {
            TupleOutput::Model(_) => "model",
            TupleOutput::Composite { .. } => "head and trunk model",
            TupleOutput::Perf(_) => "perf",
        }
    }
}

impl ParentTuple for Traintuple {
    fn status(&self) -> Status {
        self.base.status
    }

    fn output_permissions(&self) -> &Permissions {
        &self.permissions
    }
}

impl ParentTuple for Aggregatetuple {
    fn status(&self) -> Status {
        self.base.status
    }

    fn output_permissions(&self) -> &Permissions {
        &self.permissions
    }
}

/// Children of a composite consume its trunk model.
impl ParentTuple for CompositeTraintuple {
    fn status(&self) -> Status {
        self.base.status
    }

    fn output_permissions(&self) -> &Permissions {
        &self.out_trunk_model.permissions
    }
}

impl ParentLookup for LedgerDb<'_> {
    fn parent(&self, key: &str) -> Result<Box<dyn ParentTuple>> {
        AnyTuple::load(self, key)?.into_parent()
    }
}
