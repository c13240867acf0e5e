// src/tuple/view.rs

use serde::Serialize;

use crate::permissions::Permissions;
use crate::tuple::AnyTuple;
use crate::tuple::base::{KeyChecksum, KeyChecksumAddress, TupleBase};

/// Read projection of a tuple of any kind. Fields that do not apply to the
/// kind are omitted when serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TupleView {
    #[serde(flatten)]
    pub base: TupleBase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_model: Option<KeyChecksumAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_head_model: Option<KeyChecksum>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_head_permissions: Option<Permissions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objective_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perf: Option<f32>,
}

impl TupleView {
    fn bare(base: &TupleBase) -> Self {
        Self {
            base: base.clone(),
            permissions: None,
            out_model: None,
            out_head_model: None,
            out_head_permissions: None,
            objective_key: None,
            perf: None,
        }
    }
}

impl From<&AnyTuple> for TupleView {
    fn from(tuple: &AnyTuple) -> Self {
        let mut view = TupleView::bare(tuple.base());
        match tuple {
            AnyTuple::Train(t) => {
                view.permissions = Some(t.permissions.clone());
                view.out_model = t.out_model.clone();
            }
            AnyTuple::Aggregate(t) => {
                view.permissions = Some(t.permissions.clone());
                view.out_model = t.out_model.clone();
            }
            AnyTuple::Composite(t) => {
                // The trunk is the shareable output, so it fills the generic slots.
                view.permissions = Some(t.out_trunk_model.permissions.clone());
                view.out_model = t.out_trunk_model.out_model.clone();
                view.out_head_model = t.out_head_model.out_model.clone();
                view.out_head_permissions = Some(t.out_head_model.permissions.clone());
            }
            AnyTuple::Test(t) => {
                view.objective_key = Some(t.objective_key.clone());
                view.perf = t.perf;
            }
        }
        view
    }
}
