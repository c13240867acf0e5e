// src/ledger/mod.rs

//! Ledger access facade.
//!
//! - [`Ledger`] is the raw key-value capability the engine is given: state
//!   get/put/delete, an ordered prefix scan and event emission.
//! - [`db::LedgerDb`] layers typed JSON records, existence checks and
//!   composite secondary indexes on top of any [`Ledger`].
//! - [`memory::MemoryLedger`] is an in-process implementation whose
//!   transactions apply all of their writes or none of them.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::types::AssetType;

pub mod db;
pub mod index;
pub mod memory;

pub use db::LedgerDb;
pub use memory::{MemoryLedger, Transaction};

/// Raw ledger capability.
pub trait Ledger: Debug {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<()>;
    fn del_state(&mut self, key: &str) -> Result<()>;

    /// Keys starting with `prefix`, in ascending order.
    ///
    /// Only keys strictly greater than `start_after` are returned, and at
    /// most `limit` of them.
    fn keys_with_prefix(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<String>>;

    fn emit_event(&mut self, event: LedgerEvent) -> Result<()>;
}

/// Notification recorded when an asset is created or changes status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub asset_type: AssetType,
    pub key: String,
    pub status: String,
}

impl LedgerEvent {
    pub fn new(asset_type: AssetType, key: impl Into<String>, status: impl ToString) -> Self {
        Self {
            asset_type,
            key: key.into(),
            status: status.to_string(),
        }
    }
}
