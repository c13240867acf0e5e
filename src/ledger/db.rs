// src/ledger/db.rs

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::errors::{Result, TupledagError};
use crate::ledger::index::{composite_key, split_composite_key};
use crate::ledger::{Ledger, LedgerEvent};
use crate::types::AssetType;

/// Typed view over a [`Ledger`], scoped to one request.
///
/// Records are stored as JSON and always carry an `asset_type` field, which
/// is how a key's dynamic kind is resolved.
#[derive(Debug)]
pub struct LedgerDb<'a> {
    ledger: &'a mut dyn Ledger,
}

#[derive(serde::Deserialize)]
struct AssetHeader {
    asset_type: AssetType,
}

impl<'a> LedgerDb<'a> {
    pub fn new(ledger: &'a mut dyn Ledger) -> Self {
        Self { ledger }
    }

    pub fn key_exists(&self, key: &str) -> Result<bool> {
        Ok(self.ledger.get_state(key)?.is_some())
    }

    /// Read and decode a record. Missing keys are `NotFound`; undecodable
    /// records are `Internal`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let bytes = self
            .ledger
            .get_state(key)?
            .ok_or_else(|| TupledagError::not_found(format!("no element with key {key}")))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            TupledagError::internal(format!("could not decode record {key}: {e}"))
        })
    }

    /// Read a record, requiring it to have the given asset type.
    pub fn get_asset<T: DeserializeOwned>(&self, key: &str, expected: AssetType) -> Result<T> {
        let asset_type = self.get_asset_type(key)?;
        if asset_type != expected {
            return Err(TupledagError::not_found(format!(
                "no {expected} with key {key}"
            )));
        }
        self.get(key)
    }

    pub fn get_asset_type(&self, key: &str) -> Result<AssetType> {
        let header: AssetHeader = self.get(key)?;
        Ok(header.asset_type)
    }

    /// Write a record, overwriting any previous value.
    pub fn put<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.ledger.put_state(key, bytes).map_err(|e| {
            TupledagError::internal(format!("failed to write {key}: {e}"))
        })
    }

    /// Write a record that must not exist yet.
    pub fn add<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        if self.key_exists(key)? {
            return Err(TupledagError::conflict_with_key(
                "asset already exists",
                key,
            ));
        }
        self.put(key, value)
    }

    pub fn create_index(&mut self, name: &str, attributes: &[&str]) -> Result<()> {
        let key = composite_key(name, attributes)?;
        trace!(index = name, ?attributes, "create index entry");
        self.ledger.put_state(&key, vec![0u8])
    }

    /// Move an index entry from one attribute tuple to another.
    pub fn update_index(&mut self, name: &str, old: &[&str], new: &[&str]) -> Result<()> {
        let old_key = composite_key(name, old)?;
        if self.ledger.get_state(&old_key)?.is_none() {
            return Err(TupledagError::internal(format!(
                "index {name} has no entry for {old:?}"
            )));
        }
        self.ledger.del_state(&old_key)?;
        self.create_index(name, new)
    }

    /// Last attribute of every entry whose leading attributes equal `prefix`.
    pub fn get_index_keys(&self, name: &str, prefix: &[&str]) -> Result<Vec<String>> {
        let partial = composite_key(name, prefix)?;
        self.ledger
            .keys_with_prefix(&partial, None, None)?
            .iter()
            .map(|k| last_attribute(k))
            .collect()
    }

    /// Paginated variant of [`Self::get_index_keys`].
    ///
    /// `bookmark` is the opaque value returned by the previous page (empty for
    /// the first page). The returned bookmark is empty once no entries remain.
    pub fn get_index_keys_with_pagination(
        &self,
        name: &str,
        prefix: &[&str],
        page_size: usize,
        bookmark: &str,
    ) -> Result<(Vec<String>, String)> {
        let partial = composite_key(name, prefix)?;
        let start_after = if bookmark.is_empty() {
            None
        } else if bookmark.starts_with(&partial) {
            Some(bookmark)
        } else {
            return Err(TupledagError::bad_request("invalid bookmark"));
        };

        let mut composite =
            self.ledger
                .keys_with_prefix(&partial, start_after, Some(page_size.saturating_add(1)))?;
        let has_more = composite.len() > page_size;
        composite.truncate(page_size);

        let next = if has_more {
            composite.last().cloned().unwrap_or_default()
        } else {
            String::new()
        };
        let keys = composite
            .iter()
            .map(|k| last_attribute(k))
            .collect::<Result<Vec<_>>>()?;
        Ok((keys, next))
    }

    pub fn emit_event(&mut self, event: LedgerEvent) -> Result<()> {
        self.ledger.emit_event(event)
    }
}

fn last_attribute(composite: &str) -> Result<String> {
    let (name, mut attrs) = split_composite_key(composite)?;
    attrs
        .pop()
        .ok_or_else(|| TupledagError::internal(format!("index {name} entry has no attributes")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;

    #[derive(Debug, Serialize, serde::Deserialize, PartialEq)]
    struct Record {
        asset_type: AssetType,
        value: u32,
    }

    #[test]
    fn add_rejects_existing_key() {
        let mut ledger = MemoryLedger::new();
        let mut db = LedgerDb::new(&mut ledger);
        let rec = Record {
            asset_type: AssetType::Node,
            value: 1,
        };
        db.add("k", &rec).unwrap();
        match db.add("k", &rec) {
            Err(TupledagError::Conflict { key, .. }) => assert_eq!(key.as_deref(), Some("k")),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn typed_get_checks_asset_type() {
        let mut ledger = MemoryLedger::new();
        let mut db = LedgerDb::new(&mut ledger);
        db.put(
            "k",
            &Record {
                asset_type: AssetType::Node,
                value: 7,
            },
        )
        .unwrap();

        let rec: Record = db.get_asset("k", AssetType::Node).unwrap();
        assert_eq!(rec.value, 7);
        let err = db.get_asset::<Record>("k", AssetType::Algo).unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::NotFound);
        let err = db.get::<Record>("missing").unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::NotFound);
    }

    #[test]
    fn update_index_moves_entry() {
        let mut ledger = MemoryLedger::new();
        let mut db = LedgerDb::new(&mut ledger);
        db.create_index("t~w~s~key", &["w", "todo", "a"]).unwrap();
        db.update_index("t~w~s~key", &["w", "todo", "a"], &["w", "doing", "a"])
            .unwrap();

        assert!(db.get_index_keys("t~w~s~key", &["w", "todo"]).unwrap().is_empty());
        assert_eq!(
            db.get_index_keys("t~w~s~key", &["w", "doing"]).unwrap(),
            vec!["a"]
        );
        let err = db
            .update_index("t~w~s~key", &["w", "todo", "a"], &["w", "done", "a"])
            .unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Internal);
    }

    #[test]
    fn pagination_walks_all_entries() {
        let mut ledger = MemoryLedger::new();
        let mut db = LedgerDb::new(&mut ledger);
        for key in ["a", "b", "c", "d", "e"] {
            db.create_index("idx", &["p", key]).unwrap();
        }
        db.create_index("idx", &["q", "z"]).unwrap();

        let (page1, bm1) = db.get_index_keys_with_pagination("idx", &["p"], 2, "").unwrap();
        assert_eq!(page1, vec!["a", "b"]);
        let (page2, bm2) = db.get_index_keys_with_pagination("idx", &["p"], 2, &bm1).unwrap();
        assert_eq!(page2, vec!["c", "d"]);
        let (page3, bm3) = db.get_index_keys_with_pagination("idx", &["p"], 2, &bm2).unwrap();
        assert_eq!(page3, vec!["e"]);
        assert!(bm3.is_empty());

        let err = db
            .get_index_keys_with_pagination("idx", &["p"], 2, "garbage")
            .unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::BadRequest);
    }
}
