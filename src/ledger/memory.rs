// src/ledger/memory.rs

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use tracing::debug;

use super::{Ledger, LedgerDb, LedgerEvent};
use crate::errors::Result;

/// In-memory ledger.
///
/// Requests should run through [`MemoryLedger::transact`], which stages every
/// write and event and applies them only when the request succeeds.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    state: BTreeMap<String, Vec<u8>>,
    events: Vec<LedgerEvent>,
    writes: u64,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` as one atomic request.
    pub fn transact<T>(&mut self, f: impl FnOnce(&mut LedgerDb<'_>) -> Result<T>) -> Result<T> {
        let mut tx = Transaction::new(self);
        let out = f(&mut LedgerDb::new(&mut tx));
        match out {
            Ok(value) => {
                tx.commit();
                Ok(value)
            }
            Err(err) => {
                debug!(error = %err, staged = tx.staged_len(), "transaction rolled back");
                Err(err)
            }
        }
    }

    /// Events emitted by committed requests, oldest first.
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Number of state writes and deletions applied so far.
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }
}

impl Ledger for MemoryLedger {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.state.get(key).cloned())
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<()> {
        self.writes += 1;
        self.state.insert(key.to_string(), value);
        Ok(())
    }

    fn del_state(&mut self, key: &str) -> Result<()> {
        self.writes += 1;
        self.state.remove(key);
        Ok(())
    }

    fn keys_with_prefix(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<String>> {
        let keys = prefix_range(&self.state, prefix, start_after)
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(keys)
    }

    fn emit_event(&mut self, event: LedgerEvent) -> Result<()> {
        self.events.push(event);
        Ok(())
    }
}

/// Staged view over a [`MemoryLedger`].
///
/// Reads see the transaction's own writes. Nothing reaches the underlying
/// ledger until [`Transaction::commit`]; dropping the transaction discards it.
#[derive(Debug)]
pub struct Transaction<'a> {
    base: &'a mut MemoryLedger,
    /// `None` marks a deletion.
    staged: BTreeMap<String, Option<Vec<u8>>>,
    events: Vec<LedgerEvent>,
}

impl<'a> Transaction<'a> {
    pub fn new(base: &'a mut MemoryLedger) -> Self {
        Self {
            base,
            staged: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    pub fn commit(self) {
        let Transaction {
            base,
            staged,
            events,
        } = self;
        for (key, value) in staged {
            match value {
                Some(bytes) => {
                    base.state.insert(key, bytes);
                }
                None => {
                    base.state.remove(&key);
                }
            }
            base.writes += 1;
        }
        base.events.extend(events);
    }
}

impl Ledger for Transaction<'_> {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.staged.get(key) {
            Some(value) => Ok(value.clone()),
            None => self.base.get_state(key),
        }
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<()> {
        self.staged.insert(key.to_string(), Some(value));
        Ok(())
    }

    fn del_state(&mut self, key: &str) -> Result<()> {
        self.staged.insert(key.to_string(), None);
        Ok(())
    }

    fn keys_with_prefix(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<String>> {
        let mut merged: BTreeSet<&String> =
            prefix_range(&self.base.state, prefix, start_after).collect();
        for (key, value) in prefix_range_staged(&self.staged, prefix, start_after) {
            match value {
                Some(_) => {
                    merged.insert(key);
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    fn emit_event(&mut self, event: LedgerEvent) -> Result<()> {
        self.events.push(event);
        Ok(())
    }
}

fn lower_bound<'k>(prefix: &'k str, start_after: Option<&'k str>) -> Bound<&'k str> {
    match start_after {
        Some(after) if after >= prefix => Bound::Excluded(after),
        _ => Bound::Included(prefix),
    }
}

fn prefix_range<'m, V>(
    map: &'m BTreeMap<String, V>,
    prefix: &'m str,
    start_after: Option<&'m str>,
) -> impl Iterator<Item = &'m String> + 'm {
    map.range::<str, _>((lower_bound(prefix, start_after), Bound::Unbounded))
        .map(|(k, _)| k)
        .take_while(move |k| k.starts_with(prefix))
}

fn prefix_range_staged<'m>(
    map: &'m BTreeMap<String, Option<Vec<u8>>>,
    prefix: &'m str,
    start_after: Option<&'m str>,
) -> impl Iterator<Item = (&'m String, &'m Option<Vec<u8>>)> + 'm {
    map.range::<str, _>((lower_bound(prefix, start_after), Bound::Unbounded))
        .take_while(move |(k, _)| k.starts_with(prefix))
}
