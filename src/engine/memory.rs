//! # In-Memory Engine
//!
//! Snapshot-per-transaction engine backing the `:memory:` sentinel and the
//! transaction machinery of the snapshot-file engine.
//!
//! ## Transaction Model
//!
//! `begin` clones the committed store map under the state mutex; the clone
//! is the transaction's private workspace. Read transactions therefore see
//! a stable snapshot for their whole lifetime. A writable transaction
//! additionally holds the writer mutex, so there is at most one writer at a
//! time and commit can publish by swapping the workspace back in — all of a
//! writer's mutations become visible atomically, and a rollback is simply
//! dropping the workspace.
//!
//! ## Single-Threaded Workspaces
//!
//! Store handles share the workspace through `Rc<RefCell<..>>`: a
//! transaction is single-threaded cooperative, so handles never cross
//! threads. Scans snapshot the visited range before invoking the callback,
//! keeping the workspace borrow short.

use crate::document::stream::Flow;
use crate::engine::{Engine, EngineTransaction, Store};
use crate::errors::DbError;
use eyre::{ensure, Result};
use parking_lot::{Mutex, MutexGuard};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::rc::Rc;
use std::sync::Arc;

/// All stores of an engine: store name -> ordered key/value entries.
pub(crate) type StoreMap = BTreeMap<String, BTreeMap<Vec<u8>, Vec<u8>>>;

/// Hook run by the snapshot-file engine before a write commit publishes.
pub(crate) type PersistFn = Rc<dyn Fn(&StoreMap) -> Result<()>>;

pub struct MemoryEngine {
    state: Arc<Mutex<StoreMap>>,
    writer: Mutex<()>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreMap::new())),
            writer: Mutex::new(()),
        }
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for MemoryEngine {
    fn begin(&self, writable: bool) -> Result<Box<dyn EngineTransaction + '_>> {
        Ok(Box::new(MemTransaction::begin(
            Arc::clone(&self.state),
            writable.then(|| self.writer.lock()),
            writable,
            None,
        )))
    }
}

struct TxState {
    stores: StoreMap,
    writable: bool,
    discarded: bool,
}

pub(crate) struct MemTransaction<'e> {
    shared: Arc<Mutex<StoreMap>>,
    state: Rc<RefCell<TxState>>,
    persist: Option<PersistFn>,
    _write_guard: Option<MutexGuard<'e, ()>>,
}

impl<'e> MemTransaction<'e> {
    /// Snapshots the committed state into a private workspace. The write
    /// guard, when present, must already be held so the snapshot is current.
    pub(crate) fn begin(
        shared: Arc<Mutex<StoreMap>>,
        write_guard: Option<MutexGuard<'e, ()>>,
        writable: bool,
        persist: Option<PersistFn>,
    ) -> Self {
        let snapshot = shared.lock().clone();
        Self {
            shared,
            state: Rc::new(RefCell::new(TxState {
                stores: snapshot,
                writable,
                discarded: false,
            })),
            persist,
            _write_guard: write_guard,
        }
    }

    fn check_live(&self) -> Result<()> {
        ensure_live(&self.state)
    }

    fn check_writable(&self) -> Result<()> {
        self.check_live()?;
        if !self.state.borrow().writable {
            return Err(DbError::ReadOnlyTransaction.into());
        }
        Ok(())
    }
}

fn ensure_live(state: &Rc<RefCell<TxState>>) -> Result<()> {
    if state.borrow().discarded {
        return Err(DbError::TransactionDiscarded.into());
    }
    Ok(())
}

impl EngineTransaction for MemTransaction<'_> {
    fn create_store(&self, name: &str) -> Result<()> {
        self.check_writable()?;
        ensure!(!name.is_empty(), "store name must not be empty");
        let mut state = self.state.borrow_mut();
        if state.stores.contains_key(name) {
            return Err(DbError::StoreAlreadyExists.into());
        }
        state.stores.insert(name.to_string(), BTreeMap::new());
        Ok(())
    }

    fn get_store(&self, name: &str) -> Result<Box<dyn Store>> {
        self.check_live()?;
        if !self.state.borrow().stores.contains_key(name) {
            return Err(DbError::StoreNotFound.into());
        }
        Ok(Box::new(MemStore {
            state: Rc::clone(&self.state),
            name: name.to_string(),
        }))
    }

    fn drop_store(&self, name: &str) -> Result<()> {
        self.check_writable()?;
        if self.state.borrow_mut().stores.remove(name).is_none() {
            return Err(DbError::StoreNotFound.into());
        }
        Ok(())
    }

    fn list_stores(&self, prefix: &str) -> Result<Vec<String>> {
        self.check_live()?;
        Ok(self
            .state
            .borrow()
            .stores
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn commit(self: Box<Self>) -> Result<()> {
        self.check_live()?;
        let mut state = self.state.borrow_mut();
        state.discarded = true;
        if !state.writable {
            return Ok(());
        }
        if let Some(persist) = &self.persist {
            persist(&state.stores)?;
        }
        *self.shared.lock() = std::mem::take(&mut state.stores);
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<()> {
        self.check_live()?;
        self.state.borrow_mut().discarded = true;
        Ok(())
    }
}

impl Drop for MemTransaction<'_> {
    fn drop(&mut self) {
        // Invalidate surviving store handles even on a panic path.
        self.state.borrow_mut().discarded = true;
    }
}

struct MemStore {
    state: Rc<RefCell<TxState>>,
    name: String,
}

impl MemStore {
    fn with_entries<T>(
        &self,
        f: impl FnOnce(&BTreeMap<Vec<u8>, Vec<u8>>) -> Result<T>,
    ) -> Result<T> {
        ensure_live(&self.state)?;
        let state = self.state.borrow();
        let entries = state
            .stores
            .get(&self.name)
            .ok_or(DbError::StoreNotFound)?;
        f(entries)
    }

    /// Snapshot of a key range, taken so the callback runs without holding
    /// the workspace borrow.
    fn range_snapshot(
        &self,
        low: Bound<Vec<u8>>,
        high: Bound<Vec<u8>>,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.with_entries(|entries| {
            Ok(entries
                .range::<Vec<u8>, _>((low, high))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect())
        })
    }
}

impl Store for MemStore {
    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.with_entries(|entries| {
            entries
                .get(key)
                .cloned()
                .ok_or_else(|| DbError::KeyNotFound.into())
        })
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        ensure_live(&self.state)?;
        ensure!(!key.is_empty(), "key must not be empty");
        let mut state = self.state.borrow_mut();
        if !state.writable {
            return Err(DbError::ReadOnlyTransaction.into());
        }
        let entries = state
            .stores
            .get_mut(&self.name)
            .ok_or(DbError::StoreNotFound)?;
        entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        ensure_live(&self.state)?;
        let mut state = self.state.borrow_mut();
        if !state.writable {
            return Err(DbError::ReadOnlyTransaction.into());
        }
        let entries = state
            .stores
            .get_mut(&self.name)
            .ok_or(DbError::StoreNotFound)?;
        if entries.remove(key).is_none() {
            return Err(DbError::KeyNotFound.into());
        }
        Ok(())
    }

    fn ascend_greater_or_equal(
        &self,
        pivot: Option<&[u8]>,
        f: &mut dyn FnMut(&[u8], &[u8]) -> Result<Flow>,
    ) -> Result<()> {
        let low = match pivot {
            Some(p) => Bound::Included(p.to_vec()),
            None => Bound::Unbounded,
        };
        for (k, v) in self.range_snapshot(low, Bound::Unbounded)? {
            if let Flow::Stop = f(&k, &v)? {
                break;
            }
        }
        Ok(())
    }

    fn descend_less_or_equal(
        &self,
        pivot: Option<&[u8]>,
        f: &mut dyn FnMut(&[u8], &[u8]) -> Result<Flow>,
    ) -> Result<()> {
        let high = match pivot {
            Some(p) => Bound::Included(p.to_vec()),
            None => Bound::Unbounded,
        };
        for (k, v) in self.range_snapshot(Bound::Unbounded, high)?.into_iter().rev() {
            if let Flow::Stop = f(&k, &v)? {
                break;
            }
        }
        Ok(())
    }
}
