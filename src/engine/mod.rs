//! # Storage Engine Interface
//!
//! The contract the database core consumes: ordered key/value stores,
//! grouped into named namespaces, scoped to transactions. Concrete backends
//! implement these three traits and are otherwise opaque; the crate ships
//! an in-memory engine and a snapshot-file engine.
//!
//! ## Guarantees Required From Implementations
//!
//! - At most one write transaction at a time; read transactions are
//!   concurrent and observe a snapshot taken at `begin`.
//! - Keys within a store are strictly ordered by unsigned lexicographic
//!   byte comparison.
//! - Put-after-delete and delete-after-put within one transaction are
//!   last-writer-wins.
//! - A writer's commit publishes all of its writes atomically.
//!
//! ## Store Handles
//!
//! `get_store` returns an owned handle sharing the transaction's state.
//! Handles are runtime-checked capabilities: once the transaction has
//! committed or rolled back, every operation on a surviving handle fails
//! with [`DbError::TransactionDiscarded`](crate::errors::DbError). This is
//! how in-flight iteration observes cancellation.

pub mod file;
pub mod memory;

use crate::document::stream::Flow;
use eyre::Result;

/// A storage backend capable of opening transactions.
pub trait Engine {
    /// Opens a transaction. A writable transaction blocks until it is the
    /// only writer.
    fn begin(&self, writable: bool) -> Result<Box<dyn EngineTransaction + '_>>;
}

/// A transaction over named stores. Exactly one of `commit`/`rollback`
/// should be called; implementations roll back on drop.
pub trait EngineTransaction {
    /// Creates a store. Fails with `StoreAlreadyExists` if present.
    fn create_store(&self, name: &str) -> Result<()>;

    /// Opens a handle to a store. Fails with `StoreNotFound` if absent.
    fn get_store(&self, name: &str) -> Result<Box<dyn Store>>;

    /// Drops a store and its contents. Fails with `StoreNotFound` if absent.
    fn drop_store(&self, name: &str) -> Result<()>;

    /// Names of all stores starting with `prefix`, in lexicographic order.
    fn list_stores(&self, prefix: &str) -> Result<Vec<String>>;

    fn commit(self: Box<Self>) -> Result<()>;

    fn rollback(self: Box<Self>) -> Result<()>;
}

/// An ordered key/value namespace within a transaction.
pub trait Store {
    /// Fails with `KeyNotFound` if the key is absent.
    fn get(&self, key: &[u8]) -> Result<Vec<u8>>;

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Fails with `KeyNotFound` if the key is absent.
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Visits entries with `key >= pivot` (or all entries when `pivot` is
    /// `None`) in ascending key order until `f` returns [`Flow::Stop`].
    fn ascend_greater_or_equal(
        &self,
        pivot: Option<&[u8]>,
        f: &mut dyn FnMut(&[u8], &[u8]) -> Result<Flow>,
    ) -> Result<()>;

    /// Visits entries with `key <= pivot` (or all entries when `pivot` is
    /// `None`) in descending key order until `f` returns [`Flow::Stop`].
    fn descend_less_or_equal(
        &self,
        pivot: Option<&[u8]>,
        f: &mut dyn FnMut(&[u8], &[u8]) -> Result<Flow>,
    ) -> Result<()>;
}
