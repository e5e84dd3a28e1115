//! # Database API
//!
//! [`Database`] is the embeddable entry point: open a storage engine, run
//! SQL, manage transactions.
//!
//! ```ignore
//! use inkdb::{Database, Param};
//!
//! let db = Database::open(":memory:")?;
//! db.execute("CREATE TABLE users (id TEXT PRIMARY KEY)", &[])?;
//! db.execute("INSERT INTO users (id, age) VALUES ('x', ?)", &[Param::positional(34i64)])?;
//! let rows = db.query("SELECT age FROM users WHERE id = 'x'", &[])?;
//! ```
//!
//! `open(":memory:")` runs fully in memory; any other path opens the
//! snapshot-file engine rooted there. Custom backends plug in through
//! [`Database::new`].
//!
//! ## Transactions
//!
//! `execute` wraps each statement in an automatic transaction of the
//! appropriate kind, committed on success and rolled back on any error.
//! [`Database::begin`] hands out explicit transactions instead; exactly one
//! of `commit`/`rollback` should be called, and a dropped transaction rolls
//! back.

use crate::catalog::{
    build_index_name, table_store_name, IndexConfig, IndexConfigStore, TableConfig,
    TableConfigStore, INDEX_CONFIG_STORE_NAME, TABLE_CONFIG_STORE_NAME,
};
use crate::document::stream::Flow;
use crate::document::FieldBuffer;
use crate::engine::file::FileEngine;
use crate::engine::memory::MemoryEngine;
use crate::engine::{Engine, EngineTransaction, Store};
use crate::errors::DbError;
use crate::index::Index;
use crate::sql::executor::{run_statement, ExecuteResult};
use crate::sql::expr::Param;
use crate::sql::parser::Parser;
use crate::table::Table;
use crate::types::Value;
use bumpalo::Bump;
use eyre::{bail, ensure, Result};

/// Sentinel path selecting the in-memory engine.
pub const MEMORY_PATH: &str = ":memory:";

pub struct Database {
    engine: Box<dyn Engine>,
}

impl Database {
    /// Opens a database at `path`. `":memory:"` selects the in-memory
    /// engine; any other path opens the snapshot-file engine rooted there.
    pub fn open(path: &str) -> Result<Database> {
        tracing::debug!(path, "opening database");
        let engine: Box<dyn Engine> = if path == MEMORY_PATH {
            Box::new(MemoryEngine::new())
        } else {
            Box::new(FileEngine::open(path)?)
        };
        Ok(Self { engine })
    }

    /// Wraps a custom storage engine.
    pub fn new(engine: impl Engine + 'static) -> Database {
        Self {
            engine: Box::new(engine),
        }
    }

    pub fn begin(&self, writable: bool) -> Result<Transaction<'_>> {
        let inner = self.engine.begin(writable)?;
        tracing::trace!(writable, "began transaction");
        Ok(Transaction {
            inner: Some(inner),
            writable,
        })
    }

    /// Parses and runs one statement inside an automatic transaction:
    /// committed on success, rolled back on any error.
    pub fn execute(&self, sql: &str, params: &[Param]) -> Result<ExecuteResult> {
        let arena = Bump::new();
        let mut parser = Parser::new(sql, &arena);
        let stmt = parser.parse_statement()?;
        parser.finish()?;

        let tx = self.begin(stmt.is_mutation())?;
        match run_statement(&stmt, &tx, params) {
            Ok(result) => {
                tx.commit()?;
                Ok(result)
            }
            Err(err) => {
                let _ = tx.rollback();
                Err(err)
            }
        }
    }

    /// Runs a SELECT and returns its rows.
    pub fn query(&self, sql: &str, params: &[Param]) -> Result<Vec<FieldBuffer<'static>>> {
        match self.execute(sql, params)? {
            ExecuteResult::Select { rows } => Ok(rows),
            _ => bail!("statement does not return rows"),
        }
    }
}

/// A database-level transaction wrapping an engine transaction, plus the
/// catalog and table plumbing every statement needs.
pub struct Transaction<'e> {
    inner: Option<Box<dyn EngineTransaction + 'e>>,
    writable: bool,
}

impl<'e> Transaction<'e> {
    pub fn writable(&self) -> bool {
        self.writable
    }

    fn engine_tx(&self) -> Result<&(dyn EngineTransaction + 'e)> {
        match &self.inner {
            Some(tx) => Ok(tx.as_ref()),
            None => Err(DbError::TransactionDiscarded.into()),
        }
    }

    fn require_writable(&self) -> Result<()> {
        if self.writable {
            Ok(())
        } else {
            Err(DbError::ReadOnlyTransaction.into())
        }
    }

    pub fn commit(mut self) -> Result<()> {
        let tx = self
            .inner
            .take()
            .ok_or(DbError::TransactionDiscarded)?;
        tracing::trace!("committing transaction");
        tx.commit()
    }

    pub fn rollback(mut self) -> Result<()> {
        let tx = self
            .inner
            .take()
            .ok_or(DbError::TransactionDiscarded)?;
        tracing::trace!("rolling back transaction");
        tx.rollback()
    }

    /// Parses and runs one statement inside this transaction.
    pub fn execute(&self, sql: &str, params: &[Param]) -> Result<ExecuteResult> {
        let arena = Bump::new();
        let mut parser = Parser::new(sql, &arena);
        let stmt = parser.parse_statement()?;
        parser.finish()?;
        run_statement(&stmt, self, params)
    }

    /// Runs a SELECT inside this transaction and returns its rows.
    pub fn query(&self, sql: &str, params: &[Param]) -> Result<Vec<FieldBuffer<'static>>> {
        match self.execute(sql, params)? {
            ExecuteResult::Select { rows } => Ok(rows),
            _ => bail!("statement does not return rows"),
        }
    }

    /// Opens a store, creating it first when this transaction may write.
    /// The single bootstrap point for the reserved catalog stores.
    fn store_or_create(&self, name: &str) -> Result<Box<dyn Store>> {
        let tx = self.engine_tx()?;
        match tx.get_store(name) {
            Ok(store) => Ok(store),
            Err(err) if DbError::StoreNotFound.is(&err) && self.writable => {
                tx.create_store(name)?;
                tx.get_store(name)
            }
            Err(err) => Err(err),
        }
    }

    fn table_configs(&self) -> Result<TableConfigStore> {
        Ok(TableConfigStore::new(
            self.store_or_create(TABLE_CONFIG_STORE_NAME)?,
        ))
    }

    fn index_configs(&self) -> Result<IndexConfigStore> {
        Ok(IndexConfigStore::new(
            self.store_or_create(INDEX_CONFIG_STORE_NAME)?,
        ))
    }

    pub fn create_table(&self, name: &str, cfg: &TableConfig) -> Result<()> {
        self.require_writable()?;
        ensure!(!name.is_empty(), "table name must not be empty");
        self.table_configs()?.insert(name, cfg)?;
        self.engine_tx()?.create_store(&table_store_name(name))?;
        tracing::debug!(table = name, "created table");
        Ok(())
    }

    /// Opens the table `name` with all of its indexes.
    pub fn table(&self, name: &str) -> Result<Table> {
        let configs = match self.table_configs() {
            // A read-only transaction on a database with no catalog yet.
            Err(err) if DbError::StoreNotFound.is(&err) => {
                return Err(DbError::TableNotFound.into())
            }
            other => other?,
        };
        configs.get(name)?;

        let tx = self.engine_tx()?;
        let store = tx.get_store(&table_store_name(name))?;

        let index_cfgs = match self.index_configs() {
            Err(err) if DbError::StoreNotFound.is(&err) => Vec::new(),
            other => other?.list_for_table(name)?,
        };
        let indexes = index_cfgs
            .into_iter()
            .map(|cfg| {
                let store = tx.get_store(&build_index_name(&cfg.index_name))?;
                Index::new(cfg, store)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Table::new(name.to_string(), store, configs, indexes))
    }

    pub fn drop_table(&self, name: &str) -> Result<()> {
        self.require_writable()?;
        self.table_configs()?.delete(name)?;

        let index_configs = self.index_configs()?;
        let tx = self.engine_tx()?;
        for cfg in index_configs.list_for_table(name)? {
            index_configs.delete(&cfg.index_name)?;
            tx.drop_store(&build_index_name(&cfg.index_name))?;
        }

        tx.drop_store(&table_store_name(name))?;
        tracing::debug!(table = name, "dropped table");
        Ok(())
    }

    /// Creates an index and backfills it from the table's existing records
    /// in a second pass.
    pub fn create_index(&self, cfg: &IndexConfig) -> Result<()> {
        self.require_writable()?;
        self.table_configs()?.get(&cfg.table_name)?;
        self.index_configs()?.insert(cfg)?;

        let tx = self.engine_tx()?;
        let store_name = build_index_name(&cfg.index_name);
        tx.create_store(&store_name)?;
        let index = Index::new(cfg.clone(), tx.get_store(&store_name)?)?;

        let table = Table::new(
            cfg.table_name.clone(),
            tx.get_store(&table_store_name(&cfg.table_name))?,
            self.table_configs()?,
            Vec::new(),
        );
        let mut pending: Vec<(Vec<u8>, Value<'static>)> = Vec::new();
        table.iterate(None, &mut |key, view| {
            let doc = view.decode()?;
            let value = doc
                .get_path(index.path())
                .cloned()
                .unwrap_or(Value::Null)
                .into_owned();
            pending.push((key.to_vec(), value));
            Ok(Flow::Continue)
        })?;
        let entries = pending.len();
        for (key, value) in &pending {
            index.set(value, key)?;
        }

        tracing::debug!(
            index = %cfg.index_name,
            table = %cfg.table_name,
            entries,
            "created index"
        );
        Ok(())
    }

    pub fn drop_index(&self, name: &str) -> Result<()> {
        self.require_writable()?;
        self.index_configs()?.delete(name)?;
        self.engine_tx()?.drop_store(&build_index_name(name))?;
        tracing::debug!(index = name, "dropped index");
        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if let Some(tx) = self.inner.take() {
            let _ = tx.rollback();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    #[test]
    fn execute_runs_inside_an_automatic_transaction() {
        let db = Database::open(":memory:").unwrap();
        db.execute("CREATE TABLE foo", &[]).unwrap();
        db.execute("INSERT INTO foo (a) VALUES (1)", &[]).unwrap();

        let rows = db.query("SELECT a FROM foo", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("a"), Some(&Value::Int64(1)));
    }

    #[test]
    fn failed_statements_roll_back_their_transaction() {
        let db = Database::open(":memory:").unwrap();
        db.execute("CREATE TABLE users (id TEXT PRIMARY KEY)", &[])
            .unwrap();
        db.execute("INSERT INTO users (id) VALUES ('x')", &[])
            .unwrap();

        // The second row duplicates the first; neither row of this
        // statement survives.
        let err = db
            .execute("INSERT INTO users (id) VALUES ('y'), ('x')", &[])
            .unwrap_err();
        assert!(DbError::DuplicateDocument.is(&err));

        let rows = db.query("SELECT id FROM users", &[]).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn explicit_transactions_control_visibility() {
        let db = Database::open(":memory:").unwrap();

        let tx = db.begin(true).unwrap();
        tx.execute("CREATE TABLE foo", &[]).unwrap();
        tx.execute("INSERT INTO foo (a) VALUES (1)", &[]).unwrap();
        // Visible to the owning transaction before commit.
        assert_eq!(tx.query("SELECT a FROM foo", &[]).unwrap().len(), 1);
        tx.commit().unwrap();

        assert_eq!(db.query("SELECT a FROM foo", &[]).unwrap().len(), 1);
    }

    #[test]
    fn dropped_transactions_roll_back() {
        let db = Database::open(":memory:").unwrap();
        {
            let tx = db.begin(true).unwrap();
            tx.execute("CREATE TABLE foo", &[]).unwrap();
        }
        let err = db.query("SELECT a FROM foo", &[]).unwrap_err();
        assert!(DbError::TableNotFound.is(&err));
    }

    #[test]
    fn query_rejects_non_select_statements() {
        let db = Database::open(":memory:").unwrap();
        assert!(db.query("CREATE TABLE foo", &[]).is_err());
    }

    #[test]
    fn read_transactions_cannot_run_ddl() {
        let db = Database::open(":memory:").unwrap();
        let tx = db.begin(false).unwrap();
        let err = tx.execute("CREATE TABLE foo", &[]).unwrap_err();
        assert!(DbError::ReadOnlyTransaction.is(&err));
    }

    #[test]
    fn queries_on_missing_tables_fail_typed() {
        let db = Database::open(":memory:").unwrap();
        let err = db.query("SELECT a FROM nothing", &[]).unwrap_err();
        assert!(DbError::TableNotFound.is(&err));
    }
}
