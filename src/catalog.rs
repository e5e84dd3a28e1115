//! # Catalog
//!
//! Process-wide metadata lives in two reserved stores, created lazily by
//! the first transaction that needs them:
//!
//! - `__genji_tables`: table name -> encoded [`TableConfig`]
//! - `__genji_indexes`: `i:<index>` -> encoded [`IndexConfig`]
//!
//! These names and the `t:`/`i:` store prefixes are part of the on-disk
//! external interface; applications must not create stores under them.
//!
//! Catalog entries are created by CREATE TABLE / CREATE INDEX, mutated only
//! by the table layer (the auto-key sequence) or by DROP, and destroyed by
//! DROP. The `last_key` counter is read, incremented and written back inside
//! the owning write transaction, so a rollback restores it.

use crate::document::encoding::{document_bytes, EncodedDocument};
use crate::document::FieldBuffer;
use crate::engine::Store;
use crate::errors::DbError;
use crate::types::{Value, ValueKind};
use eyre::Result;

/// Store holding one [`TableConfig`] per table.
pub const TABLE_CONFIG_STORE_NAME: &str = "__genji_tables";

/// Store holding one [`IndexConfig`] per index.
pub const INDEX_CONFIG_STORE_NAME: &str = "__genji_indexes";

/// Name of the record store of `table`.
pub fn table_store_name(table: &str) -> String {
    format!("t:{}", table)
}

/// Stable textual encoding of an index name; doubles as the index's store
/// name and its key in the index config store.
pub fn build_index_name(index: &str) -> String {
    format!("i:{}", index)
}

/// Declared primary key of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKey {
    /// Dot path of the key field inside inserted documents.
    pub path: String,
    pub kind: ValueKind,
}

/// Per-table catalog entry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableConfig {
    pub primary_key: Option<PrimaryKey>,
    /// Auto-key sequence; last value handed out.
    pub(crate) last_key: i64,
}

impl TableConfig {
    fn to_document(&self) -> FieldBuffer<'static> {
        let (pk_name, pk_kind) = match &self.primary_key {
            Some(pk) => (pk.path.clone(), pk.kind.as_u8()),
            None => (String::new(), ValueKind::Null.as_u8()),
        };
        let mut doc = FieldBuffer::new();
        doc.add("PrimaryKeyName", Value::from(pk_name));
        doc.add("PrimaryKeyType", Value::Uint8(pk_kind));
        doc.add("LastKey", Value::Int64(self.last_key));
        doc
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let doc = EncodedDocument::new(bytes);

        let pk_name = match doc.get_by_field("PrimaryKeyName")? {
            Some(v) => match v.convert_to(ValueKind::Text)? {
                Value::Text(s) => s.into_owned(),
                _ => unreachable!(),
            },
            None => String::new(),
        };
        let pk_kind = match doc.get_by_field("PrimaryKeyType")? {
            Some(v) => match v.convert_to(ValueKind::Uint8)? {
                Value::Uint8(n) => n,
                _ => unreachable!(),
            },
            None => 0,
        };
        let last_key = match doc.get_by_field("LastKey")? {
            Some(v) => match v.convert_to(ValueKind::Int64)? {
                Value::Int64(n) => n,
                _ => unreachable!(),
            },
            None => 0,
        };

        let primary_key = if pk_name.is_empty() {
            None
        } else {
            Some(PrimaryKey {
                path: pk_name,
                kind: ValueKind::from_u8(pk_kind)?,
            })
        };

        Ok(Self {
            primary_key,
            last_key,
        })
    }
}

/// Per-index catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    pub index_name: String,
    pub table_name: String,
    /// Dot path of the indexed field.
    pub field_path: String,
    pub unique: bool,
}

impl IndexConfig {
    fn to_document(&self) -> FieldBuffer<'static> {
        let mut doc = FieldBuffer::new();
        doc.add("IndexName", Value::from(self.index_name.clone()));
        doc.add("TableName", Value::from(self.table_name.clone()));
        doc.add("FieldPath", Value::from(self.field_path.clone()));
        doc.add("Unique", Value::Bool(self.unique));
        doc
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let doc = EncodedDocument::new(bytes);
        let text = |name: &str| -> Result<String> {
            match doc.get_by_field(name)? {
                Some(Value::Text(s)) => Ok(s.into_owned()),
                other => Err(eyre::eyre!("malformed index config field {}: {:?}", name, other)),
            }
        };
        Ok(Self {
            index_name: text("IndexName")?,
            table_name: text("TableName")?,
            field_path: text("FieldPath")?,
            unique: matches!(doc.get_by_field("Unique")?, Some(Value::Bool(true))),
        })
    }
}

fn key_not_found(err: &eyre::Report) -> bool {
    DbError::KeyNotFound.is(err)
}

/// Typed view over `__genji_tables`.
pub struct TableConfigStore {
    store: Box<dyn Store>,
}

impl TableConfigStore {
    pub fn new(store: Box<dyn Store>) -> Self {
        Self { store }
    }

    pub fn insert(&self, table_name: &str, cfg: &TableConfig) -> Result<()> {
        match self.store.get(table_name.as_bytes()) {
            Ok(_) => return Err(DbError::TableAlreadyExists.into()),
            Err(err) if key_not_found(&err) => {}
            Err(err) => return Err(err),
        }
        self.store
            .put(table_name.as_bytes(), &document_bytes(&cfg.to_document()))
    }

    pub fn replace(&self, table_name: &str, cfg: &TableConfig) -> Result<()> {
        match self.store.get(table_name.as_bytes()) {
            Ok(_) => {}
            Err(err) if key_not_found(&err) => return Err(DbError::TableNotFound.into()),
            Err(err) => return Err(err),
        }
        self.store
            .put(table_name.as_bytes(), &document_bytes(&cfg.to_document()))
    }

    pub fn get(&self, table_name: &str) -> Result<TableConfig> {
        match self.store.get(table_name.as_bytes()) {
            Ok(bytes) => TableConfig::from_bytes(&bytes),
            Err(err) if key_not_found(&err) => Err(DbError::TableNotFound.into()),
            Err(err) => Err(err),
        }
    }

    pub fn delete(&self, table_name: &str) -> Result<()> {
        match self.store.delete(table_name.as_bytes()) {
            Ok(()) => Ok(()),
            Err(err) if key_not_found(&err) => Err(DbError::TableNotFound.into()),
            Err(err) => Err(err),
        }
    }
}

/// Typed view over `__genji_indexes`.
pub struct IndexConfigStore {
    store: Box<dyn Store>,
}

impl IndexConfigStore {
    pub fn new(store: Box<dyn Store>) -> Self {
        Self { store }
    }

    pub fn insert(&self, cfg: &IndexConfig) -> Result<()> {
        let key = build_index_name(&cfg.index_name);
        match self.store.get(key.as_bytes()) {
            Ok(_) => return Err(DbError::IndexAlreadyExists.into()),
            Err(err) if key_not_found(&err) => {}
            Err(err) => return Err(err),
        }
        self.store
            .put(key.as_bytes(), &document_bytes(&cfg.to_document()))
    }

    pub fn get(&self, index_name: &str) -> Result<IndexConfig> {
        let key = build_index_name(index_name);
        match self.store.get(key.as_bytes()) {
            Ok(bytes) => IndexConfig::from_bytes(&bytes),
            Err(err) if key_not_found(&err) => Err(DbError::IndexNotFound.into()),
            Err(err) => Err(err),
        }
    }

    pub fn delete(&self, index_name: &str) -> Result<()> {
        let key = build_index_name(index_name);
        match self.store.delete(key.as_bytes()) {
            Ok(()) => Ok(()),
            Err(err) if key_not_found(&err) => Err(DbError::IndexNotFound.into()),
            Err(err) => Err(err),
        }
    }

    /// All index configs attached to `table_name`.
    pub fn list_for_table(&self, table_name: &str) -> Result<Vec<IndexConfig>> {
        use crate::document::stream::Flow;
        let mut configs = Vec::new();
        self.store.ascend_greater_or_equal(None, &mut |_, bytes| {
            let cfg = IndexConfig::from_bytes(bytes)?;
            if cfg.table_name == table_name {
                configs.push(cfg);
            }
            Ok(Flow::Continue)
        })?;
        Ok(configs)
    }
}
