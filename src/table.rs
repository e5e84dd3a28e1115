//! # Table Layer
//!
//! A table is a record store `t:<name>` holding `(primary key, encoded
//! document)` entries, plus the secondary indexes attached to it. All
//! operations run inside the transaction that opened the table and keep
//! every index consistent with the record store.
//!
//! Primary keys come from the catalog: a declared primary key is evaluated
//! as a dot path on each inserted document and encoded with the key codec;
//! without a declaration, keys are allocated from the table's monotonic
//! sequence and encoded as `Int64`, so they order by insertion.

use crate::catalog::{PrimaryKey, TableConfigStore};
use crate::document::encoding::{document_bytes, EncodedDocument};
use crate::document::stream::Flow;
use crate::document::{DotPath, FieldBuffer};
use crate::encoding::key::{encode_i64, encode_value};
use crate::engine::Store;
use crate::errors::DbError;
use crate::index::Index;
use crate::types::Value;
use eyre::{bail, Result};

pub struct Table {
    name: String,
    store: Box<dyn Store>,
    cfg_store: TableConfigStore,
    indexes: Vec<Index>,
}

impl Table {
    pub(crate) fn new(
        name: String,
        store: Box<dyn Store>,
        cfg_store: TableConfigStore,
        indexes: Vec<Index>,
    ) -> Self {
        Self {
            name,
            store,
            cfg_store,
            indexes,
        }
    }

    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    /// Inserts a document and returns its primary key. Fails with
    /// `DuplicateDocument` when the key already exists or a unique index
    /// rejects the indexed value.
    pub fn insert(&self, doc: &FieldBuffer<'_>) -> Result<Vec<u8>> {
        let key = self.build_key(doc)?;

        match self.store.get(&key) {
            Ok(_) => return Err(DbError::DuplicateDocument.into()),
            Err(err) if DbError::KeyNotFound.is(&err) => {}
            Err(err) => return Err(err),
        }

        self.store.put(&key, &document_bytes(doc))?;

        for index in &self.indexes {
            let value = indexed_value(doc, index.path());
            index.set(&value, &key)?;
        }

        tracing::trace!(table = %self.name, key_len = key.len(), "inserted document");
        Ok(key)
    }

    fn build_key(&self, doc: &FieldBuffer<'_>) -> Result<Vec<u8>> {
        let cfg = self.cfg_store.get(&self.name)?;
        match &cfg.primary_key {
            Some(pk) => primary_key_bytes(doc, pk),
            None => {
                let mut cfg = cfg;
                cfg.last_key += 1;
                self.cfg_store.replace(&self.name, &cfg)?;
                let mut key = Vec::with_capacity(8);
                encode_i64(cfg.last_key, &mut key);
                Ok(key)
            }
        }
    }

    /// Returns the document stored under `key`, detached from the store.
    pub fn get_document(&self, key: &[u8]) -> Result<FieldBuffer<'static>> {
        let bytes = self.get_raw(key)?;
        let doc = EncodedDocument::new(&bytes).decode()?.into_owned();
        Ok(doc)
    }

    fn get_raw(&self, key: &[u8]) -> Result<Vec<u8>> {
        match self.store.get(key) {
            Ok(bytes) => Ok(bytes),
            Err(err) if DbError::KeyNotFound.is(&err) => {
                Err(DbError::DocumentNotFound.into())
            }
            Err(err) => Err(err),
        }
    }

    /// Deletes the document under `key`, cleaning its index entries first.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        let bytes = self.get_raw(key)?;
        let doc = EncodedDocument::new(&bytes).decode()?;

        for index in &self.indexes {
            let value = indexed_value(&doc, index.path());
            index.delete(&value, key)?;
        }

        self.store.delete(key)?;
        tracing::trace!(table = %self.name, "deleted document");
        Ok(())
    }

    /// Replaces the document under `key`, preserving the key. Index entries
    /// are rewritten even when the indexed value did not change.
    pub fn replace(&self, key: &[u8], doc: &FieldBuffer<'_>) -> Result<()> {
        let old_bytes = self.get_raw(key)?;
        let old_doc = EncodedDocument::new(&old_bytes).decode()?;

        for index in &self.indexes {
            let value = indexed_value(&old_doc, index.path());
            index.delete(&value, key)?;
        }

        self.store.put(key, &document_bytes(doc))?;

        for index in &self.indexes {
            let value = indexed_value(doc, index.path());
            index.set(&value, key)?;
        }
        Ok(())
    }

    /// Ordered scan by key, ascending, from `start` (inclusive) or the
    /// beginning. The callback receives the key and a lazily-decoded view.
    pub fn iterate(
        &self,
        start: Option<&[u8]>,
        f: &mut dyn FnMut(&[u8], EncodedDocument<'_>) -> Result<Flow>,
    ) -> Result<()> {
        self.store
            .ascend_greater_or_equal(start, &mut |key, bytes| {
                f(key, EncodedDocument::new(bytes))
            })
    }
}

/// Value of the indexed field inside `doc`; a missing selector indexes as
/// NULL.
fn indexed_value<'d>(doc: &FieldBuffer<'d>, path: &DotPath) -> Value<'d> {
    doc.get_path(path).cloned().unwrap_or(Value::Null)
}

fn primary_key_bytes(doc: &FieldBuffer<'_>, pk: &PrimaryKey) -> Result<Vec<u8>> {
    let path = DotPath::parse(&pk.path)?;
    let value = match doc.get_path(&path) {
        Some(v) if !v.is_null() => v,
        _ => bail!("missing or null primary key field '{}'", pk.path),
    };
    let converted = value.convert_to(pk.kind)?;
    let mut key = Vec::new();
    encode_value(&converted, &mut key)?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{
        IndexConfig, TableConfig, INDEX_CONFIG_STORE_NAME, TABLE_CONFIG_STORE_NAME,
    };
    use crate::engine::memory::MemoryEngine;
    use crate::engine::{Engine, EngineTransaction};
    use crate::types::ValueKind;

    struct Fixture<'e> {
        tx: Box<dyn EngineTransaction + 'e>,
    }

    impl<'e> Fixture<'e> {
        fn new(engine: &'e MemoryEngine, cfg: TableConfig) -> Self {
            let tx = engine.begin(true).unwrap();
            tx.create_store(TABLE_CONFIG_STORE_NAME).unwrap();
            tx.create_store(INDEX_CONFIG_STORE_NAME).unwrap();
            tx.create_store("t:test").unwrap();
            TableConfigStore::new(tx.get_store(TABLE_CONFIG_STORE_NAME).unwrap())
                .insert("test", &cfg)
                .unwrap();
            Self { tx }
        }

        fn table(&self) -> Table {
            self.table_with_indexes(&[])
        }

        fn table_with_indexes(&self, indexes: &[(&str, &str, bool)]) -> Table {
            let built = indexes
                .iter()
                .map(|(name, field, unique)| {
                    let store_name = format!("i:{}", name);
                    if self.tx.get_store(&store_name).is_err() {
                        self.tx.create_store(&store_name).unwrap();
                    }
                    Index::new(
                        IndexConfig {
                            index_name: name.to_string(),
                            table_name: "test".into(),
                            field_path: field.to_string(),
                            unique: *unique,
                        },
                        self.tx.get_store(&store_name).unwrap(),
                    )
                    .unwrap()
                })
                .collect();
            Table::new(
                "test".into(),
                self.tx.get_store("t:test").unwrap(),
                TableConfigStore::new(self.tx.get_store(TABLE_CONFIG_STORE_NAME).unwrap()),
                built,
            )
        }
    }

    fn doc(pairs: &[(&str, Value<'static>)]) -> FieldBuffer<'static> {
        let mut fb = FieldBuffer::new();
        for (name, value) in pairs {
            fb.add(name.to_string(), value.clone());
        }
        fb
    }

    #[test]
    fn auto_keys_are_monotonic_and_iteration_follows_them() {
        let engine = MemoryEngine::new();
        let fx = Fixture::new(&engine, TableConfig::default());
        let table = fx.table();

        let k1 = table.insert(&doc(&[("age", Value::Int64(0))])).unwrap();
        let k2 = table.insert(&doc(&[("age", Value::Int64(1))])).unwrap();
        let k3 = table.insert(&doc(&[("age", Value::Int64(2))])).unwrap();
        assert!(k1 < k2 && k2 < k3);

        let mut ages = Vec::new();
        table
            .iterate(None, &mut |_, view| {
                ages.push(view.get_by_field("age").unwrap().unwrap().into_owned());
                Ok(Flow::Continue)
            })
            .unwrap();
        assert_eq!(
            ages,
            [Value::Int64(0), Value::Int64(1), Value::Int64(2)]
        );
    }

    #[test]
    fn iterate_from_a_start_key_is_inclusive() {
        let engine = MemoryEngine::new();
        let fx = Fixture::new(&engine, TableConfig::default());
        let table = fx.table();

        for i in 0..4 {
            table.insert(&doc(&[("i", Value::Int64(i))])).unwrap();
        }
        let start = {
            let mut k = Vec::new();
            encode_i64(3, &mut k);
            k
        };
        let mut seen = Vec::new();
        table
            .iterate(Some(start.as_slice()), &mut |_, view| {
                seen.push(view.get_by_field("i").unwrap().unwrap().into_owned());
                Ok(Flow::Continue)
            })
            .unwrap();
        assert_eq!(seen, [Value::Int64(2), Value::Int64(3)]);
    }

    #[test]
    fn declared_primary_key_is_evaluated_and_converted() {
        let engine = MemoryEngine::new();
        let fx = Fixture::new(
            &engine,
            TableConfig {
                primary_key: Some(PrimaryKey {
                    path: "id".into(),
                    kind: ValueKind::Text,
                }),
                last_key: 0,
            },
        );
        let table = fx.table();

        let key = table
            .insert(&doc(&[("id", Value::from("x")), ("n", Value::Int64(1))]))
            .unwrap();
        assert_eq!(key, b"x".to_vec());

        let err = table
            .insert(&doc(&[("id", Value::from("x")), ("n", Value::Int64(2))]))
            .unwrap_err();
        assert!(DbError::DuplicateDocument.is(&err));

        assert!(table.insert(&doc(&[("n", Value::Int64(3))])).is_err());
    }

    #[test]
    fn get_delete_and_missing_documents() {
        let engine = MemoryEngine::new();
        let fx = Fixture::new(&engine, TableConfig::default());
        let table = fx.table();

        let key = table.insert(&doc(&[("a", Value::Int64(1))])).unwrap();
        let loaded = table.get_document(&key).unwrap();
        assert_eq!(loaded.get("a"), Some(&Value::Int64(1)));

        table.delete(&key).unwrap();
        assert!(DbError::DocumentNotFound.is(&table.get_document(&key).unwrap_err()));
        assert!(DbError::DocumentNotFound.is(&table.delete(&key).unwrap_err()));
    }

    fn index_entries(table: &Table) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut entries = Vec::new();
        table.indexes()[0]
            .ascend_greater_or_equal(None, &mut |k, pk| {
                entries.push((k.to_vec(), pk.to_vec()));
                Ok(Flow::Continue)
            })
            .unwrap();
        entries
    }

    #[test]
    fn insert_delete_replace_keep_indexes_consistent() {
        let engine = MemoryEngine::new();
        let fx = Fixture::new(&engine, TableConfig::default());
        let table = fx.table_with_indexes(&[("idx_age", "age", false)]);

        let k1 = table.insert(&doc(&[("age", Value::Int64(30))])).unwrap();
        let k2 = table.insert(&doc(&[("age", Value::Int64(10))])).unwrap();
        let entries = index_entries(&table);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].1, k2, "age 10 sorts first");
        assert_eq!(entries[1].1, k1);

        // Replace with a changed indexed value rewrites the entry.
        table
            .replace(&k1, &doc(&[("age", Value::Int64(5))]))
            .unwrap();
        let entries = index_entries(&table);
        assert_eq!(entries[0].1, k1, "age 5 now sorts first");

        table.delete(&k2).unwrap();
        assert_eq!(index_entries(&table).len(), 1);
    }

    #[test]
    fn documents_without_the_indexed_field_index_as_null() {
        let engine = MemoryEngine::new();
        let fx = Fixture::new(&engine, TableConfig::default());
        let table = fx.table_with_indexes(&[("idx_age", "age", false)]);

        let k = table.insert(&doc(&[("name", Value::from("bob"))])).unwrap();
        let entries = index_entries(&table);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0[0], 0x00, "null sentinel tag");
        assert_eq!(entries[0].1, k);
    }

    #[test]
    fn unique_index_violation_aborts_the_insert() {
        let engine = MemoryEngine::new();
        let fx = Fixture::new(&engine, TableConfig::default());
        let table = fx.table_with_indexes(&[("idx_email", "email", true)]);

        table
            .insert(&doc(&[("email", Value::from("a"))]))
            .unwrap();
        let err = table
            .insert(&doc(&[("email", Value::from("a"))]))
            .unwrap_err();
        assert!(DbError::DuplicateDocument.is(&err));
    }

    #[test]
    fn replace_on_a_missing_key_fails() {
        let engine = MemoryEngine::new();
        let fx = Fixture::new(&engine, TableConfig::default());
        let table = fx.table();
        let err = table
            .replace(b"nope", &doc(&[("a", Value::Int64(1))]))
            .unwrap_err();
        assert!(DbError::DocumentNotFound.is(&err));
    }
}
