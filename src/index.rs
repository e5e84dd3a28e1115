//! # Secondary Indexes
//!
//! An index maps the key-encoded value of one document field to the owning
//! record's primary key. Entries use the tagged key encoding, so values of
//! different kinds coexist ordered by kind tag, and a NULL field indexes
//! under the bare sentinel tag that sorts before every typed entry.
//!
//! Two variants:
//!
//! - **Unique**: entry key is the encoded value; a second document with the
//!   same encoded value is rejected.
//! - **List**: entry key is `encoded value ∥ 0x00 ∥ primary key`, so
//!   duplicate field values coexist because their full keys differ.
//!
//! Both variants store the primary key as the entry value; primary keys are
//! variable-length, so scans read them from there instead of splitting the
//! composite key.

use crate::catalog::IndexConfig;
use crate::document::stream::Flow;
use crate::document::DotPath;
use crate::encoding::key::encode_tagged;
use crate::engine::Store;
use crate::errors::DbError;
use crate::types::Value;
use eyre::Result;

pub struct Index {
    cfg: IndexConfig,
    path: DotPath,
    store: Box<dyn Store>,
}

impl Index {
    pub fn new(cfg: IndexConfig, store: Box<dyn Store>) -> Result<Self> {
        let path = DotPath::parse(&cfg.field_path)?;
        Ok(Self { cfg, path, store })
    }

    pub fn config(&self) -> &IndexConfig {
        &self.cfg
    }

    /// Dot path of the indexed field.
    pub fn path(&self) -> &DotPath {
        &self.path
    }

    fn entry_key(&self, value: &Value<'_>, pk: &[u8]) -> Result<Vec<u8>> {
        let mut key = Vec::new();
        encode_tagged(value, &mut key)?;
        if !self.cfg.unique {
            key.push(0x00);
            key.extend_from_slice(pk);
        }
        Ok(key)
    }

    /// Adds an entry for `(value, pk)`. On a unique index, an existing
    /// entry for the same encoded value fails with `DuplicateDocument`.
    pub fn set(&self, value: &Value<'_>, pk: &[u8]) -> Result<()> {
        let key = self.entry_key(value, pk)?;
        if self.cfg.unique {
            match self.store.get(&key) {
                Ok(_) => return Err(DbError::DuplicateDocument.into()),
                Err(err) if DbError::KeyNotFound.is(&err) => {}
                Err(err) => return Err(err),
            }
        }
        self.store.put(&key, pk)
    }

    /// Removes the entry for `(value, pk)`.
    pub fn delete(&self, value: &Value<'_>, pk: &[u8]) -> Result<()> {
        let key = self.entry_key(value, pk)?;
        self.store.delete(&key)
    }

    /// Visits entries whose value is `>= pivot` (all entries when `None`,
    /// starting at the NULL sentinel) in ascending order. The callback
    /// receives the full entry key and the primary key.
    pub fn ascend_greater_or_equal(
        &self,
        pivot: Option<&Value<'_>>,
        f: &mut dyn FnMut(&[u8], &[u8]) -> Result<Flow>,
    ) -> Result<()> {
        let pivot_key = match pivot {
            Some(v) => {
                let mut key = Vec::new();
                encode_tagged(v, &mut key)?;
                Some(key)
            }
            None => None,
        };
        self.store
            .ascend_greater_or_equal(pivot_key.as_deref(), &mut |k, pk| f(k, pk))
    }

    /// Visits entries whose value is `<= pivot` (all entries when `None`)
    /// in descending order. On a list index the pivot is extended with a
    /// 0xFF byte so entries equal to the pivot value are included.
    pub fn descend_less_or_equal(
        &self,
        pivot: Option<&Value<'_>>,
        f: &mut dyn FnMut(&[u8], &[u8]) -> Result<Flow>,
    ) -> Result<()> {
        let pivot_key = match pivot {
            Some(v) => {
                let mut key = Vec::new();
                encode_tagged(v, &mut key)?;
                if !self.cfg.unique {
                    key.push(0xFF);
                }
                Some(key)
            }
            None => None,
        };
        self.store
            .descend_less_or_equal(pivot_key.as_deref(), &mut |k, pk| f(k, pk))
    }
}
