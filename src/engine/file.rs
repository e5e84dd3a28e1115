//! # Snapshot-File Engine
//!
//! Persistent engine behind `Database::open(path)` for non-`:memory:`
//! paths. The committed store map is held in memory and mirrored to a
//! single snapshot file: loaded once at open, rewritten atomically (write
//! to a sibling temp file, then rename) before each write commit publishes.
//! The snapshot file is created with mode 0660.
//!
//! Transactions reuse the in-memory engine's workspace machinery, so the
//! concurrency and atomicity guarantees are identical. Larger deployments
//! plug in an external B-tree or LSM backend through the engine traits
//! instead.
//!
//! ## Snapshot Layout
//!
//! ```text
//! magic "ink1" | varint store count
//!   per store: varint len(name) | name
//!              varint entry count
//!                per entry: varint len(key) | key | varint len(value) | value
//! ```

use crate::encoding::varint::{read_varint, write_varint};
use crate::engine::memory::{MemTransaction, StoreMap};
use crate::engine::{Engine, EngineTransaction};
use eyre::{ensure, Result, WrapErr};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

const MAGIC: &[u8; 4] = b"ink1";
const FILE_MODE: u32 = 0o660;

pub struct FileEngine {
    path: PathBuf,
    state: Arc<Mutex<StoreMap>>,
    writer: Mutex<()>,
}

impl FileEngine {
    /// Opens the snapshot at `path`, creating an empty engine if the file
    /// does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let stores = match std::fs::read(&path) {
            Ok(bytes) => decode_snapshot(&bytes)
                .wrap_err_with(|| format!("corrupt snapshot file {}", path.display()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoreMap::new(),
            Err(err) => {
                return Err(err)
                    .wrap_err_with(|| format!("cannot open {}", path.display()))
            }
        };
        tracing::debug!(path = %path.display(), stores = stores.len(), "opened snapshot file");
        Ok(Self {
            path,
            state: Arc::new(Mutex::new(stores)),
            writer: Mutex::new(()),
        })
    }
}

impl Engine for FileEngine {
    fn begin(&self, writable: bool) -> Result<Box<dyn EngineTransaction + '_>> {
        let persist = if writable {
            let path = self.path.clone();
            Some(Rc::new(move |stores: &StoreMap| write_snapshot(&path, stores))
                as Rc<dyn Fn(&StoreMap) -> Result<()>>)
        } else {
            None
        };
        Ok(Box::new(MemTransaction::begin(
            Arc::clone(&self.state),
            writable.then(|| self.writer.lock()),
            writable,
            persist,
        )))
    }
}

fn write_snapshot(path: &Path, stores: &StoreMap) -> Result<()> {
    let mut buf = Vec::new();
    buf.extend_from_slice(MAGIC);
    write_varint(stores.len() as u64, &mut buf);
    for (name, entries) in stores {
        write_varint(name.len() as u64, &mut buf);
        buf.extend_from_slice(name.as_bytes());
        write_varint(entries.len() as u64, &mut buf);
        for (key, value) in entries {
            write_varint(key.len() as u64, &mut buf);
            buf.extend_from_slice(key);
            write_varint(value.len() as u64, &mut buf);
            buf.extend_from_slice(value);
        }
    }

    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, &buf)
        .wrap_err_with(|| format!("cannot write snapshot {}", tmp.display()))?;
    set_file_mode(&tmp)?;
    std::fs::rename(&tmp, path)
        .wrap_err_with(|| format!("cannot replace snapshot {}", path.display()))?;
    Ok(())
}

#[cfg(unix)]
fn set_file_mode(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(FILE_MODE))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_file_mode(_path: &Path) -> Result<()> {
    Ok(())
}

fn decode_snapshot(bytes: &[u8]) -> Result<StoreMap> {
    ensure!(bytes.len() >= MAGIC.len() && &bytes[..MAGIC.len()] == MAGIC, "bad magic");
    let mut rest = &bytes[MAGIC.len()..];

    let mut read_chunk = |rest: &mut &[u8]| -> Result<Vec<u8>> {
        let (len, consumed) = read_varint(rest)?;
        let len = len as usize;
        ensure!(rest.len() >= consumed + len, "truncated snapshot");
        let chunk = rest[consumed..consumed + len].to_vec();
        *rest = &rest[consumed + len..];
        Ok(chunk)
    };

    let (store_count, consumed) = read_varint(rest)?;
    rest = &rest[consumed..];

    let mut stores = StoreMap::new();
    for _ in 0..store_count {
        let name = String::from_utf8(read_chunk(&mut rest)?)
            .map_err(|e| eyre::eyre!("store name is not valid utf-8: {}", e))?;
        let (entry_count, consumed) = read_varint(rest)?;
        rest = &rest[consumed..];
        let mut entries = BTreeMap::new();
        for _ in 0..entry_count {
            let key = read_chunk(&mut rest)?;
            let value = read_chunk(&mut rest)?;
            entries.insert(key, value);
        }
        stores.insert(name, entries);
    }
    ensure!(rest.is_empty(), "trailing bytes after snapshot");
    Ok(stores)
}
