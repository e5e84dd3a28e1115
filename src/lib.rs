//! # inkdb - Embeddable Document Database
//!
//! inkdb is a single-process, transactional store for schemaless documents
//! with secondary indexes and a small SQL dialect. It persists through a
//! pluggable ordered key/value engine: fully in memory, to a snapshot file,
//! or to any backend implementing the engine traits.
//!
//! ## Quick Start
//!
//! ```ignore
//! use inkdb::{Database, Param};
//!
//! let db = Database::open(":memory:")?;
//!
//! db.execute("CREATE TABLE users (id TEXT PRIMARY KEY)", &[])?;
//! db.execute(
//!     "INSERT INTO users DOCUMENTS {id: 'ana', age: 34, address: {city: 'Lyon'}}",
//!     &[],
//! )?;
//!
//! let rows = db.query("SELECT age FROM users WHERE address.city = ?",
//!     &[Param::positional("Lyon")])?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │        Public API (Database)          │
//! ├──────────────────────────────────────┤
//! │   SQL Layer (Lexer/Parser/Executor)   │
//! ├──────────────────────────────────────┤
//! │ Catalog │ Table Layer │ Index Layer   │
//! ├──────────────────────────────────────┤
//! │  Documents, Streams, Key Encoding     │
//! ├──────────────────────────────────────┤
//! │  Storage Engine (memory / file / …)   │
//! └──────────────────────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`engine`]: ordered KV storage traits plus the built-in engines
//! - [`types`]: the dynamic [`Value`] model and conversion lattice
//! - [`document`]: documents, dot paths, wire encoding, stream pipeline
//! - [`encoding`]: varints and byte-comparable key encoding
//! - [`catalog`], [`table`], [`index`]: the record and index layers
//! - [`sql`]: lexer, parser, expression evaluation, statement execution
//! - [`database`]: the embeddable entry point

pub mod catalog;
pub mod database;
pub mod document;
pub mod encoding;
pub mod engine;
pub mod errors;
pub mod index;
pub mod sql;
pub mod table;
pub mod types;

pub use database::{Database, Transaction, MEMORY_PATH};
pub use document::export::{from_json, to_csv, to_json, to_ndjson};
pub use document::stream::{DocumentIterator, Flow, Stream};
pub use document::{DotPath, Field, FieldBuffer};
pub use errors::{DbError, ParseError};
pub use sql::executor::ExecuteResult;
pub use sql::expr::Param;
pub use types::{Value, ValueKind};
