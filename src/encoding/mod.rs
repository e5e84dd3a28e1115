//! # Byte Encodings
//!
//! - [`varint`]: variable-length integers for the document wire format.
//! - [`key`]: byte-comparable key encodings for primary keys, index entries,
//!   and sort keys.

pub mod key;
pub mod varint;
