//! # Value Types
//!
//! Kind tags and the runtime [`Value`] representation for document fields.
//! The tag byte order doubles as the cross-kind sort order used by index
//! keys, with Null first so it can serve as the index sentinel.

pub mod value;

pub use value::Value;

use eyre::{bail, Result};

/// Kind tag of a [`Value`]. The `u8` representation is stable: it is written
/// to the document wire format and prefixes tagged index keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ValueKind {
    Null = 0,
    Bool = 1,
    Int8 = 2,
    Int16 = 3,
    Int32 = 4,
    Int64 = 5,
    Uint8 = 6,
    Uint16 = 7,
    Uint32 = 8,
    Uint64 = 9,
    Float64 = 10,
    Text = 11,
    Blob = 12,
    Array = 13,
    Document = 14,
    Duration = 15,
}

impl ValueKind {
    pub fn from_u8(tag: u8) -> Result<ValueKind> {
        Ok(match tag {
            0 => ValueKind::Null,
            1 => ValueKind::Bool,
            2 => ValueKind::Int8,
            3 => ValueKind::Int16,
            4 => ValueKind::Int32,
            5 => ValueKind::Int64,
            6 => ValueKind::Uint8,
            7 => ValueKind::Uint16,
            8 => ValueKind::Uint32,
            9 => ValueKind::Uint64,
            10 => ValueKind::Float64,
            11 => ValueKind::Text,
            12 => ValueKind::Blob,
            13 => ValueKind::Array,
            14 => ValueKind::Document,
            15 => ValueKind::Duration,
            _ => bail!("unknown value kind tag: {}", tag),
        })
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int8 => "int8",
            ValueKind::Int16 => "int16",
            ValueKind::Int32 => "int32",
            ValueKind::Int64 => "int64",
            ValueKind::Uint8 => "uint8",
            ValueKind::Uint16 => "uint16",
            ValueKind::Uint32 => "uint32",
            ValueKind::Uint64 => "uint64",
            ValueKind::Float64 => "float64",
            ValueKind::Text => "text",
            ValueKind::Blob => "blob",
            ValueKind::Array => "array",
            ValueKind::Document => "document",
            ValueKind::Duration => "duration",
        }
    }
}
