//! # Byte-Comparable Key Encoding
//!
//! Encoded keys preserve logical order under plain unsigned byte
//! comparison, so the storage engine never needs type-specific comparators.
//!
//! ## Encoding Rules
//!
//! | Kind | Layout |
//! |------|--------|
//! | Bool | `0x00` / `0x01` |
//! | Uint8..Uint64 | big-endian, natural width |
//! | Int8..Int64 | big-endian with the top bit flipped |
//! | Float64 | IEEE-754 big-endian; positive: sign bit flipped, negative: all bits flipped |
//! | Text | raw UTF-8 bytes |
//! | Blob | raw bytes |
//! | Duration | Int64 rule on the nanosecond count |
//!
//! Flipping the top bit of a signed integer maps `i64::MIN..=i64::MAX` onto
//! `0..=u64::MAX`, so negatives sort before non-negatives. The float trick
//! gives `-inf < … < -0.0 ≤ +0.0 < … < +inf`.
//!
//! ## Two Forms
//!
//! - **Primary-key form** ([`encode_value`]): payload only. The table knows
//!   its key kind, and NULL is not a legal key component.
//! - **Tagged form** ([`encode_tagged`]): one [`ValueKind`] tag byte then
//!   the payload. Used by index entries and sort keys, where values of
//!   different kinds share one keyspace and order by tag first. NULL
//!   encodes as the bare tag `0x00`, the sentinel that sorts before every
//!   typed value.

use crate::types::Value;
use eyre::{bail, Result};

pub fn encode_bool(v: bool, buf: &mut Vec<u8>) {
    buf.push(v as u8);
}

pub fn encode_u8(v: u8, buf: &mut Vec<u8>) {
    buf.push(v);
}

pub fn encode_u16(v: u16, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&v.to_be_bytes());
}

pub fn encode_u32(v: u32, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&v.to_be_bytes());
}

pub fn encode_u64(v: u64, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&v.to_be_bytes());
}

pub fn encode_i8(v: i8, buf: &mut Vec<u8>) {
    buf.push((v as u8) ^ 0x80);
}

pub fn encode_i16(v: i16, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&((v as u16) ^ (1 << 15)).to_be_bytes());
}

pub fn encode_i32(v: i32, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&((v as u32) ^ (1 << 31)).to_be_bytes());
}

pub fn encode_i64(v: i64, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&((v as u64) ^ (1 << 63)).to_be_bytes());
}

pub fn encode_f64(v: f64, buf: &mut Vec<u8>) {
    let bits = v.to_bits();
    let ordered = if bits & (1 << 63) != 0 {
        !bits
    } else {
        bits ^ (1 << 63)
    };
    buf.extend_from_slice(&ordered.to_be_bytes());
}

pub fn encode_text(v: &str, buf: &mut Vec<u8>) {
    buf.extend_from_slice(v.as_bytes());
}

pub fn encode_blob(v: &[u8], buf: &mut Vec<u8>) {
    buf.extend_from_slice(v);
}

/// Primary-key encoding: payload only, no kind tag. NULL and container
/// kinds are not legal key components.
pub fn encode_value(v: &Value<'_>, buf: &mut Vec<u8>) -> Result<()> {
    match v {
        Value::Null => bail!("null is not a valid key"),
        Value::Bool(b) => encode_bool(*b, buf),
        Value::Int8(n) => encode_i8(*n, buf),
        Value::Int16(n) => encode_i16(*n, buf),
        Value::Int32(n) => encode_i32(*n, buf),
        Value::Int64(n) => encode_i64(*n, buf),
        Value::Uint8(n) => encode_u8(*n, buf),
        Value::Uint16(n) => encode_u16(*n, buf),
        Value::Uint32(n) => encode_u32(*n, buf),
        Value::Uint64(n) => encode_u64(*n, buf),
        Value::Float64(f) => encode_f64(*f, buf),
        Value::Text(s) => encode_text(s, buf),
        Value::Blob(b) => encode_blob(b, buf),
        Value::Duration(ns) => encode_i64(*ns, buf),
        Value::Array(_) | Value::Document(_) => {
            bail!("{} cannot be encoded as a key", v.kind().name())
        }
    }
    Ok(())
}

/// Tagged encoding for index entries and sort keys: kind tag byte, then the
/// primary-key payload. NULL encodes as its bare tag and sorts first.
pub fn encode_tagged(v: &Value<'_>, buf: &mut Vec<u8>) -> Result<()> {
    buf.push(v.kind().as_u8());
    if v.is_null() {
        return Ok(());
    }
    encode_value(v, buf)
}

/// Convenience wrapper returning a fresh tagged key.
pub fn tagged_key(v: &Value<'_>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_tagged(v, &mut buf)?;
    Ok(buf)
}
