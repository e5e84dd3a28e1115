//! # Document Wire Encoding
//!
//! Self-describing binary layout for on-disk documents:
//!
//! ```text
//! +----------------+-------------------------------------------------+
//! | varint N       | N fields:                                       |
//! |                |   varint len(name) | name | kind tag | payload   |
//! +----------------+-------------------------------------------------+
//! ```
//!
//! Payloads are fixed-width big-endian for integers, floats and durations,
//! varint-length-prefixed for text and blobs, and recursive
//! (varint byte length, then the nested encoding) for documents and arrays.
//! An array body is a varint element count followed by tagged elements.
//!
//! ## Decoders
//!
//! Two decoders share the same walk:
//!
//! - [`EncodedDocument::iterate`] visits each field once, in order.
//! - [`EncodedDocument::get_by_field`] walks the layout to answer a single
//!   field lookup in O(N) without touching other payloads.
//!
//! Both are zero-copy: text and blob values borrow the encoded buffer for
//! the lifetime of the read.

use crate::document::stream::Flow;
use crate::document::FieldBuffer;
use crate::encoding::varint::{read_varint, write_varint};
use crate::types::{Value, ValueKind};
use eyre::{ensure, Result};
use std::borrow::Cow;

/// Appends the wire form of `doc` to `buf`.
pub fn encode_document(doc: &FieldBuffer<'_>, buf: &mut Vec<u8>) {
    write_varint(doc.len() as u64, buf);
    for field in doc.iter() {
        write_varint(field.name.len() as u64, buf);
        buf.extend_from_slice(field.name.as_bytes());
        encode_value(&field.value, buf);
    }
}

/// Returns the wire form of `doc` as a fresh buffer.
pub fn document_bytes(doc: &FieldBuffer<'_>) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_document(doc, &mut buf);
    buf
}

fn encode_value(v: &Value<'_>, buf: &mut Vec<u8>) {
    buf.push(v.kind().as_u8());
    match v {
        Value::Null => {}
        Value::Bool(b) => buf.push(*b as u8),
        Value::Int8(n) => buf.push(*n as u8),
        Value::Int16(n) => buf.extend_from_slice(&n.to_be_bytes()),
        Value::Int32(n) => buf.extend_from_slice(&n.to_be_bytes()),
        Value::Int64(n) => buf.extend_from_slice(&n.to_be_bytes()),
        Value::Uint8(n) => buf.push(*n),
        Value::Uint16(n) => buf.extend_from_slice(&n.to_be_bytes()),
        Value::Uint32(n) => buf.extend_from_slice(&n.to_be_bytes()),
        Value::Uint64(n) => buf.extend_from_slice(&n.to_be_bytes()),
        Value::Float64(f) => buf.extend_from_slice(&f.to_bits().to_be_bytes()),
        Value::Duration(ns) => buf.extend_from_slice(&ns.to_be_bytes()),
        Value::Text(s) => {
            write_varint(s.len() as u64, buf);
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Blob(b) => {
            write_varint(b.len() as u64, buf);
            buf.extend_from_slice(b);
        }
        Value::Array(items) => {
            let mut body = Vec::new();
            write_varint(items.len() as u64, &mut body);
            for item in items {
                encode_value(item, &mut body);
            }
            write_varint(body.len() as u64, buf);
            buf.extend_from_slice(&body);
        }
        Value::Document(doc) => {
            let mut body = Vec::new();
            encode_document(doc, &mut body);
            write_varint(body.len() as u64, buf);
            buf.extend_from_slice(&body);
        }
    }
}

/// A document in wire form, decoded lazily.
#[derive(Debug, Clone, Copy)]
pub struct EncodedDocument<'a> {
    bytes: &'a [u8],
}

impl<'a> EncodedDocument<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Streaming decoder: visits every field once, in wire order.
    pub fn iterate<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&'a str, Value<'a>) -> Result<Flow>,
    {
        let mut walker = FieldWalker::new(self.bytes)?;
        while let Some((name, tag, payload)) = walker.next_field()? {
            let (value, _) = decode_payload(tag, payload)?;
            if let Flow::Stop = f(name, value)? {
                return Ok(());
            }
        }
        Ok(())
    }

    /// Random-access decoder: walks the layout, skipping payloads, until
    /// `name` matches. O(N) in the field count.
    pub fn get_by_field(&self, name: &str) -> Result<Option<Value<'a>>> {
        let mut walker = FieldWalker::new(self.bytes)?;
        while let Some((field_name, tag, payload)) = walker.next_field()? {
            if field_name == name {
                let (value, _) = decode_payload(tag, payload)?;
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Materializes the full document, borrowing text and blob payloads.
    pub fn decode(&self) -> Result<FieldBuffer<'a>> {
        let mut doc = FieldBuffer::new();
        self.iterate(|name, value| {
            doc.add(name, value);
            Ok(Flow::Continue)
        })?;
        Ok(doc)
    }
}

/// Shared layout walk for both decoders. Yields `(name, kind tag, rest)`
/// where `rest` starts at the field's payload; the walker advances past the
/// payload itself.
struct FieldWalker<'a> {
    bytes: &'a [u8],
    remaining: u64,
}

impl<'a> FieldWalker<'a> {
    fn new(bytes: &'a [u8]) -> Result<Self> {
        let (count, read) = read_varint(bytes)?;
        Ok(Self {
            bytes: &bytes[read..],
            remaining: count,
        })
    }

    fn next_field(&mut self) -> Result<Option<(&'a str, u8, &'a [u8])>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;

        let (name_len, read) = read_varint(self.bytes)?;
        let name_len = name_len as usize;
        self.bytes = &self.bytes[read..];
        ensure!(self.bytes.len() >= name_len + 1, "truncated field header");

        let name = std::str::from_utf8(&self.bytes[..name_len])
            .map_err(|e| eyre::eyre!("field name is not valid utf-8: {}", e))?;
        let tag = self.bytes[name_len];
        let payload = &self.bytes[name_len + 1..];

        let consumed = payload_len(tag, payload)?;
        self.bytes = &payload[consumed..];

        Ok(Some((name, tag, payload)))
    }
}

/// Byte length of the payload beginning at `bytes` for kind `tag`.
fn payload_len(tag: u8, bytes: &[u8]) -> Result<usize> {
    let kind = ValueKind::from_u8(tag)?;
    let len = match kind {
        ValueKind::Null => 0,
        ValueKind::Bool | ValueKind::Int8 | ValueKind::Uint8 => 1,
        ValueKind::Int16 | ValueKind::Uint16 => 2,
        ValueKind::Int32 | ValueKind::Uint32 => 4,
        ValueKind::Int64
        | ValueKind::Uint64
        | ValueKind::Float64
        | ValueKind::Duration => 8,
        ValueKind::Text | ValueKind::Blob | ValueKind::Array | ValueKind::Document => {
            let (body_len, read) = read_varint(bytes)?;
            read + body_len as usize
        }
    };
    ensure!(bytes.len() >= len, "truncated {} payload", kind.name());
    Ok(len)
}

fn decode_payload<'a>(tag: u8, bytes: &'a [u8]) -> Result<(Value<'a>, usize)> {
    let total = payload_len(tag, bytes)?;
    let kind = ValueKind::from_u8(tag)?;

    macro_rules! be {
        ($ty:ty, $n:expr) => {{
            let mut raw = [0u8; $n];
            raw.copy_from_slice(&bytes[..$n]);
            <$ty>::from_be_bytes(raw)
        }};
    }

    let value = match kind {
        ValueKind::Null => Value::Null,
        ValueKind::Bool => Value::Bool(bytes[0] != 0),
        ValueKind::Int8 => Value::Int8(bytes[0] as i8),
        ValueKind::Int16 => Value::Int16(be!(i16, 2)),
        ValueKind::Int32 => Value::Int32(be!(i32, 4)),
        ValueKind::Int64 => Value::Int64(be!(i64, 8)),
        ValueKind::Uint8 => Value::Uint8(bytes[0]),
        ValueKind::Uint16 => Value::Uint16(be!(u16, 2)),
        ValueKind::Uint32 => Value::Uint32(be!(u32, 4)),
        ValueKind::Uint64 => Value::Uint64(be!(u64, 8)),
        ValueKind::Float64 => Value::Float64(f64::from_bits(be!(u64, 8))),
        ValueKind::Duration => Value::Duration(be!(i64, 8)),
        ValueKind::Text => {
            let (len, read) = read_varint(bytes)?;
            let body = &bytes[read..read + len as usize];
            let s = std::str::from_utf8(body)
                .map_err(|e| eyre::eyre!("text payload is not valid utf-8: {}", e))?;
            Value::Text(Cow::Borrowed(s))
        }
        ValueKind::Blob => {
            let (len, read) = read_varint(bytes)?;
            Value::Blob(Cow::Borrowed(&bytes[read..read + len as usize]))
        }
        ValueKind::Array => {
            let (_, read) = read_varint(bytes)?;
            let mut body = &bytes[read..total];
            let (count, read) = read_varint(body)?;
            body = &body[read..];
            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                ensure!(!body.is_empty(), "truncated array element");
                let tag = body[0];
                let (item, consumed) = decode_payload(tag, &body[1..])?;
                items.push(item);
                body = &body[1 + consumed..];
            }
            Value::Array(items)
        }
        ValueKind::Document => {
            let (_, read) = read_varint(bytes)?;
            let body = &bytes[read..total];
            Value::Document(Box::new(EncodedDocument::new(body).decode()?))
        }
    };
    Ok((value, total))
}
