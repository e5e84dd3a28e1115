//! # Document Interchange
//!
//! Callers hand documents in as JSON and pull result sets out as NDJSON
//! (one document per line) or CSV (one document per row, values stringified
//! in field order).
//!
//! Blob values have no native JSON form and are exported as lowercase hex
//! strings; durations export as their nanosecond count.

use crate::document::stream::{DocumentIterator, Flow};
use crate::document::FieldBuffer;
use crate::types::Value;
use eyre::{bail, Result};
use std::io::Write;

/// Builds a document from a JSON object literal.
pub fn from_json(input: &str) -> Result<FieldBuffer<'static>> {
    let parsed: serde_json::Value = serde_json::from_str(input)?;
    match parsed {
        serde_json::Value::Object(map) => {
            let mut doc = FieldBuffer::new();
            for (name, value) in map {
                doc.add(name, json_to_value(value));
            }
            Ok(doc)
        }
        other => bail!("expected a JSON object, got {}", other),
    }
}

fn json_to_value(v: serde_json::Value) -> Value<'static> {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int64(i)
            } else if let Some(u) = n.as_u64() {
                Value::Uint64(u)
            } else {
                Value::Float64(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => Value::Text(s.into()),
        serde_json::Value::Array(items) => {
            Value::Array(items.into_iter().map(json_to_value).collect())
        }
        serde_json::Value::Object(map) => {
            let mut doc = FieldBuffer::new();
            for (name, value) in map {
                doc.add(name, json_to_value(value));
            }
            Value::Document(Box::new(doc))
        }
    }
}

/// Renders a document as a JSON object.
pub fn to_json(doc: &FieldBuffer<'_>) -> serde_json::Value {
    let mut map = serde_json::Map::with_capacity(doc.len());
    for field in doc.iter() {
        map.insert(field.name.as_ref().to_owned(), value_to_json(&field.value));
    }
    serde_json::Value::Object(map)
}

fn value_to_json(v: &Value<'_>) -> serde_json::Value {
    match v {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int8(n) => (*n).into(),
        Value::Int16(n) => (*n).into(),
        Value::Int32(n) => (*n).into(),
        Value::Int64(n) => (*n).into(),
        Value::Uint8(n) => (*n).into(),
        Value::Uint16(n) => (*n).into(),
        Value::Uint32(n) => (*n).into(),
        Value::Uint64(n) => (*n).into(),
        Value::Float64(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(s) => serde_json::Value::String(s.as_ref().to_owned()),
        Value::Blob(_) | Value::Duration(_) => serde_json::Value::String(v.to_string()),
        Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(value_to_json).collect())
        }
        Value::Document(doc) => to_json(doc),
    }
}

/// Writes every document of `it` as one JSON object per line.
pub fn to_ndjson<W: Write>(w: &mut W, it: &dyn DocumentIterator) -> Result<()> {
    it.iterate(&mut |doc| {
        serde_json::to_writer(&mut *w, &to_json(&doc))?;
        w.write_all(b"\n")?;
        Ok(Flow::Continue)
    })
}

/// Writes every document of `it` as one CSV row, values stringified in
/// field order. Fields containing separators or quotes are quoted with
/// doubled-quote escaping.
pub fn to_csv<W: Write>(w: &mut W, it: &dyn DocumentIterator) -> Result<()> {
    it.iterate(&mut |doc| {
        for (i, field) in doc.iter().enumerate() {
            if i > 0 {
                w.write_all(b",")?;
            }
            write_csv_field(w, &field.value.to_string())?;
        }
        w.write_all(b"\n")?;
        Ok(Flow::Continue)
    })
}

fn write_csv_field<W: Write>(w: &mut W, text: &str) -> Result<()> {
    if text.contains([',', '"', '\n', '\r']) {
        w.write_all(b"\"")?;
        w.write_all(text.replace('"', "\"\"").as_bytes())?;
        w.write_all(b"\"")?;
    } else {
        w.write_all(text.as_bytes())?;
    }
    Ok(())
}
