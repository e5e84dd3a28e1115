//! # Documents
//!
//! A document is an ordered sequence of named fields holding typed values.
//! [`FieldBuffer`] is the in-memory form; the wire form lives in
//! [`encoding`]. Field order is preserved on the wire but is not part of
//! document equality semantics for callers.
//!
//! [`DotPath`] drills into nested documents and arrays: `a.b.0` selects
//! field `a`, then field `b`, then array index 0. Missing selectors resolve
//! to nothing rather than erroring; expression evaluation turns that into
//! NULL.

pub mod encoding;
pub mod export;
pub mod stream;

use crate::types::Value;
use eyre::{bail, Result};
use smallvec::SmallVec;
use std::borrow::Cow;
use std::fmt;

/// A single named field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field<'a> {
    pub name: Cow<'a, str>,
    pub value: Value<'a>,
}

/// An ordered, field-addressed document. Most documents are small; the
/// first few fields live inline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldBuffer<'a> {
    fields: SmallVec<[Field<'a>; 4]>,
}

impl<'a> FieldBuffer<'a> {
    pub fn new() -> Self {
        Self {
            fields: SmallVec::new(),
        }
    }

    /// Appends a field. Callers are responsible for name uniqueness; use
    /// [`set`](Self::set) for replace-or-append semantics.
    pub fn add(&mut self, name: impl Into<Cow<'a, str>>, value: Value<'a>) -> &mut Self {
        self.fields.push(Field {
            name: name.into(),
            value,
        });
        self
    }

    /// Replaces the value of `name`, appending the field if absent.
    pub fn set(&mut self, name: impl Into<Cow<'a, str>>, value: Value<'a>) {
        let name = name.into();
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) => field.value = value,
            None => {
                self.fields.push(Field { name, value });
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value<'a>> {
        self.fields
            .iter()
            .find(|f| f.name.as_ref() == name)
            .map(|f| &f.value)
    }

    /// Resolves a dot path. Missing selectors yield `None`.
    pub fn get_path(&self, path: &DotPath) -> Option<&Value<'a>> {
        let mut parts = path.parts.iter();
        let first = parts.next()?;
        let mut current = match first {
            PathPart::Field(name) => self.get(name)?,
            PathPart::Index(_) => return None,
        };
        for part in parts {
            current = match (part, current) {
                (PathPart::Field(name), Value::Document(doc)) => doc.get(name)?,
                (PathPart::Index(idx), Value::Array(items)) => items.get(*idx)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Field<'a>> {
        self.fields.iter()
    }

    pub fn into_owned(self) -> FieldBuffer<'static> {
        FieldBuffer {
            fields: self
                .fields
                .into_iter()
                .map(|f| Field {
                    name: Cow::Owned(f.name.into_owned()),
                    value: f.value.into_owned(),
                })
                .collect(),
        }
    }
}

impl<'a> FromIterator<(Cow<'a, str>, Value<'a>)> for FieldBuffer<'a> {
    fn from_iter<T: IntoIterator<Item = (Cow<'a, str>, Value<'a>)>>(iter: T) -> Self {
        let mut fb = FieldBuffer::new();
        for (name, value) in iter {
            fb.add(name, value);
        }
        fb
    }
}

/// One selector of a dot path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPart {
    Field(String),
    Index(usize),
}

/// A parsed dot path: field names and 0-based array indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotPath {
    pub parts: Vec<PathPart>,
}

impl DotPath {
    /// Parses a textual dot path. All-digit selectors become array indexes.
    pub fn parse(text: &str) -> Result<Self> {
        if text.is_empty() {
            bail!("empty dot path");
        }
        let mut parts = Vec::new();
        for part in text.split('.') {
            if part.is_empty() {
                bail!("empty selector in dot path '{}'", text);
            }
            if part.bytes().all(|b| b.is_ascii_digit()) {
                parts.push(PathPart::Index(part.parse()?));
            } else {
                parts.push(PathPart::Field(part.to_string()));
            }
        }
        Ok(Self { parts })
    }
}

impl fmt::Display for DotPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            match part {
                PathPart::Field(name) => write!(f, "{}", name)?,
                PathPart::Index(idx) => write!(f, "{}", idx)?,
            }
        }
        Ok(())
    }
}
