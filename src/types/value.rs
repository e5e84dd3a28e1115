//! # Runtime Value Representation
//!
//! `Value<'a>` is the runtime form of a document field. Text and blob
//! payloads use `Cow` so decoded values borrow directly from the encoded
//! buffer; `into_owned` detaches them when a value must outlive its read.
//!
//! ## Semantics
//!
//! - **Conversion** is a total lattice: widening numeric conversions never
//!   fail, narrowing fails out of range, text parses to numerics, blob and
//!   text convert into each other, arrays and documents convert only to
//!   themselves.
//! - **Comparison** follows SQL: anything compared to NULL is UNKNOWN
//!   (`None`); numerics compare across kinds; non-coercible kinds order by
//!   their kind tag.
//! - **Truthiness**: a non-NULL value is truthy iff it differs from its
//!   kind's zero value. NULL is never truthy.
//! - **Arithmetic** is numeric-only with NULL absorbing; integer overflow
//!   and division by zero are errors.

use crate::document::FieldBuffer;
use crate::types::ValueKind;
use eyre::{bail, Result};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

/// A single document field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Null,
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Float64(f64),
    Text(Cow<'a, str>),
    Blob(Cow<'a, [u8]>),
    Array(Vec<Value<'a>>),
    Document(Box<FieldBuffer<'a>>),
    /// Elapsed time in nanoseconds.
    Duration(i64),
}

/// Numeric view used by comparison and arithmetic.
enum Num {
    Int(i128),
    Float(f64),
}

impl<'a> Value<'a> {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int8(_) => ValueKind::Int8,
            Value::Int16(_) => ValueKind::Int16,
            Value::Int32(_) => ValueKind::Int32,
            Value::Int64(_) => ValueKind::Int64,
            Value::Uint8(_) => ValueKind::Uint8,
            Value::Uint16(_) => ValueKind::Uint16,
            Value::Uint32(_) => ValueKind::Uint32,
            Value::Uint64(_) => ValueKind::Uint64,
            Value::Float64(_) => ValueKind::Float64,
            Value::Text(_) => ValueKind::Text,
            Value::Blob(_) => ValueKind::Blob,
            Value::Array(_) => ValueKind::Array,
            Value::Document(_) => ValueKind::Document,
            Value::Duration(_) => ValueKind::Duration,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// A non-NULL value is truthy iff it differs from its kind's zero value.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int8(v) => *v != 0,
            Value::Int16(v) => *v != 0,
            Value::Int32(v) => *v != 0,
            Value::Int64(v) => *v != 0,
            Value::Uint8(v) => *v != 0,
            Value::Uint16(v) => *v != 0,
            Value::Uint32(v) => *v != 0,
            Value::Uint64(v) => *v != 0,
            Value::Float64(v) => *v != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::Blob(b) => !b.is_empty(),
            Value::Array(a) => !a.is_empty(),
            Value::Document(d) => !d.is_empty(),
            Value::Duration(v) => *v != 0,
        }
    }

    /// Detaches borrowed payloads, producing a value with no lifetime ties.
    pub fn into_owned(self) -> Value<'static> {
        match self {
            Value::Null => Value::Null,
            Value::Bool(b) => Value::Bool(b),
            Value::Int8(v) => Value::Int8(v),
            Value::Int16(v) => Value::Int16(v),
            Value::Int32(v) => Value::Int32(v),
            Value::Int64(v) => Value::Int64(v),
            Value::Uint8(v) => Value::Uint8(v),
            Value::Uint16(v) => Value::Uint16(v),
            Value::Uint32(v) => Value::Uint32(v),
            Value::Uint64(v) => Value::Uint64(v),
            Value::Float64(v) => Value::Float64(v),
            Value::Text(s) => Value::Text(Cow::Owned(s.into_owned())),
            Value::Blob(b) => Value::Blob(Cow::Owned(b.into_owned())),
            Value::Array(a) => Value::Array(a.into_iter().map(Value::into_owned).collect()),
            Value::Document(d) => Value::Document(Box::new(d.into_owned())),
            Value::Duration(v) => Value::Duration(v),
        }
    }

    fn as_num(&self) -> Option<Num> {
        match self {
            Value::Int8(v) => Some(Num::Int(*v as i128)),
            Value::Int16(v) => Some(Num::Int(*v as i128)),
            Value::Int32(v) => Some(Num::Int(*v as i128)),
            Value::Int64(v) => Some(Num::Int(*v as i128)),
            Value::Uint8(v) => Some(Num::Int(*v as i128)),
            Value::Uint16(v) => Some(Num::Int(*v as i128)),
            Value::Uint32(v) => Some(Num::Int(*v as i128)),
            Value::Uint64(v) => Some(Num::Int(*v as i128)),
            Value::Float64(v) => Some(Num::Float(*v)),
            Value::Duration(v) => Some(Num::Int(*v as i128)),
            _ => None,
        }
    }

    fn is_unsigned_kind(&self) -> bool {
        matches!(
            self,
            Value::Uint8(_) | Value::Uint16(_) | Value::Uint32(_) | Value::Uint64(_)
        )
    }

    /// Converts to the requested kind following the conversion lattice.
    pub fn convert_to(&self, target: ValueKind) -> Result<Value<'a>> {
        if self.kind() == target {
            return Ok(self.clone());
        }

        match self {
            Value::Null => bail!("cannot convert null to {}", target.name()),
            Value::Bool(b) => {
                let n = if *b { 1i128 } else { 0 };
                match target {
                    ValueKind::Float64 => Ok(Value::Float64(n as f64)),
                    ValueKind::Text => Ok(Value::Text(Cow::Owned(b.to_string()))),
                    _ if is_integer_kind(target) => int_to_kind(n, target),
                    _ => bail!("cannot convert bool to {}", target.name()),
                }
            }
            v if v.as_num().is_some() && !matches!(v, Value::Bool(_)) => {
                match (v.as_num().unwrap(), target) {
                    (Num::Int(n), ValueKind::Float64) => Ok(Value::Float64(n as f64)),
                    (Num::Int(n), ValueKind::Bool) => Ok(Value::Bool(n != 0)),
                    (Num::Int(n), ValueKind::Text) => Ok(Value::Text(Cow::Owned(n.to_string()))),
                    (Num::Int(n), ValueKind::Duration) => {
                        if n < i64::MIN as i128 || n > i64::MAX as i128 {
                            bail!("value {} out of range for duration", n);
                        }
                        Ok(Value::Duration(n as i64))
                    }
                    (Num::Int(n), k) if is_integer_kind(k) => int_to_kind(n, k),
                    (Num::Float(f), ValueKind::Bool) => Ok(Value::Bool(f != 0.0)),
                    (Num::Float(f), ValueKind::Text) => Ok(Value::Text(Cow::Owned(f.to_string()))),
                    (Num::Float(f), k) if is_integer_kind(k) || k == ValueKind::Duration => {
                        if f.is_nan() || f < -(2f64.powi(63)) || f >= 2f64.powi(64) {
                            bail!("float {} out of range for {}", f, k.name());
                        }
                        let n = f.trunc() as i128;
                        if k == ValueKind::Duration {
                            int_to_kind(n, ValueKind::Int64).map(|v| match v {
                                Value::Int64(ns) => Value::Duration(ns),
                                _ => unreachable!(),
                            })
                        } else {
                            int_to_kind(n, k)
                        }
                    }
                    _ => bail!("cannot convert {} to {}", v.kind().name(), target.name()),
                }
            }
            Value::Text(s) => match target {
                ValueKind::Blob => Ok(Value::Blob(match s {
                    Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
                    Cow::Owned(s) => Cow::Owned(s.clone().into_bytes()),
                })),
                ValueKind::Bool => match s.as_ref() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    _ => bail!("cannot parse '{}' as bool", s),
                },
                ValueKind::Float64 => {
                    let f: f64 = s
                        .parse()
                        .map_err(|e| eyre::eyre!("cannot parse '{}' as float64: {}", s, e))?;
                    Ok(Value::Float64(f))
                }
                k if is_integer_kind(k) || k == ValueKind::Duration => {
                    let n: i128 = s
                        .parse()
                        .map_err(|e| eyre::eyre!("cannot parse '{}' as {}: {}", s, k.name(), e))?;
                    if k == ValueKind::Duration {
                        int_to_kind(n, ValueKind::Int64).map(|v| match v {
                            Value::Int64(ns) => Value::Duration(ns),
                            _ => unreachable!(),
                        })
                    } else {
                        int_to_kind(n, k)
                    }
                }
                _ => bail!("cannot convert text to {}", target.name()),
            },
            Value::Blob(b) => match target {
                ValueKind::Text => {
                    let s = match b {
                        Cow::Borrowed(b) => Cow::Borrowed(
                            std::str::from_utf8(b)
                                .map_err(|e| eyre::eyre!("blob is not valid utf-8: {}", e))?,
                        ),
                        Cow::Owned(b) => Cow::Owned(
                            String::from_utf8(b.clone())
                                .map_err(|e| eyre::eyre!("blob is not valid utf-8: {}", e))?,
                        ),
                    };
                    Ok(Value::Text(s))
                }
                _ => bail!("cannot convert blob to {}", target.name()),
            },
            Value::Array(_) => bail!("cannot convert array to {}", target.name()),
            Value::Document(_) => bail!("cannot convert document to {}", target.name()),
            _ => bail!(
                "cannot convert {} to {}",
                self.kind().name(),
                target.name()
            ),
        }
    }

    /// SQL comparison. `None` means UNKNOWN (a NULL operand, or NaN).
    pub fn compare(&self, other: &Value<'_>) -> Option<Ordering> {
        if self.is_null() || other.is_null() {
            return None;
        }

        if let (Some(a), Some(b)) = (self.as_num(), other.as_num()) {
            return match (a, b) {
                (Num::Int(a), Num::Int(b)) => Some(a.cmp(&b)),
                (Num::Int(a), Num::Float(b)) => {
                    if b.is_nan() {
                        None
                    } else {
                        (a as f64).partial_cmp(&b)
                    }
                }
                (Num::Float(a), Num::Int(b)) => {
                    if a.is_nan() {
                        None
                    } else {
                        a.partial_cmp(&(b as f64))
                    }
                }
                (Num::Float(a), Num::Float(b)) => {
                    if a.is_nan() || b.is_nan() {
                        None
                    } else {
                        a.partial_cmp(&b)
                    }
                }
            };
        }

        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.as_ref().cmp(b.as_ref())),
            (Value::Blob(a), Value::Blob(b)) => Some(a.as_ref().cmp(b.as_ref())),
            (Value::Text(a), Value::Blob(b)) => Some(a.as_bytes().cmp(b.as_ref())),
            (Value::Blob(a), Value::Text(b)) => Some(a.as_ref().cmp(b.as_bytes())),
            (Value::Array(a), Value::Array(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.compare(y) {
                        Some(Ordering::Equal) => continue,
                        other => return other,
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            (Value::Document(a), Value::Document(b)) => {
                for (fa, fb) in a.iter().zip(b.iter()) {
                    match fa.name.as_ref().cmp(fb.name.as_ref()) {
                        Ordering::Equal => {}
                        ord => return Some(ord),
                    }
                    match fa.value.compare(&fb.value) {
                        Some(Ordering::Equal) => continue,
                        other => return other,
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            // Text compared to a numeric: parse, fall back to tag order.
            (Value::Text(s), b) if b.as_num().is_some() => match s.parse::<f64>() {
                Ok(f) => Value::Float64(f).compare(b),
                Err(_) => Some(self.kind().as_u8().cmp(&other.kind().as_u8())),
            },
            (a, Value::Text(s)) if a.as_num().is_some() => match s.parse::<f64>() {
                Ok(f) => a.compare(&Value::Float64(f)),
                Err(_) => Some(self.kind().as_u8().cmp(&other.kind().as_u8())),
            },
            _ => Some(self.kind().as_u8().cmp(&other.kind().as_u8())),
        }
    }

    pub fn add(&self, other: &Value<'_>) -> Result<Value<'static>> {
        self.arith(other, "+")
    }

    pub fn sub(&self, other: &Value<'_>) -> Result<Value<'static>> {
        self.arith(other, "-")
    }

    pub fn mul(&self, other: &Value<'_>) -> Result<Value<'static>> {
        self.arith(other, "*")
    }

    pub fn div(&self, other: &Value<'_>) -> Result<Value<'static>> {
        self.arith(other, "/")
    }

    pub fn rem(&self, other: &Value<'_>) -> Result<Value<'static>> {
        self.arith(other, "%")
    }

    fn arith(&self, other: &Value<'_>, op: &str) -> Result<Value<'static>> {
        if self.is_null() || other.is_null() {
            return Ok(Value::Null);
        }

        let (a, b) = match (self.as_num(), other.as_num()) {
            (Some(a), Some(b)) => (a, b),
            _ => bail!(
                "unsupported operand kinds for {}: {} and {}",
                op,
                self.kind().name(),
                other.kind().name()
            ),
        };

        match (a, b) {
            (Num::Int(a), Num::Int(b)) => {
                let r = match op {
                    "+" => a.checked_add(b),
                    "-" => a.checked_sub(b),
                    "*" => a.checked_mul(b),
                    "/" => {
                        if b == 0 {
                            bail!("division by zero");
                        }
                        a.checked_div(b)
                    }
                    "%" => {
                        if b == 0 {
                            bail!("division by zero");
                        }
                        a.checked_rem(b)
                    }
                    _ => unreachable!(),
                };
                let r = r.ok_or_else(|| eyre::eyre!("integer overflow in {}", op))?;
                if r >= i64::MIN as i128 && r <= i64::MAX as i128 {
                    Ok(Value::Int64(r as i64))
                } else if r >= 0
                    && r <= u64::MAX as i128
                    && (self.is_unsigned_kind() || other.is_unsigned_kind())
                {
                    Ok(Value::Uint64(r as u64))
                } else {
                    bail!("integer overflow in {}", op)
                }
            }
            (a, b) => {
                let (a, b) = (num_to_f64(a), num_to_f64(b));
                let r = match op {
                    "+" => a + b,
                    "-" => a - b,
                    "*" => a * b,
                    "/" => {
                        if b == 0.0 {
                            bail!("division by zero");
                        }
                        a / b
                    }
                    "%" => {
                        if b == 0.0 {
                            bail!("division by zero");
                        }
                        a % b
                    }
                    _ => unreachable!(),
                };
                Ok(Value::Float64(r))
            }
        }
    }
}

fn num_to_f64(n: Num) -> f64 {
    match n {
        Num::Int(i) => i as f64,
        Num::Float(f) => f,
    }
}

fn is_integer_kind(kind: ValueKind) -> bool {
    matches!(
        kind,
        ValueKind::Int8
            | ValueKind::Int16
            | ValueKind::Int32
            | ValueKind::Int64
            | ValueKind::Uint8
            | ValueKind::Uint16
            | ValueKind::Uint32
            | ValueKind::Uint64
    )
}

fn int_to_kind<'a>(n: i128, kind: ValueKind) -> Result<Value<'a>> {
    macro_rules! narrow {
        ($ty:ty, $variant:ident) => {{
            if n < <$ty>::MIN as i128 || n > <$ty>::MAX as i128 {
                bail!("value {} out of range for {}", n, kind.name());
            }
            Ok(Value::$variant(n as $ty))
        }};
    }
    match kind {
        ValueKind::Int8 => narrow!(i8, Int8),
        ValueKind::Int16 => narrow!(i16, Int16),
        ValueKind::Int32 => narrow!(i32, Int32),
        ValueKind::Int64 => narrow!(i64, Int64),
        ValueKind::Uint8 => narrow!(u8, Uint8),
        ValueKind::Uint16 => narrow!(u16, Uint16),
        ValueKind::Uint32 => narrow!(u32, Uint32),
        ValueKind::Uint64 => narrow!(u64, Uint64),
        _ => bail!("not an integer kind: {}", kind.name()),
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int8(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Uint8(v) => write!(f, "{}", v),
            Value::Uint16(v) => write!(f, "{}", v),
            Value::Uint32(v) => write!(f, "{}", v),
            Value::Uint64(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
            Value::Blob(b) => {
                for byte in b.iter() {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            Value::Array(a) => {
                write!(f, "[")?;
                for (i, v) in a.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Document(d) => {
                write!(f, "{{")?;
                for (i, field) in d.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.value)?;
                }
                write!(f, "}}")
            }
            Value::Duration(ns) => write!(f, "{}ns", ns),
        }
    }
}

impl From<bool> for Value<'static> {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value<'static> {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value<'static> {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<u64> for Value<'static> {
    fn from(v: u64) -> Self {
        Value::Uint64(v)
    }
}

impl From<f64> for Value<'static> {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<&str> for Value<'static> {
    fn from(v: &str) -> Self {
        Value::Text(Cow::Owned(v.to_string()))
    }
}

impl From<String> for Value<'static> {
    fn from(v: String) -> Self {
        Value::Text(Cow::Owned(v))
    }
}

impl From<Vec<u8>> for Value<'static> {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(Cow::Owned(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widening_conversions_never_fail() {
        let v = Value::Int8(-5);
        assert_eq!(v.convert_to(ValueKind::Int64).unwrap(), Value::Int64(-5));
        assert_eq!(
            v.convert_to(ValueKind::Float64).unwrap(),
            Value::Float64(-5.0)
        );
        let v = Value::Uint32(4_000_000_000);
        assert_eq!(
            v.convert_to(ValueKind::Uint64).unwrap(),
            Value::Uint64(4_000_000_000)
        );
        assert_eq!(
            v.convert_to(ValueKind::Int64).unwrap(),
            Value::Int64(4_000_000_000)
        );
    }

    #[test]
    fn narrowing_fails_out_of_range() {
        assert!(Value::Int64(300).convert_to(ValueKind::Int8).is_err());
        assert!(Value::Int64(-1).convert_to(ValueKind::Uint8).is_err());
        assert!(Value::Uint64(u64::MAX).convert_to(ValueKind::Int64).is_err());
        assert_eq!(
            Value::Int64(127).convert_to(ValueKind::Int8).unwrap(),
            Value::Int8(127)
        );
    }

    #[test]
    fn text_parses_to_numeric() {
        assert_eq!(
            Value::from("42").convert_to(ValueKind::Int64).unwrap(),
            Value::Int64(42)
        );
        assert_eq!(
            Value::from("1.5").convert_to(ValueKind::Float64).unwrap(),
            Value::Float64(1.5)
        );
        assert!(Value::from("nope").convert_to(ValueKind::Int64).is_err());
    }

    #[test]
    fn blob_and_text_convert_bytewise() {
        let v = Value::from("héllo").convert_to(ValueKind::Blob).unwrap();
        assert_eq!(v, Value::Blob(Cow::Owned("héllo".as_bytes().to_vec())));
        assert_eq!(
            v.convert_to(ValueKind::Text).unwrap(),
            Value::from("héllo")
        );
        let bad = Value::Blob(Cow::Owned(vec![0xFF, 0xFE]));
        assert!(bad.convert_to(ValueKind::Text).is_err());
    }

    #[test]
    fn containers_convert_only_to_themselves() {
        let arr = Value::Array(vec![Value::Int64(1)]);
        assert!(arr.convert_to(ValueKind::Text).is_err());
        assert_eq!(arr.convert_to(ValueKind::Array).unwrap(), arr);
    }

    #[test]
    fn null_compares_as_unknown() {
        assert_eq!(Value::Null.compare(&Value::Int64(1)), None);
        assert_eq!(Value::Int64(1).compare(&Value::Null), None);
        assert_eq!(Value::Null.compare(&Value::Null), None);
    }

    #[test]
    fn numerics_compare_across_kinds() {
        assert_eq!(
            Value::Int8(2).compare(&Value::Uint64(3)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Float64(2.5).compare(&Value::Int64(2)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Value::Uint64(u64::MAX).compare(&Value::Int64(-1)),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn text_coerces_against_numbers() {
        assert_eq!(
            Value::from("10").compare(&Value::Int64(10)),
            Some(Ordering::Equal)
        );
        // Unparseable text falls back to kind-tag order: numbers < text.
        assert_eq!(
            Value::Int64(10).compare(&Value::from("abc")),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn truthiness_is_nonzero() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Int64(0).is_truthy());
        assert!(Value::Int64(-1).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::from("x").is_truthy());
        assert!(!Value::Float64(0.0).is_truthy());
        assert!(!Value::Array(vec![]).is_truthy());
    }

    #[test]
    fn arithmetic_propagates_null() {
        assert_eq!(Value::Null.add(&Value::Int64(1)).unwrap(), Value::Null);
        assert_eq!(Value::Int64(1).mul(&Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn arithmetic_mixes_ints_and_floats() {
        assert_eq!(
            Value::Int64(1).add(&Value::Int64(2)).unwrap(),
            Value::Int64(3)
        );
        assert_eq!(
            Value::Int64(1).add(&Value::Float64(0.5)).unwrap(),
            Value::Float64(1.5)
        );
        assert_eq!(
            Value::Int64(7).rem(&Value::Int64(3)).unwrap(),
            Value::Int64(1)
        );
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert!(Value::Int64(1).div(&Value::Int64(0)).is_err());
        assert!(Value::Int64(1).rem(&Value::Int64(0)).is_err());
        assert!(Value::Float64(1.0).div(&Value::Float64(0.0)).is_err());
    }

    #[test]
    fn integer_overflow_is_an_error() {
        assert!(Value::Int64(i64::MAX).add(&Value::Int64(1)).is_err());
        let big = Value::Uint64(u64::MAX);
        assert_eq!(
            big.add(&Value::Uint64(0)).unwrap(),
            Value::Uint64(u64::MAX)
        );
        assert!(big.add(&Value::Uint64(1)).is_err());
    }

    #[test]
    fn non_numeric_arithmetic_is_an_error() {
        assert!(Value::from("a").add(&Value::from("b")).is_err());
        assert!(Value::Bool(true).add(&Value::Int64(1)).is_err());
    }
}
