//! # Expression Evaluation
//!
//! `Expr::eval` computes a value against an [`EvalStack`]: the document
//! currently in scope (for dot-path identifiers) and the statement
//! parameters (for placeholders).
//!
//! SQL semantics throughout: NULL is absorbing for arithmetic and
//! comparison, AND/OR short-circuit, and once the left operand of a logical
//! operator is decisive the right operand is never evaluated — errors it
//! would have raised are discarded with it.

use super::ast::{BinaryOperator, Expr, Literal, PathSelector};
use crate::document::{DotPath, FieldBuffer, PathPart};
use crate::types::{Value, ValueKind};
use eyre::{bail, Result};
use std::cmp::Ordering;

/// A statement parameter: positional when `name` is `None`.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: Option<String>,
    pub value: Value<'static>,
}

impl Param {
    pub fn positional(value: impl Into<Value<'static>>) -> Self {
        Self {
            name: None,
            value: value.into(),
        }
    }

    pub fn named(name: impl Into<String>, value: impl Into<Value<'static>>) -> Self {
        Self {
            name: Some(name.into()),
            value: value.into(),
        }
    }
}

/// Ambient context for one expression evaluation.
#[derive(Clone, Copy, Default)]
pub struct EvalStack<'s> {
    pub document: Option<&'s FieldBuffer<'static>>,
    pub params: &'s [Param],
}

/// Converts AST path selectors into a document dot path.
pub fn selectors_to_path(selectors: &[PathSelector<'_>]) -> DotPath {
    DotPath {
        parts: selectors
            .iter()
            .map(|s| match s {
                PathSelector::Field(name) => PathPart::Field((*name).to_string()),
                PathSelector::Index(i) => PathPart::Index(*i),
            })
            .collect(),
    }
}

impl Expr<'_> {
    pub fn eval(&self, stack: &EvalStack<'_>) -> Result<Value<'static>> {
        match self {
            Expr::Literal(lit) => eval_literal(lit),
            Expr::Path(selectors) => {
                let doc = match stack.document {
                    Some(doc) => doc,
                    None => bail!("no document in scope for path expression"),
                };
                let path = selectors_to_path(selectors);
                Ok(doc.get_path(&path).cloned().unwrap_or(Value::Null))
            }
            Expr::Binary { op, left, right } => eval_binary(*op, left, right, stack),
            Expr::Not(operand) => {
                let v = operand.eval(stack)?;
                if v.is_null() {
                    Ok(Value::Null)
                } else {
                    Ok(Value::Bool(!v.is_truthy()))
                }
            }
            Expr::Neg(operand) => {
                let v = operand.eval(stack)?;
                Value::Int64(0).sub(&v)
            }
            Expr::In {
                expr,
                list,
                negated,
            } => {
                let needle = expr.eval(stack)?;
                if needle.is_null() {
                    return Ok(Value::Null);
                }
                let mut found = false;
                for item in *list {
                    let item = item.eval(stack)?;
                    if needle.compare(&item) == Some(Ordering::Equal) {
                        found = true;
                        break;
                    }
                }
                Ok(Value::Bool(found != *negated))
            }
            Expr::Like {
                expr,
                pattern,
                negated,
            } => {
                let text = expr.eval(stack)?;
                let pattern = pattern.eval(stack)?;
                if text.is_null() || pattern.is_null() {
                    return Ok(Value::Null);
                }
                let text = as_text(&text)?;
                let pattern = as_text(&pattern)?;
                Ok(Value::Bool(like_match(&text, &pattern) != *negated))
            }
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let v = expr.eval(stack)?;
                let low = low.eval(stack)?;
                let high = high.eval(stack)?;
                let inside = match (low.compare(&v), v.compare(&high)) {
                    (Some(a), Some(b)) => a != Ordering::Greater && b != Ordering::Greater,
                    _ => return Ok(Value::Null),
                };
                Ok(Value::Bool(inside != *negated))
            }
            Expr::Function { name, args: _ } => {
                if name.eq_ignore_ascii_case("count") {
                    bail!("COUNT() is only valid as a projected column");
                }
                bail!("unknown function {}()", name)
            }
            Expr::DocumentLiteral(fields) => {
                let mut doc = FieldBuffer::new();
                for (name, expr) in *fields {
                    doc.add((*name).to_string(), expr.eval(stack)?);
                }
                Ok(Value::Document(Box::new(doc)))
            }
            Expr::ArrayLiteral(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in *items {
                    values.push(item.eval(stack)?);
                }
                Ok(Value::Array(values))
            }
            Expr::PositionalParam(index) => match stack.params.get(*index) {
                Some(param) => Ok(param.value.clone()),
                None => bail!("missing value for placeholder ?{}", index + 1),
            },
            Expr::NamedParam(name) => {
                match stack
                    .params
                    .iter()
                    .find(|p| p.name.as_deref() == Some(*name))
                {
                    Some(param) => Ok(param.value.clone()),
                    None => bail!("missing value for placeholder ${}", name),
                }
            }
        }
    }
}

fn eval_literal(lit: &Literal<'_>) -> Result<Value<'static>> {
    Ok(match lit {
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Integer(text) => match text.parse::<i64>() {
            Ok(n) => Value::Int64(n),
            Err(_) => match text.parse::<u64>() {
                Ok(n) => Value::Uint64(n),
                Err(_) => bail!("integer literal {} out of range", text),
            },
        },
        Literal::Float(text) => Value::Float64(
            text.parse::<f64>()
                .map_err(|e| eyre::eyre!("bad float literal {}: {}", text, e))?,
        ),
        Literal::String(text) => Value::Text((*text).to_string().into()),
    })
}

fn eval_binary(
    op: BinaryOperator,
    left: &Expr<'_>,
    right: &Expr<'_>,
    stack: &EvalStack<'_>,
) -> Result<Value<'static>> {
    use BinaryOperator::*;

    match op {
        // Logical operators short-circuit: a decisive left operand wins and
        // the right side is never evaluated.
        And => {
            if !left.eval(stack)?.is_truthy() {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(right.eval(stack)?.is_truthy()))
        }
        Or => {
            if left.eval(stack)?.is_truthy() {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(right.eval(stack)?.is_truthy()))
        }
        _ => {
            let l = left.eval(stack)?;
            let r = right.eval(stack)?;
            match op {
                Add => l.add(&r),
                Sub => l.sub(&r),
                Mul => l.mul(&r),
                Div => l.div(&r),
                Mod => l.rem(&r),
                Eq | Neq | Lt | Le | Gt | Ge => {
                    let ord = match l.compare(&r) {
                        Some(ord) => ord,
                        None => return Ok(Value::Null),
                    };
                    let truth = match op {
                        Eq => ord == Ordering::Equal,
                        Neq => ord != Ordering::Equal,
                        Lt => ord == Ordering::Less,
                        Le => ord != Ordering::Greater,
                        Gt => ord == Ordering::Greater,
                        Ge => ord != Ordering::Less,
                        _ => unreachable!(),
                    };
                    Ok(Value::Bool(truth))
                }
                And | Or => unreachable!(),
            }
        }
    }
}

fn as_text(v: &Value<'_>) -> Result<String> {
    match v.convert_to(ValueKind::Text)? {
        Value::Text(s) => Ok(s.into_owned()),
        _ => unreachable!(),
    }
}

/// SQL LIKE matcher: `%` matches any run of characters, `_` exactly one.
fn like_match(text: &str, pattern: &str) -> bool {
    fn rec(text: &[char], pattern: &[char]) -> bool {
        match pattern.split_first() {
            None => text.is_empty(),
            Some((&'%', rest)) => (0..=text.len()).any(|skip| rec(&text[skip..], rest)),
            Some((&'_', rest)) => !text.is_empty() && rec(&text[1..], rest),
            Some((&ch, rest)) => text.first() == Some(&ch) && rec(&text[1..], rest),
        }
    }
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    rec(&text, &pattern)
}
