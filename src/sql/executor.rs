//! # Statement Execution
//!
//! Lowering rules:
//!
//! - `SELECT … WHERE p LIMIT l OFFSET o` becomes
//!   `Stream(scan).filter(p).offset(o).limit(l).map(projection)`. The scan
//!   is rooted at an index when the predicate contains an equality between
//!   an indexed path and a constant; the filter is retained either way.
//! - `ORDER BY` drains the filtered stream, sorts by the tagged key
//!   encoding of the projected value, and re-streams before OFFSET/LIMIT.
//! - `UPDATE`/`DELETE` are two-pass: iteration collects matching primary
//!   keys and documents, a second pass applies the mutations. No iterator
//!   cursor is held across a mutation.
//!
//! Each statement runs inside the caller's transaction; opening and
//! committing the automatic per-statement transaction is the database
//! layer's job.

use super::ast::*;
use super::expr::{selectors_to_path, EvalStack, Param};
use crate::catalog::{IndexConfig, PrimaryKey, TableConfig};
use crate::database::Transaction;
use crate::document::stream::{DocumentIterator, Flow, Stream};
use crate::document::FieldBuffer;
use crate::encoding::key::tagged_key;
use crate::errors::DbError;
use crate::table::Table;
use crate::types::{Value, ValueKind};
use eyre::{bail, ensure, Result};

/// Outcome of one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecuteResult {
    CreateTable { created: bool },
    CreateIndex { created: bool },
    DropTable { dropped: bool },
    DropIndex { dropped: bool },
    Insert {
        inserted: usize,
        /// Primary key of the last inserted document, in encoded form.
        last_key: Option<Vec<u8>>,
    },
    Update { updated: usize },
    Delete { deleted: usize },
    Select { rows: Vec<FieldBuffer<'static>> },
}

impl ExecuteResult {
    /// Result rows of a SELECT; empty for every other statement.
    pub fn rows(&self) -> &[FieldBuffer<'static>] {
        match self {
            ExecuteResult::Select { rows } => rows,
            _ => &[],
        }
    }
}

pub fn run_statement(
    stmt: &Statement<'_>,
    tx: &Transaction<'_>,
    params: &[Param],
) -> Result<ExecuteResult> {
    match stmt {
        Statement::Select(s) => run_select(s, tx, params),
        Statement::Insert(s) => run_insert(s, tx, params),
        Statement::Update(s) => run_update(s, tx, params),
        Statement::Delete(s) => run_delete(s, tx, params),
        Statement::CreateTable(s) => run_create_table(s, tx),
        Statement::CreateIndex(s) => run_create_index(s, tx),
        Statement::DropTable(s) => run_drop_table(s, tx),
        Statement::DropIndex(s) => run_drop_index(s, tx),
    }
}

fn run_create_table(stmt: &CreateTableStmt<'_>, tx: &Transaction<'_>) -> Result<ExecuteResult> {
    let cfg = TableConfig {
        primary_key: stmt.primary_key.map(|pk| PrimaryKey {
            path: pk.field.to_string(),
            kind: pk.kind,
        }),
        last_key: 0,
    };
    match tx.create_table(stmt.table, &cfg) {
        Ok(()) => Ok(ExecuteResult::CreateTable { created: true }),
        Err(err) if stmt.if_not_exists && DbError::TableAlreadyExists.is(&err) => {
            Ok(ExecuteResult::CreateTable { created: false })
        }
        Err(err) => Err(err),
    }
}

fn run_create_index(stmt: &CreateIndexStmt<'_>, tx: &Transaction<'_>) -> Result<ExecuteResult> {
    tx.create_index(&IndexConfig {
        index_name: stmt.index_name.to_string(),
        table_name: stmt.table.to_string(),
        field_path: selectors_to_path(stmt.path).to_string(),
        unique: stmt.unique,
    })?;
    Ok(ExecuteResult::CreateIndex { created: true })
}

fn run_drop_table(stmt: &DropStmt<'_>, tx: &Transaction<'_>) -> Result<ExecuteResult> {
    match tx.drop_table(stmt.name) {
        Ok(()) => Ok(ExecuteResult::DropTable { dropped: true }),
        Err(err) if stmt.if_exists && DbError::TableNotFound.is(&err) => {
            Ok(ExecuteResult::DropTable { dropped: false })
        }
        Err(err) => Err(err),
    }
}

fn run_drop_index(stmt: &DropStmt<'_>, tx: &Transaction<'_>) -> Result<ExecuteResult> {
    match tx.drop_index(stmt.name) {
        Ok(()) => Ok(ExecuteResult::DropIndex { dropped: true }),
        Err(err) if stmt.if_exists && DbError::IndexNotFound.is(&err) => {
            Ok(ExecuteResult::DropIndex { dropped: false })
        }
        Err(err) => Err(err),
    }
}

fn run_insert(stmt: &InsertStmt<'_>, tx: &Transaction<'_>, params: &[Param]) -> Result<ExecuteResult> {
    let table = tx.table(stmt.table)?;
    let stack = EvalStack {
        document: None,
        params,
    };

    let mut inserted = 0usize;
    let mut last_key = None;

    match stmt.source {
        InsertSource::Values(rows) => {
            let fields = stmt
                .fields
                .ok_or_else(|| eyre::eyre!("INSERT … VALUES requires a field list"))?;
            for row in rows {
                ensure!(
                    row.len() == fields.len(),
                    "expected {} values, got {}",
                    fields.len(),
                    row.len()
                );
                let mut doc = FieldBuffer::new();
                for (name, expr) in fields.iter().zip(row.iter()) {
                    doc.add((*name).to_string(), expr.eval(&stack)?);
                }
                last_key = Some(table.insert(&doc)?);
                inserted += 1;
            }
        }
        InsertSource::Documents(docs) => {
            for expr in docs {
                match expr.eval(&stack)? {
                    Value::Document(doc) => {
                        last_key = Some(table.insert(&doc)?);
                        inserted += 1;
                    }
                    other => bail!("expected a document, got {}", other.kind().name()),
                }
            }
        }
    }

    Ok(ExecuteResult::Insert {
        inserted,
        last_key,
    })
}

fn run_update(stmt: &UpdateStmt<'_>, tx: &Transaction<'_>, params: &[Param]) -> Result<ExecuteResult> {
    let table = tx.table(stmt.table)?;
    let matching = collect_matching(&table, stmt.where_clause, params)?;

    let mut updated = 0usize;
    for (key, old) in matching {
        let mut doc = old.clone();
        let stack = EvalStack {
            document: Some(&old),
            params,
        };
        for (field, expr) in stmt.assignments {
            doc.set((*field).to_string(), expr.eval(&stack)?);
        }
        table.replace(&key, &doc)?;
        updated += 1;
    }

    Ok(ExecuteResult::Update { updated })
}

fn run_delete(stmt: &DeleteStmt<'_>, tx: &Transaction<'_>, params: &[Param]) -> Result<ExecuteResult> {
    let table = tx.table(stmt.table)?;
    let matching = collect_matching(&table, stmt.where_clause, params)?;

    let mut deleted = 0usize;
    for (key, _) in matching {
        table.delete(&key)?;
        deleted += 1;
    }

    Ok(ExecuteResult::Delete { deleted })
}

/// First pass of the two-pass mutation pattern: collect the keys and
/// documents matching the predicate before touching anything.
fn collect_matching(
    table: &Table,
    where_clause: Option<&Expr<'_>>,
    params: &[Param],
) -> Result<Vec<(Vec<u8>, FieldBuffer<'static>)>> {
    let mut matching = Vec::new();
    table.iterate(None, &mut |key, view| {
        let doc = view.decode()?.into_owned();
        let keep = match where_clause {
            Some(pred) => {
                let stack = EvalStack {
                    document: Some(&doc),
                    params,
                };
                pred.eval(&stack)?.is_truthy()
            }
            None => true,
        };
        if keep {
            matching.push((key.to_vec(), doc));
        }
        Ok(Flow::Continue)
    })?;
    Ok(matching)
}

fn run_select<'s>(
    stmt: &SelectStmt<'s>,
    tx: &Transaction<'_>,
    params: &'s [Param],
) -> Result<ExecuteResult> {
    let table = tx.table(stmt.table)?;

    let count_name = match stmt.columns {
        [SelectColumn::Expr(Expr::Function { name, args })]
            if name.eq_ignore_ascii_case("count") && args.is_empty() =>
        {
            Some(format!("{}()", name))
        }
        _ => None,
    };

    let stream = build_source(table, stmt.where_clause, params)?;

    let stream = match stmt.where_clause {
        Some(pred) => stream.filter(move |doc| {
            let stack = EvalStack {
                document: Some(doc),
                params,
            };
            Ok(pred.eval(&stack)?.is_truthy())
        }),
        None => stream,
    };

    let stream = match stmt.order_by {
        Some(order) => sort_stream(stream, order)?,
        None => stream,
    };

    let stream = match stmt.offset {
        Some(expr) => stream.offset(eval_bound(expr, params, "OFFSET")?),
        None => stream,
    };
    let stream = match stmt.limit {
        Some(expr) => stream.limit(eval_bound(expr, params, "LIMIT")?),
        None => stream,
    };

    if let Some(name) = count_name {
        let count = stream.count()?;
        let mut doc = FieldBuffer::new();
        doc.add(name, Value::Int64(count as i64));
        return Ok(ExecuteResult::Select { rows: vec![doc] });
    }

    let stream = apply_projection(stream, stmt.columns, params)?;

    let mut rows = Vec::new();
    stream.iterate(&mut |doc| {
        rows.push(doc);
        Ok(Flow::Continue)
    })?;
    Ok(ExecuteResult::Select { rows })
}

/// Roots the stream at an index scan when the predicate holds an equality
/// between an indexed path and a constant; otherwise a full table scan.
fn build_source<'s>(
    table: Table,
    where_clause: Option<&'s Expr<'s>>,
    params: &'s [Param],
) -> Result<Stream<'s>> {
    if let Some(pred) = where_clause {
        if let Some((path, value)) = index_eq_candidate(pred, params)? {
            if let Some(index_pos) = table
                .indexes()
                .iter()
                .position(|idx| idx.config().field_path == path)
            {
                return Ok(Stream::new(IndexEqScan {
                    table,
                    index_pos,
                    value,
                }));
            }
        }
    }
    Ok(Stream::new(TableScan { table }))
}

/// Extracts `path = constant` (either orientation) from the top of the
/// predicate. NULL constants never match an equality and are left to the
/// filter.
fn index_eq_candidate(
    pred: &Expr<'_>,
    params: &[Param],
) -> Result<Option<(String, Value<'static>)>> {
    let Expr::Binary {
        op: BinaryOperator::Eq,
        left,
        right,
    } = pred
    else {
        return Ok(None);
    };

    let (selectors, constant) = match (*left, *right) {
        (Expr::Path(p), e) if is_constant(&e) => (p, e),
        (e, Expr::Path(p)) if is_constant(&e) => (p, e),
        _ => return Ok(None),
    };

    let stack = EvalStack {
        document: None,
        params,
    };
    let value = constant.eval(&stack)?;
    if value.is_null() {
        return Ok(None);
    }
    Ok(Some((selectors_to_path(selectors).to_string(), value)))
}

fn is_constant(expr: &Expr<'_>) -> bool {
    matches!(
        expr,
        Expr::Literal(_) | Expr::PositionalParam(_) | Expr::NamedParam(_)
    )
}

fn sort_stream<'s>(stream: Stream<'s>, order: OrderBy<'_>) -> Result<Stream<'s>> {
    let path = selectors_to_path(order.path);
    let mut keyed: Vec<(Vec<u8>, FieldBuffer<'static>)> = Vec::new();
    stream.iterate(&mut |doc| {
        let value = doc.get_path(&path).cloned().unwrap_or(Value::Null);
        let key = tagged_key(&value)?;
        keyed.push((key, doc));
        Ok(Flow::Continue)
    })?;

    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    if order.direction == OrderDirection::Desc {
        keyed.reverse();
    }
    Ok(Stream::from_documents(
        keyed.into_iter().map(|(_, doc)| doc).collect(),
    ))
}

fn apply_projection<'s>(
    stream: Stream<'s>,
    columns: &'s [SelectColumn<'s>],
    params: &'s [Param],
) -> Result<Stream<'s>> {
    if matches!(columns, [SelectColumn::All]) {
        return Ok(stream);
    }
    ensure!(
        !columns.iter().any(|c| matches!(c, SelectColumn::All)),
        "* cannot be combined with other projected columns"
    );

    Ok(stream.map(move |doc| {
        let mut out = FieldBuffer::new();
        for column in columns {
            let SelectColumn::Expr(expr) = column else {
                unreachable!()
            };
            let stack = EvalStack {
                document: Some(&doc),
                params,
            };
            out.add(result_field_name(expr), expr.eval(&stack)?);
        }
        Ok(out)
    }))
}

/// Name a projected expression contributes to result documents.
fn result_field_name(expr: &Expr<'_>) -> String {
    match expr {
        Expr::Path(selectors) => selectors_to_path(selectors).to_string(),
        Expr::Function { name, .. } => format!("{}()", name),
        Expr::Literal(Literal::Integer(s) | Literal::Float(s) | Literal::String(s)) => {
            (*s).to_string()
        }
        Expr::Literal(Literal::Bool(b)) => b.to_string(),
        Expr::Literal(Literal::Null) => "NULL".to_string(),
        _ => "expr".to_string(),
    }
}

fn eval_bound(expr: &Expr<'_>, params: &[Param], clause: &str) -> Result<usize> {
    let stack = EvalStack {
        document: None,
        params,
    };
    match expr.eval(&stack)?.convert_to(ValueKind::Int64)? {
        Value::Int64(n) if n >= 0 => Ok(n as usize),
        Value::Int64(n) => bail!("{} must not be negative, got {}", clause, n),
        _ => unreachable!(),
    }
}

struct TableScan {
    table: Table,
}

impl DocumentIterator for TableScan {
    fn iterate(&self, f: &mut dyn FnMut(FieldBuffer<'static>) -> Result<Flow>) -> Result<()> {
        self.table
            .iterate(None, &mut |_, view| f(view.decode()?.into_owned()))
    }
}

/// Index-rooted scan for `path = constant`: walks entries starting at the
/// constant's tagged key and stops at the first entry for a different
/// value.
struct IndexEqScan {
    table: Table,
    index_pos: usize,
    value: Value<'static>,
}

impl DocumentIterator for IndexEqScan {
    fn iterate(&self, f: &mut dyn FnMut(FieldBuffer<'static>) -> Result<Flow>) -> Result<()> {
        let index = &self.table.indexes()[self.index_pos];
        let prefix = tagged_key(&self.value)?;
        let unique = index.config().unique;

        index.ascend_greater_or_equal(Some(&self.value), &mut |entry_key, pk| {
            let matched = if unique {
                entry_key == prefix.as_slice()
            } else {
                entry_key.len() > prefix.len()
                    && entry_key[..prefix.len()] == prefix[..]
                    && entry_key[prefix.len()] == 0x00
            };
            if !matched {
                return Ok(Flow::Stop);
            }
            f(self.table.get_document(pk)?)
        })
    }
}
