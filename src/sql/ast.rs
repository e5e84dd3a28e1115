//! # SQL Abstract Syntax Tree
//!
//! All AST nodes are arena-allocated; identifiers and literals borrow the
//! input string, so parsing a statement performs no per-node heap
//! allocation and the whole tree is freed by dropping the arena.
//!
//! Operator precedence, lowest first:
//!
//! | Level | Operators |
//! |-------|-----------|
//! | 1 | OR |
//! | 2 | AND |
//! | 3 | NOT (prefix) |
//! | 4 | =, !=, <, <=, >, >=, IN, LIKE, BETWEEN |
//! | 5 | +, - |
//! | 6 | *, /, % |
//! | 7 | - (unary) |

use crate::types::ValueKind;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Statement<'a> {
    Select(&'a SelectStmt<'a>),
    Insert(&'a InsertStmt<'a>),
    Update(&'a UpdateStmt<'a>),
    Delete(&'a DeleteStmt<'a>),
    CreateTable(&'a CreateTableStmt<'a>),
    CreateIndex(&'a CreateIndexStmt<'a>),
    DropTable(&'a DropStmt<'a>),
    DropIndex(&'a DropStmt<'a>),
}

impl Statement<'_> {
    /// True when running the statement requires a write transaction.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Statement::Select(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectStmt<'a> {
    pub columns: &'a [SelectColumn<'a>],
    pub table: &'a str,
    pub where_clause: Option<&'a Expr<'a>>,
    pub order_by: Option<OrderBy<'a>>,
    pub limit: Option<&'a Expr<'a>>,
    pub offset: Option<&'a Expr<'a>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectColumn<'a> {
    /// `*`
    All,
    Expr(&'a Expr<'a>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderBy<'a> {
    pub path: &'a [PathSelector<'a>],
    pub direction: OrderDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InsertStmt<'a> {
    pub table: &'a str,
    /// Field names of a `(fields…) VALUES` form.
    pub fields: Option<&'a [&'a str]>,
    pub source: InsertSource<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InsertSource<'a> {
    /// `VALUES (…), (…)` rows.
    Values(&'a [&'a [&'a Expr<'a>]]),
    /// `DOCUMENTS {…}, {…}` literals.
    Documents(&'a [&'a Expr<'a>]),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateStmt<'a> {
    pub table: &'a str,
    /// `SET field = expr` assignments, in source order.
    pub assignments: &'a [(&'a str, &'a Expr<'a>)],
    pub where_clause: Option<&'a Expr<'a>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeleteStmt<'a> {
    pub table: &'a str,
    pub where_clause: Option<&'a Expr<'a>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreateTableStmt<'a> {
    pub table: &'a str,
    pub if_not_exists: bool,
    pub primary_key: Option<PrimaryKeyDef<'a>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrimaryKeyDef<'a> {
    pub field: &'a str,
    pub kind: ValueKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreateIndexStmt<'a> {
    pub index_name: &'a str,
    pub table: &'a str,
    pub path: &'a [PathSelector<'a>],
    pub unique: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropStmt<'a> {
    pub name: &'a str,
    pub if_exists: bool,
}

/// One selector of a dot-path expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSelector<'a> {
    Field(&'a str),
    Index(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expr<'a> {
    Literal(Literal<'a>),
    /// Dot-path identifier resolved against the current document.
    Path(&'a [PathSelector<'a>]),
    Binary {
        op: BinaryOperator,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    },
    Not(&'a Expr<'a>),
    Neg(&'a Expr<'a>),
    In {
        expr: &'a Expr<'a>,
        list: &'a [&'a Expr<'a>],
        negated: bool,
    },
    Like {
        expr: &'a Expr<'a>,
        pattern: &'a Expr<'a>,
        negated: bool,
    },
    Between {
        expr: &'a Expr<'a>,
        low: &'a Expr<'a>,
        high: &'a Expr<'a>,
        negated: bool,
    },
    Function {
        name: &'a str,
        args: &'a [&'a Expr<'a>],
    },
    /// `{field: expr, …}` literal.
    DocumentLiteral(&'a [(&'a str, &'a Expr<'a>)]),
    /// `[expr, …]` literal.
    ArrayLiteral(&'a [&'a Expr<'a>]),
    /// `?`, resolved by position.
    PositionalParam(usize),
    /// `$name`, resolved by name.
    NamedParam(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal<'a> {
    Null,
    Bool(bool),
    /// Integer source text, parsed at evaluation time.
    Integer(&'a str),
    /// Float source text, parsed at evaluation time.
    Float(&'a str),
    String(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}
