//! # SQL Parser
//!
//! Recursive descent for statements, Pratt (binding-power) parsing for
//! expressions. Every AST node lands in the caller's arena; identifiers and
//! literals borrow the input string.
//!
//! Syntax failures produce the structured
//! [`ParseError`](crate::errors::ParseError): position, the token classes
//! that would have been accepted, and what was found instead.

use super::ast::*;
use super::lexer::Lexer;
use super::token::{Keyword, Token};
use crate::errors::ParseError;
use crate::types::ValueKind;
use bumpalo::Bump;
use eyre::Result;
use std::borrow::Cow;


pub struct Parser<'a> {
    lexer: Lexer<'a>,
    arena: &'a Bump,
    current: Token<'a>,
    positional: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str, arena: &'a Bump) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        Self {
            lexer,
            arena,
            current,
            positional: 0,
        }
    }

    pub fn peek(&self) -> &Token<'a> {
        &self.current
    }

    pub fn advance(&mut self) -> Token<'a> {
        std::mem::replace(&mut self.current, self.lexer.next_token())
    }

    fn error(&self, expected: &[&str]) -> eyre::Report {
        ParseError::new(
            self.current.describe(),
            expected.iter().map(|s| s.to_string()).collect(),
            self.lexer.line(),
            self.lexer.column(),
        )
        .into()
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        matches!(&self.current, Token::Keyword(k) if *k == keyword)
    }

    fn consume_keyword(&mut self, keyword: Keyword) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword, expected: &str) -> Result<()> {
        if self.consume_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(&[expected]))
        }
    }

    fn check_token(&self, expected: &Token<'_>) -> bool {
        std::mem::discriminant(&self.current) == std::mem::discriminant(expected)
    }

    fn consume_token(&mut self, expected: &Token<'_>) -> bool {
        if self.check_token(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_token(&mut self, expected: &Token<'_>, label: &str) -> Result<()> {
        if self.consume_token(expected) {
            Ok(())
        } else {
            Err(self.error(&[label]))
        }
    }

    fn expect_ident(&mut self) -> Result<&'a str> {
        match &self.current {
            Token::Ident(s) | Token::QuotedIdent(s) => {
                let s = *s;
                self.advance();
                Ok(s)
            }
            _ => Err(self.error(&["identifier"])),
        }
    }

    /// Consumes an optional trailing semicolon and requires end of input.
    pub fn finish(&mut self) -> Result<()> {
        self.consume_token(&Token::Semicolon);
        if matches!(self.current, Token::Eof) {
            Ok(())
        } else {
            Err(self.error(&["end of statement"]))
        }
    }

    pub fn parse_statement(&mut self) -> Result<Statement<'a>> {
        match self.peek() {
            Token::Keyword(Keyword::Select) => {
                let select = self.parse_select()?;
                Ok(Statement::Select(self.arena.alloc(select)))
            }
            Token::Keyword(Keyword::Insert) => {
                let insert = self.parse_insert()?;
                Ok(Statement::Insert(self.arena.alloc(insert)))
            }
            Token::Keyword(Keyword::Update) => {
                let update = self.parse_update()?;
                Ok(Statement::Update(self.arena.alloc(update)))
            }
            Token::Keyword(Keyword::Delete) => {
                let delete = self.parse_delete()?;
                Ok(Statement::Delete(self.arena.alloc(delete)))
            }
            Token::Keyword(Keyword::Create) => self.parse_create(),
            Token::Keyword(Keyword::Drop) => self.parse_drop(),
            _ => Err(self.error(&["SELECT", "INSERT", "UPDATE", "DELETE", "CREATE", "DROP"])),
        }
    }

    fn parse_select(&mut self) -> Result<SelectStmt<'a>> {
        self.expect_keyword(Keyword::Select, "SELECT")?;

        let mut columns = Vec::new();
        loop {
            if self.consume_token(&Token::Star) {
                columns.push(SelectColumn::All);
            } else {
                let expr = self.parse_expr(0)?;
                columns.push(SelectColumn::Expr(self.arena.alloc(expr)));
            }
            if !self.consume_token(&Token::Comma) {
                break;
            }
        }

        self.expect_keyword(Keyword::From, "FROM")?;
        let table = self.expect_ident()?;

        let where_clause = self.parse_where()?;

        let order_by = if self.consume_keyword(Keyword::Order) {
            self.expect_keyword(Keyword::By, "BY")?;
            let first = self.expect_ident()?;
            let path = self.parse_path_selectors(first)?;
            let direction = if self.consume_keyword(Keyword::Desc) {
                OrderDirection::Desc
            } else {
                self.consume_keyword(Keyword::Asc);
                OrderDirection::Asc
            };
            Some(OrderBy { path, direction })
        } else {
            None
        };

        let limit = if self.consume_keyword(Keyword::Limit) {
            let expr = self.parse_expr(0)?;
            Some(&*self.arena.alloc(expr))
        } else {
            None
        };

        let offset = if self.consume_keyword(Keyword::Offset) {
            let expr = self.parse_expr(0)?;
            Some(&*self.arena.alloc(expr))
        } else {
            None
        };

        Ok(SelectStmt {
            columns: self.arena.alloc_slice_copy(&columns),
            table,
            where_clause,
            order_by,
            limit,
            offset,
        })
    }

    fn parse_where(&mut self) -> Result<Option<&'a Expr<'a>>> {
        if self.consume_keyword(Keyword::Where) {
            let expr = self.parse_expr(0)?;
            Ok(Some(self.arena.alloc(expr)))
        } else {
            Ok(None)
        }
    }

    fn parse_insert(&mut self) -> Result<InsertStmt<'a>> {
        self.expect_keyword(Keyword::Insert, "INSERT")?;
        self.expect_keyword(Keyword::Into, "INTO")?;
        let table = self.expect_ident()?;

        let fields = if self.consume_token(&Token::LParen) {
            let mut fields = Vec::new();
            loop {
                fields.push(self.expect_ident()?);
                if !self.consume_token(&Token::Comma) {
                    break;
                }
            }
            self.expect_token(&Token::RParen, ")")?;
            Some(&*self.arena.alloc_slice_copy(&fields))
        } else {
            None
        };

        let source = if self.consume_keyword(Keyword::Values) {
            if fields.is_none() {
                return Err(self.error(&["field list before VALUES"]));
            }
            let mut rows = Vec::new();
            loop {
                self.expect_token(&Token::LParen, "(")?;
                let row = self.parse_expr_list(&Token::RParen)?;
                self.expect_token(&Token::RParen, ")")?;
                rows.push(&*self.arena.alloc_slice_copy(&row));
                if !self.consume_token(&Token::Comma) {
                    break;
                }
            }
            InsertSource::Values(self.arena.alloc_slice_copy(&rows))
        } else if self.consume_keyword(Keyword::Documents) {
            let mut docs = Vec::new();
            loop {
                let expr = self.parse_expr(0)?;
                docs.push(&*self.arena.alloc(expr));
                if !self.consume_token(&Token::Comma) {
                    break;
                }
            }
            InsertSource::Documents(self.arena.alloc_slice_copy(&docs))
        } else {
            return Err(self.error(&["VALUES", "DOCUMENTS"]));
        };

        Ok(InsertStmt {
            table,
            fields,
            source,
        })
    }

    fn parse_update(&mut self) -> Result<UpdateStmt<'a>> {
        self.expect_keyword(Keyword::Update, "UPDATE")?;
        let table = self.expect_ident()?;
        self.expect_keyword(Keyword::Set, "SET")?;

        let mut assignments = Vec::new();
        loop {
            let field = self.expect_ident()?;
            self.expect_token(&Token::Eq, "=")?;
            let expr = self.parse_expr(0)?;
            assignments.push((field, &*self.arena.alloc(expr)));
            if !self.consume_token(&Token::Comma) {
                break;
            }
        }

        let where_clause = self.parse_where()?;

        Ok(UpdateStmt {
            table,
            assignments: self.arena.alloc_slice_copy(&assignments),
            where_clause,
        })
    }

    fn parse_delete(&mut self) -> Result<DeleteStmt<'a>> {
        self.expect_keyword(Keyword::Delete, "DELETE")?;
        self.expect_keyword(Keyword::From, "FROM")?;
        let table = self.expect_ident()?;
        let where_clause = self.parse_where()?;
        Ok(DeleteStmt {
            table,
            where_clause,
        })
    }

    fn parse_create(&mut self) -> Result<Statement<'a>> {
        self.expect_keyword(Keyword::Create, "CREATE")?;

        if self.consume_keyword(Keyword::Unique) {
            self.expect_keyword(Keyword::Index, "INDEX")?;
            let stmt = self.parse_create_index(true)?;
            return Ok(Statement::CreateIndex(self.arena.alloc(stmt)));
        }
        if self.consume_keyword(Keyword::Index) {
            let stmt = self.parse_create_index(false)?;
            return Ok(Statement::CreateIndex(self.arena.alloc(stmt)));
        }
        if self.consume_keyword(Keyword::Table) {
            let stmt = self.parse_create_table()?;
            return Ok(Statement::CreateTable(self.arena.alloc(stmt)));
        }
        Err(self.error(&["TABLE", "INDEX", "UNIQUE INDEX"]))
    }

    fn parse_create_table(&mut self) -> Result<CreateTableStmt<'a>> {
        let if_not_exists = if self.consume_keyword(Keyword::If) {
            self.expect_keyword(Keyword::Not, "NOT")?;
            self.expect_keyword(Keyword::Exists, "EXISTS")?;
            true
        } else {
            false
        };

        let table = self.expect_ident()?;

        let primary_key = if self.consume_token(&Token::LParen) {
            let field = self.expect_ident()?;
            let type_name = self.expect_ident()?;
            let kind = type_name_to_kind(type_name)
                .ok_or_else(|| self.error(&["type name"]))?;
            self.expect_keyword(Keyword::Primary, "PRIMARY")?;
            self.expect_keyword(Keyword::Key, "KEY")?;
            self.expect_token(&Token::RParen, ")")?;
            Some(PrimaryKeyDef { field, kind })
        } else {
            None
        };

        Ok(CreateTableStmt {
            table,
            if_not_exists,
            primary_key,
        })
    }

    fn parse_create_index(&mut self, unique: bool) -> Result<CreateIndexStmt<'a>> {
        let index_name = self.expect_ident()?;
        self.expect_keyword(Keyword::On, "ON")?;
        let table = self.expect_ident()?;
        self.expect_token(&Token::LParen, "(")?;
        let first = self.expect_ident()?;
        let path = self.parse_path_selectors(first)?;
        self.expect_token(&Token::RParen, ")")?;
        Ok(CreateIndexStmt {
            index_name,
            table,
            path,
            unique,
        })
    }

    fn parse_drop(&mut self) -> Result<Statement<'a>> {
        self.expect_keyword(Keyword::Drop, "DROP")?;

        let is_table = if self.consume_keyword(Keyword::Table) {
            true
        } else if self.consume_keyword(Keyword::Index) {
            false
        } else {
            return Err(self.error(&["TABLE", "INDEX"]));
        };

        let if_exists = if self.consume_keyword(Keyword::If) {
            self.expect_keyword(Keyword::Exists, "EXISTS")?;
            true
        } else {
            false
        };

        let name = self.expect_ident()?;
        let stmt = self.arena.alloc(DropStmt { name, if_exists });
        Ok(if is_table {
            Statement::DropTable(stmt)
        } else {
            Statement::DropIndex(stmt)
        })
    }

    fn parse_expr_list(&mut self, terminator: &Token<'_>) -> Result<Vec<&'a Expr<'a>>> {
        let mut exprs = Vec::new();
        if self.check_token(terminator) {
            return Ok(exprs);
        }
        loop {
            let expr = self.parse_expr(0)?;
            exprs.push(&*self.arena.alloc(expr));
            if !self.consume_token(&Token::Comma) {
                break;
            }
        }
        Ok(exprs)
    }

    /// Parses a standalone expression.
    pub fn parse_expression(&mut self) -> Result<Expr<'a>> {
        self.parse_expr(0)
    }

    /// Pratt expression parser. `min_bp` is the minimum binding power an
    /// infix operator needs to extend the current expression.
    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr<'a>> {
        let mut lhs = self.parse_prefix()?;

        loop {
            // IN / LIKE / BETWEEN and their NOT forms sit at comparison
            // level.
            if min_bp <= 4 {
                if self.consume_keyword(Keyword::Not) {
                    lhs = if self.consume_keyword(Keyword::In) {
                        self.parse_in(lhs, true)?
                    } else if self.consume_keyword(Keyword::Like) {
                        self.parse_like(lhs, true)?
                    } else if self.consume_keyword(Keyword::Between) {
                        self.parse_between(lhs, true)?
                    } else {
                        return Err(self.error(&["IN", "LIKE", "BETWEEN"]));
                    };
                    continue;
                }
                if self.consume_keyword(Keyword::In) {
                    lhs = self.parse_in(lhs, false)?;
                    continue;
                }
                if self.consume_keyword(Keyword::Like) {
                    lhs = self.parse_like(lhs, false)?;
                    continue;
                }
                if self.consume_keyword(Keyword::Between) {
                    lhs = self.parse_between(lhs, false)?;
                    continue;
                }
            }

            let (op, bp) = match self.peek() {
                Token::Keyword(Keyword::Or) => (BinaryOperator::Or, 1),
                Token::Keyword(Keyword::And) => (BinaryOperator::And, 2),
                Token::Eq => (BinaryOperator::Eq, 4),
                Token::Neq => (BinaryOperator::Neq, 4),
                Token::Lt => (BinaryOperator::Lt, 4),
                Token::Le => (BinaryOperator::Le, 4),
                Token::Gt => (BinaryOperator::Gt, 4),
                Token::Ge => (BinaryOperator::Ge, 4),
                Token::Plus => (BinaryOperator::Add, 5),
                Token::Minus => (BinaryOperator::Sub, 5),
                Token::Star => (BinaryOperator::Mul, 6),
                Token::Slash => (BinaryOperator::Div, 6),
                Token::Percent => (BinaryOperator::Mod, 6),
                _ => break,
            };
            if bp < min_bp {
                break;
            }
            self.advance();
            let rhs = self.parse_expr(bp + 1)?;
            lhs = Expr::Binary {
                op,
                left: self.arena.alloc(lhs),
                right: self.arena.alloc(rhs),
            };
        }

        Ok(lhs)
    }

    fn parse_in(&mut self, lhs: Expr<'a>, negated: bool) -> Result<Expr<'a>> {
        self.expect_token(&Token::LParen, "(")?;
        let list = self.parse_expr_list(&Token::RParen)?;
        self.expect_token(&Token::RParen, ")")?;
        Ok(Expr::In {
            expr: self.arena.alloc(lhs),
            list: self.arena.alloc_slice_copy(&list),
            negated,
        })
    }

    fn parse_like(&mut self, lhs: Expr<'a>, negated: bool) -> Result<Expr<'a>> {
        let pattern = self.parse_expr(5)?;
        Ok(Expr::Like {
            expr: self.arena.alloc(lhs),
            pattern: self.arena.alloc(pattern),
            negated,
        })
    }

    fn parse_between(&mut self, lhs: Expr<'a>, negated: bool) -> Result<Expr<'a>> {
        let low = self.parse_expr(5)?;
        self.expect_keyword(Keyword::And, "AND")?;
        let high = self.parse_expr(5)?;
        Ok(Expr::Between {
            expr: self.arena.alloc(lhs),
            low: self.arena.alloc(low),
            high: self.arena.alloc(high),
            negated,
        })
    }

    fn parse_prefix(&mut self) -> Result<Expr<'a>> {
        match self.peek() {
            Token::Keyword(Keyword::Not) => {
                self.advance();
                let operand = self.parse_expr(3)?;
                Ok(Expr::Not(self.arena.alloc(operand)))
            }
            Token::Minus => {
                self.advance();
                let operand = self.parse_expr(7)?;
                Ok(Expr::Neg(self.arena.alloc(operand)))
            }
            Token::Keyword(Keyword::Null) => {
                self.advance();
                Ok(Expr::Literal(Literal::Null))
            }
            Token::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(true)))
            }
            Token::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(false)))
            }
            Token::Number(text) => {
                let text = *text;
                self.advance();
                Ok(Expr::Literal(if text.contains('.') {
                    Literal::Float(text)
                } else {
                    Literal::Integer(text)
                }))
            }
            Token::String(_) => {
                let text = match self.advance() {
                    Token::String(Cow::Borrowed(s)) => s,
                    Token::String(Cow::Owned(s)) => self.arena.alloc_str(&s),
                    _ => unreachable!(),
                };
                Ok(Expr::Literal(Literal::String(text)))
            }
            Token::Positional => {
                self.advance();
                let index = self.positional;
                self.positional += 1;
                Ok(Expr::PositionalParam(index))
            }
            Token::NamedParam(name) => {
                let name = *name;
                self.advance();
                Ok(Expr::NamedParam(name))
            }
            Token::LParen => {
                self.advance();
                let inner = self.parse_expr(0)?;
                self.expect_token(&Token::RParen, ")")?;
                Ok(inner)
            }
            Token::LBrace => self.parse_document_literal(),
            Token::LBracket => self.parse_array_literal(),
            Token::Ident(_) | Token::QuotedIdent(_) => {
                let name = self.expect_ident()?;
                if self.check_token(&Token::LParen) {
                    self.advance();
                    let args = self.parse_expr_list(&Token::RParen)?;
                    self.expect_token(&Token::RParen, ")")?;
                    Ok(Expr::Function {
                        name,
                        args: self.arena.alloc_slice_copy(&args),
                    })
                } else {
                    Ok(Expr::Path(self.parse_path_selectors(name)?))
                }
            }
            _ => Err(self.error(&["expression"])),
        }
    }

    fn parse_document_literal(&mut self) -> Result<Expr<'a>> {
        self.expect_token(&Token::LBrace, "{")?;
        let mut fields: Vec<(&'a str, &'a Expr<'a>)> = Vec::new();
        if !self.consume_token(&Token::RBrace) {
            loop {
                let name = match &self.current {
                    Token::Ident(s) | Token::QuotedIdent(s) => {
                        let s = *s;
                        self.advance();
                        s
                    }
                    Token::String(_) => match self.advance() {
                        Token::String(Cow::Borrowed(s)) => s,
                        Token::String(Cow::Owned(s)) => self.arena.alloc_str(&s),
                        _ => unreachable!(),
                    },
                    _ => return Err(self.error(&["field name"])),
                };
                self.expect_token(&Token::Colon, ":")?;
                let value = self.parse_expr(0)?;
                fields.push((name, self.arena.alloc(value)));
                if !self.consume_token(&Token::Comma) {
                    break;
                }
            }
            self.expect_token(&Token::RBrace, "}")?;
        }
        Ok(Expr::DocumentLiteral(self.arena.alloc_slice_copy(&fields)))
    }

    fn parse_array_literal(&mut self) -> Result<Expr<'a>> {
        self.expect_token(&Token::LBracket, "[")?;
        let items = self.parse_expr_list(&Token::RBracket)?;
        self.expect_token(&Token::RBracket, "]")?;
        Ok(Expr::ArrayLiteral(self.arena.alloc_slice_copy(&items)))
    }

    /// Continues a dot path after its first segment. A numeric selector is
    /// an array index; `a.0.5` lexes the tail as one number and is split
    /// back into two indexes.
    fn parse_path_selectors(&mut self, first: &'a str) -> Result<&'a [PathSelector<'a>]> {
        let mut parts = vec![PathSelector::Field(first)];
        while self.consume_token(&Token::Dot) {
            match &self.current {
                Token::Ident(s) | Token::QuotedIdent(s) => {
                    let s = *s;
                    self.advance();
                    parts.push(PathSelector::Field(s));
                }
                Token::Number(text) => {
                    let text = *text;
                    self.advance();
                    for piece in text.split('.') {
                        let index = piece
                            .parse::<usize>()
                            .map_err(|_| self.error(&["array index"]))?;
                        parts.push(PathSelector::Index(index));
                    }
                }
                _ => return Err(self.error(&["path selector"])),
            }
        }
        Ok(self.arena.alloc_slice_copy(&parts))
    }
}

fn type_name_to_kind(name: &str) -> Option<ValueKind> {
    let matches = |t: &str| name.eq_ignore_ascii_case(t);
    Some(match () {
        _ if matches("BOOL") || matches("BOOLEAN") => ValueKind::Bool,
        _ if matches("INT8") || matches("TINYINT") => ValueKind::Int8,
        _ if matches("INT16") || matches("SMALLINT") => ValueKind::Int16,
        _ if matches("INT32") => ValueKind::Int32,
        _ if matches("INT") || matches("INTEGER") || matches("INT64") || matches("BIGINT") => {
            ValueKind::Int64
        }
        _ if matches("UINT8") => ValueKind::Uint8,
        _ if matches("UINT16") => ValueKind::Uint16,
        _ if matches("UINT32") => ValueKind::Uint32,
        _ if matches("UINT64") => ValueKind::Uint64,
        _ if matches("FLOAT") || matches("DOUBLE") || matches("REAL") => ValueKind::Float64,
        _ if matches("TEXT") || matches("STRING") || matches("VARCHAR") => ValueKind::Text,
        _ if matches("BLOB") || matches("BYTES") => ValueKind::Blob,
        _ if matches("DURATION") => ValueKind::Duration,
        _ => return None,
    })
}
