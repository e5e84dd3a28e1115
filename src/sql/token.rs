//! Token and keyword definitions. Keywords are matched case-insensitively;
//! identifiers and literals borrow the input string.

use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    Keyword(Keyword),
    /// Bare identifier.
    Ident(&'a str),
    /// Backtick-quoted identifier; may contain spaces and dots.
    QuotedIdent(&'a str),
    /// Single-quoted string literal, doubled-quote escapes resolved.
    String(Cow<'a, str>),
    /// Numeric literal, kept as source text.
    Number(&'a str),
    /// `?` positional placeholder.
    Positional,
    /// `$name` named placeholder.
    NamedParam(&'a str),

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Colon,
    Semicolon,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    /// A character the lexer does not recognize.
    Illegal(char),
    Eof,
}

impl Token<'_> {
    /// Human-readable form used in parse errors.
    pub fn describe(&self) -> String {
        match self {
            Token::Keyword(k) => format!("{:?}", k).to_uppercase(),
            Token::Ident(s) | Token::QuotedIdent(s) => format!("identifier '{}'", s),
            Token::String(s) => format!("string '{}'", s),
            Token::Number(s) => format!("number {}", s),
            Token::Positional => "?".into(),
            Token::NamedParam(name) => format!("${}", name),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),
            Token::LBrace => "{".into(),
            Token::RBrace => "}".into(),
            Token::LBracket => "[".into(),
            Token::RBracket => "]".into(),
            Token::Comma => ",".into(),
            Token::Dot => ".".into(),
            Token::Colon => ":".into(),
            Token::Semicolon => ";".into(),
            Token::Eq => "=".into(),
            Token::Neq => "!=".into(),
            Token::Lt => "<".into(),
            Token::Le => "<=".into(),
            Token::Gt => ">".into(),
            Token::Ge => ">=".into(),
            Token::Plus => "+".into(),
            Token::Minus => "-".into(),
            Token::Star => "*".into(),
            Token::Slash => "/".into(),
            Token::Percent => "%".into(),
            Token::Illegal(c) => format!("illegal character '{}'", c),
            Token::Eof => "end of input".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    And,
    Asc,
    Between,
    By,
    Create,
    Delete,
    Desc,
    Documents,
    Drop,
    Exists,
    False,
    From,
    If,
    In,
    Index,
    Insert,
    Into,
    Key,
    Like,
    Limit,
    Not,
    Null,
    Offset,
    On,
    Or,
    Order,
    Primary,
    Select,
    Set,
    Table,
    True,
    Unique,
    Update,
    Values,
    Where,
}

impl Keyword {
    /// Case-insensitive keyword lookup; `None` for plain identifiers.
    pub fn from_ident(ident: &str) -> Option<Keyword> {
        // Keywords are short; compare without allocating.
        let matches = |kw: &str| ident.eq_ignore_ascii_case(kw);
        Some(match () {
            _ if matches("AND") => Keyword::And,
            _ if matches("ASC") => Keyword::Asc,
            _ if matches("BETWEEN") => Keyword::Between,
            _ if matches("BY") => Keyword::By,
            _ if matches("CREATE") => Keyword::Create,
            _ if matches("DELETE") => Keyword::Delete,
            _ if matches("DESC") => Keyword::Desc,
            _ if matches("DOCUMENTS") => Keyword::Documents,
            _ if matches("DROP") => Keyword::Drop,
            _ if matches("EXISTS") => Keyword::Exists,
            _ if matches("FALSE") => Keyword::False,
            _ if matches("FROM") => Keyword::From,
            _ if matches("IF") => Keyword::If,
            _ if matches("IN") => Keyword::In,
            _ if matches("INDEX") => Keyword::Index,
            _ if matches("INSERT") => Keyword::Insert,
            _ if matches("INTO") => Keyword::Into,
            _ if matches("KEY") => Keyword::Key,
            _ if matches("LIKE") => Keyword::Like,
            _ if matches("LIMIT") => Keyword::Limit,
            _ if matches("NOT") => Keyword::Not,
            _ if matches("NULL") => Keyword::Null,
            _ if matches("OFFSET") => Keyword::Offset,
            _ if matches("ON") => Keyword::On,
            _ if matches("OR") => Keyword::Or,
            _ if matches("ORDER") => Keyword::Order,
            _ if matches("PRIMARY") => Keyword::Primary,
            _ if matches("SELECT") => Keyword::Select,
            _ if matches("SET") => Keyword::Set,
            _ if matches("TABLE") => Keyword::Table,
            _ if matches("TRUE") => Keyword::True,
            _ if matches("UNIQUE") => Keyword::Unique,
            _ if matches("UPDATE") => Keyword::Update,
            _ if matches("VALUES") => Keyword::Values,
            _ if matches("WHERE") => Keyword::Where,
            _ => return None,
        })
    }
}
