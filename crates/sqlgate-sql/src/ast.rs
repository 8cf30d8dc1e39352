//! Syntax tree for the restricted SELECT grammar.
//!
//! The tree only has room for what the parser accepts: one SELECT with an optional
//! FROM clause of explicit joins, WHERE, GROUP BY, HAVING, ORDER BY and LIMIT/OFFSET.
//! There is no node for subqueries, set operations or CTEs.

use serde::Serialize;
use sqlgate_core::Position;

/// An identifier. Unquoted identifiers arrive folded to lower case; quoted ones keep
/// their case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ident {
    pub value: String,
    pub quoted: bool,
    pub position: Position,
}

impl Ident {
    pub fn new(value: impl Into<String>, position: Position) -> Self {
        Self {
            value: value.into(),
            quoted: false,
            position,
        }
    }

    pub fn quoted(value: impl Into<String>, position: Position) -> Self {
        Self {
            value: value.into(),
            quoted: true,
            position,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

/// A parsed SELECT statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    pub distinct: bool,
    pub projection: Vec<SelectItem>,
    pub from: Option<FromClause>,
    pub selection: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderByItem>,
    pub limit: Option<LimitValue>,
    pub offset: Option<u64>,
}

impl Statement {
    /// Tables in scope, in FROM order: the base table followed by each joined table.
    pub fn table_refs(&self) -> Vec<&TableRef> {
        match &self.from {
            Some(from) => std::iter::once(&from.base)
                .chain(from.joins.iter().map(|j| &j.table))
                .collect(),
            None => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SelectItem {
    /// `*`
    Wildcard(Position),
    /// `q.*`
    QualifiedWildcard(Ident),
    /// `expr [AS alias]`
    Expr { expr: Expr, alias: Option<Ident> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FromClause {
    pub base: TableRef,
    pub joins: Vec<Join>,
}

/// `[schema.]name [AS alias]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRef {
    pub schema: Option<Ident>,
    pub name: Ident,
    pub alias: Option<Ident>,
}

impl TableRef {
    /// The name columns use to qualify this table: the alias if present, else the table name.
    pub fn binding(&self) -> &Ident {
        self.alias.as_ref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Join {
    pub kind: JoinKind,
    pub table: TableRef,
    pub on: Expr,
    /// Position of the first join keyword.
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NullsOrder {
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderByItem {
    pub expr: Expr,
    pub direction: Option<OrderDirection>,
    pub nulls: Option<NullsOrder>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LimitValue {
    Count(u64),
    /// `LIMIT ALL`, i.e. no limit.
    All,
}

/// `name` or `qualifier.name`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnRef {
    pub qualifier: Option<Ident>,
    pub name: Ident,
}

impl ColumnRef {
    pub fn position(&self) -> Position {
        self.qualifier
            .as_ref()
            .map(|q| q.position)
            .unwrap_or(self.name.position)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Literal {
    /// Numeric literal as written.
    Number(String),
    String(String),
    Boolean(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FunctionArgs {
    /// `f(*)`
    Wildcard,
    Exprs(Vec<Expr>),
}

impl FunctionArgs {
    /// Arity as checked against the catalog; `f(*)` counts as one argument.
    pub fn arity(&self) -> usize {
        match self {
            FunctionArgs::Wildcard => 1,
            FunctionArgs::Exprs(args) => args.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionCall {
    pub qualifier: Option<Ident>,
    pub name: Ident,
    pub distinct: bool,
    pub args: FunctionArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    Not,
    Minus,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Like,
    NotLike,
    ILike,
    NotILike,
    Concat,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
}

/// Binding strength. Higher binds tighter.
pub type Precedence = u8;

pub const PREC_OR: Precedence = 1;
pub const PREC_AND: Precedence = 2;
pub const PREC_NOT: Precedence = 3;
pub const PREC_COMPARISON: Precedence = 4;
pub const PREC_CONCAT: Precedence = 5;
pub const PREC_ADDITIVE: Precedence = 6;
pub const PREC_MULTIPLICATIVE: Precedence = 7;
pub const PREC_UNARY: Precedence = 8;
pub const PREC_ATOM: Precedence = 9;

impl BinaryOp {
    pub fn precedence(&self) -> Precedence {
        match self {
            Self::Or => PREC_OR,
            Self::And => PREC_AND,
            Self::Eq
            | Self::NotEq
            | Self::Lt
            | Self::LtEq
            | Self::Gt
            | Self::GtEq
            | Self::Like
            | Self::NotLike
            | Self::ILike
            | Self::NotILike => PREC_COMPARISON,
            Self::Concat => PREC_CONCAT,
            Self::Plus | Self::Minus => PREC_ADDITIVE,
            Self::Multiply | Self::Divide | Self::Modulo => PREC_MULTIPLICATIVE,
        }
    }
}

impl UnaryOp {
    pub fn precedence(&self) -> Precedence {
        match self {
            Self::Not => PREC_NOT,
            Self::Minus | Self::Plus => PREC_UNARY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    Column(ColumnRef),
    Literal(Literal),
    Function(FunctionCall),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    /// `expr IS [NOT] NULL`
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    /// `expr [NOT] IN (list)`
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    /// `expr [NOT] BETWEEN low AND high`
    Between {
        expr: Box<Expr>,
        negated: bool,
        low: Box<Expr>,
        high: Box<Expr>,
    },
    /// `CASE [operand] WHEN .. THEN .. [ELSE ..] END`
    Case {
        operand: Option<Box<Expr>>,
        branches: Vec<(Expr, Expr)>,
        else_result: Option<Box<Expr>>,
    },
    /// A parenthesized expression, kept so the source grouping survives serialization.
    Nested(Box<Expr>),
}

impl Expr {
    /// How tightly this expression binds when printed without parentheses.
    pub fn precedence(&self) -> Precedence {
        match self {
            Expr::Binary { op, .. } => op.precedence(),
            Expr::Unary { op, .. } => op.precedence(),
            Expr::IsNull { .. } | Expr::InList { .. } | Expr::Between { .. } => PREC_COMPARISON,
            Expr::Column(_)
            | Expr::Literal(_)
            | Expr::Function(_)
            | Expr::Case { .. }
            | Expr::Nested(_) => PREC_ATOM,
        }
    }
}
